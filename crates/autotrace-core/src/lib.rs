//! AutoTrace Core
//!
//! Idempotent tracing instrumentation for Lambda functions and ECS workloads,
//! with self-validation that re-checks every mutation at synth.
//!
//! # Core Concepts
//!
//! - [`AutoTrace`]: Entry points for functions, task definitions, services,
//!   scheduled tasks and whole stacks
//! - [`TracerLayer`]: Which tracer, if any, a function's runtime gets
//! - [`resolve_layer_arn`]: Layer version lookup per region, or a pinned version
//! - [`validation`]: Checks registered next to every mutation
//!
//! # Architecture
//!
//! ```text
//! trace_function ──────────► lambda ─┐
//! trace_task_definition ───► ecs ────┼─► validation::{lambda, ecs}
//! trace_service / _scheduled_task ┘  │
//! trace_everything ─► TraceEverything (aspect) ─► lambda | ecs
//! ```
//!
//! Direct calls tag through the tag aspect; the whole-graph traversal tags
//! tag stores directly, since an aspect cannot register aspects.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod auto_trace;
mod classifier;
pub mod constants;
mod ecs;
mod error;
mod lambda;
mod layers;
mod orchestrator;
mod props;
mod tagging;
pub mod validation;

pub use auto_trace::{AutoTrace, TracingExtension};
pub use classifier::{classify, classify_runtime, TracerLayer};
pub use error::{AutoTraceError, AutoTraceResult, ConfigError, UnsupportedRegionError};
pub use layers::{latest_version, layer_arn, layer_arn_prefix, resolve_layer_arn};
pub use props::{AutoTraceProps, TraceEverythingProps, TraceFunctionProps, TraceTaskDefinitionProps};
pub use tagging::{AspectTagging, DirectTagging, TagSink};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
