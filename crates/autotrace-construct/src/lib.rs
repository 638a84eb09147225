//! AutoTrace Construct Model
//!
//! The declarative resource graph that instrumentation operates on.
//!
//! # Core Concepts
//!
//! - [`App`]: Owner of the construct tree; every node lives here
//! - [`ConstructId`]: Stable, process-unique identity of a node
//! - [`Aspect`]: Visitor invoked once per node during [`App::synth`]
//! - [`Validation`]: Post-build invariant check registered against a node
//! - [`Tags`] / [`TagManager`]: Tagging through aspects or directly on a tag store
//! - [`SecretValue`]: Deferred value that may be a dynamic reference
//!
//! # Architecture
//!
//! ```text
//! App ── Stack ── Function ── Resource (CfnFunction)
//!          │
//!          ├── TaskDefinition ── ContainerDefinition*
//!          ├── Service ─────────► TaskDefinition
//!          └── ScheduledTask ───► TaskDefinition
//!
//! synth: aspects ─► validations ─► CloudAssembly
//! ```
//!
//! # Example
//!
//! ```rust
//! use autotrace_construct::{App, FunctionProps, Runtime, StackProps};
//!
//! let mut app = App::new();
//! let stack = app.add_stack("Stack", StackProps::in_region("eu-central-1")).unwrap();
//! let function = app
//!     .add_function(stack, "Handler", FunctionProps::new(Runtime::NODEJS_16_X, "index.handler"))
//!     .unwrap();
//!
//! let assembly = app.synth().unwrap();
//! assert_eq!(assembly.stacks.len(), 1);
//! assert!(app.function(function).is_some());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod aspect;
mod construct;
mod ecs;
mod error;
mod lambda;
mod secret;
mod stack;
mod synth;
mod tags;
mod validation;

pub use aspect::{Annotation, AnnotationLevel, Aspect};
pub use construct::{App, ConstructId, ConstructKind, ConstructNode};
pub use ecs::{
    Compatibility, ContainerDefinition, ContainerDefinitionOptions, ContainerDependency,
    ContainerDependencyCondition, ContainerImage, ContainerSecret, DockerVolumeConfiguration,
    EcsSecret, EfsVolumeConfiguration, MountPoint, ScheduledTask, ScheduledTaskKind,
    ScheduledTaskProps, Service, ServiceKind, ServiceProps, TaskDefinition,
    TaskDefinitionExtension, TaskDefinitionProps, Volume,
};
pub use error::{ConstructError, SynthError};
pub use lambda::{CfnFunction, EntryPoint, Function, FunctionFlavor, FunctionProps, LayerVersion, Runtime};
pub use secret::{
    DynamicReference, DynamicReferenceService, ImportedSecret, SecretValue,
    SecretsManagerSecretOptions,
};
pub use stack::{partition_for_region, Stack, StackProps, UNRESOLVED_ACCOUNT, UNRESOLVED_REGION};
pub use synth::{AssemblyMessage, CloudAssembly, StackArtifact};
pub use tags::{TagManager, Tags, DEFAULT_TAG_PRIORITY};
pub use validation::{Validation, ValidationFailure};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
