//! Error types for AutoTrace
//!
//! Covers:
//! - Runtimes and regions no tracer layer exists for
//! - Entry points handed the wrong kind of construct
//! - Construct tree failures surfacing from the host graph
//! - Unparseable configuration documents

use autotrace_construct::{ConstructError, Runtime};

/// Result alias for instrumentation calls
pub type AutoTraceResult<T> = Result<T, AutoTraceError>;

/// Main instrumentation error
#[derive(Debug, thiserror::Error)]
pub enum AutoTraceError {
    /// No tracer layer exists for this runtime
    #[error("The '{runtime}' runtime is not supported.")]
    UnsupportedRuntime { runtime: String },

    /// No tracer layer was published for this region
    #[error(transparent)]
    UnsupportedRegion(#[from] UnsupportedRegionError),

    /// An entry point was invoked on the wrong kind of construct
    #[error(
        "AutoTrace::{method} needs a {expected} as input, got a {actual}{}",
        render_hint(.hint.as_deref())
    )]
    WrongTargetType {
        method: &'static str,
        expected: &'static str,
        actual: &'static str,
        /// Entry point matching what was actually supplied
        hint: Option<&'static str>,
    },

    #[error(transparent)]
    Construct(#[from] ConstructError),
}

impl AutoTraceError {
    /// Create an unsupported-runtime error
    #[inline]
    pub fn unsupported_runtime(runtime: Option<&Runtime>) -> Self {
        Self::UnsupportedRuntime {
            runtime: runtime.map_or_else(|| "<unset>".to_string(), ToString::to_string),
        }
    }

    /// Whether graph traversal should downgrade this to an informational note
    #[inline]
    #[must_use]
    pub fn is_unsupported_runtime(&self) -> bool {
        matches!(self, Self::UnsupportedRuntime { .. })
    }
}

fn render_hint(hint: Option<&str>) -> String {
    hint.map(|method| format!("; are you maybe looking for AutoTrace::{method} instead?"))
        .unwrap_or_default()
}

/// A layer/region pair with no published layer version
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("The '{layer}' layer is not supported in the '{region}' region.")]
pub struct UnsupportedRegionError {
    pub layer: &'static str,
    pub region: String,
}

/// Configuration document errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
