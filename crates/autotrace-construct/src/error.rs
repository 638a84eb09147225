//! Error types for the construct model
//!
//! Covers:
//! - Tree construction failures (duplicate ids, unknown nodes, wrong kinds)
//! - Synth failures (aspect errors, failed validations)

use crate::construct::ConstructId;

/// Errors raised while building or querying the construct tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstructError {
    /// A sibling with the same local id already exists
    #[error("There is already a Construct with name '{id}' in {parent}")]
    DuplicateId { id: String, parent: String },

    /// The node is not part of this app
    #[error("construct not found: {0}")]
    NotFound(ConstructId),

    /// The node exists but has a different kind
    #[error("construct [{path}] is a {actual}, expected a {expected}")]
    UnexpectedKind {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Resource properties are inconsistent
    #[error("invalid properties: {0}")]
    InvalidProps(String),
}

impl ConstructError {
    /// Create an invalid-props error
    #[inline]
    pub fn invalid_props(msg: impl Into<String>) -> Self {
        Self::InvalidProps(msg.into())
    }
}

/// Errors raised by [`App::synth`](crate::App::synth)
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    /// An aspect failed while visiting a node
    #[error("aspect failed on [{path}]: {source}")]
    Aspect {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// One or more validations reported issues
    #[error("Validation failed with the following errors:\n{}", render_failures(.failures))]
    Validation {
        failures: Vec<crate::validation::ValidationFailure>,
    },

    /// The template could not be rendered
    #[error("render failed: {0}")]
    Render(#[from] serde_json::Error),

    #[error(transparent)]
    Construct(#[from] ConstructError),
}

impl SynthError {
    /// Every issue message, in registration order
    #[must_use]
    pub fn validation_messages(&self) -> Vec<&str> {
        match self {
            Self::Validation { failures } => failures.iter().map(|f| f.message.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

fn render_failures(failures: &[crate::validation::ValidationFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("  [{}] {}", f.path, f.message))
        .collect::<Vec<_>>()
        .join("\n")
}
