//! Per-node validation hooks
//!
//! Validations are registered against a node and run once during
//! [`App::synth`](crate::App::synth), after all aspects have been applied.
//! They observe the final tree and report issue strings; an empty list means
//! the checked invariant holds.

use crate::construct::{App, ConstructId};
use crate::error::ConstructError;

/// A post-build invariant check
pub trait Validation: Send + Sync {
    /// Return the issues found, empty if none
    fn validate(&self, app: &App) -> Vec<String>;
}

impl<F> Validation for F
where
    F: Fn(&App) -> Vec<String> + Send + Sync,
{
    fn validate(&self, app: &App) -> Vec<String> {
        self(app)
    }
}

/// A single issue reported by a validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    /// Path of the node the validation was registered on
    pub path: String,
    pub message: String,
}

impl ValidationFailure {
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl App {
    /// Register a validation against a node
    ///
    /// # Errors
    /// `ConstructError::NotFound` if the node is unknown
    pub fn add_validation(
        &mut self,
        id: ConstructId,
        validation: impl Validation + 'static,
    ) -> Result<(), ConstructError> {
        self.node_mut(id)?.validations.push(Box::new(validation));
        Ok(())
    }

    /// Run every registered validation, in tree order
    #[must_use]
    pub fn validate_all(&self) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();
        for id in self.descendants(self.root()) {
            let Some(node) = self.node(id) else { continue };
            if node.validations.is_empty() {
                continue;
            }
            let path = self.path(id);
            for validation in &node.validations {
                failures.extend(
                    validation
                        .validate(self)
                        .into_iter()
                        .map(|message| ValidationFailure::new(path.clone(), message)),
                );
            }
        }
        failures
    }
}
