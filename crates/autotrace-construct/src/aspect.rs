//! Aspects and annotations
//!
//! An [`Aspect`] is a visitor registered against a scope. During synth it is
//! invoked exactly once for every node in that scope, parents before children.
//! Nodes created by an aspect while it runs are visited in the same pass.
//!
//! Aspects cannot register further aspects: anything added while aspects are
//! being invoked is dropped with a warning annotation on its scope.

use crate::construct::{App, ConstructId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A visitor applied to every node of a subtree at synth
pub trait Aspect: Send + Sync {
    /// Visit a single node
    ///
    /// # Errors
    /// Any error aborts synth.
    fn visit(&self, app: &mut App, node: ConstructId) -> anyhow::Result<()>;
}

/// Severity of an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationLevel {
    Info,
    Warning,
}

/// A message attached to a node, carried into the assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub level: AnnotationLevel,
    pub message: String,
}

pub(crate) struct AspectRegistration {
    pub(crate) scope: ConstructId,
    pub(crate) aspect: Arc<dyn Aspect>,
}

impl App {
    /// Register an aspect against a scope
    ///
    /// Ignored, with a warning on `scope`, while aspects are being invoked.
    pub fn add_aspect(&mut self, scope: ConstructId, aspect: impl Aspect + 'static) {
        if self.invoking_aspects {
            self.add_warning(
                scope,
                "We detected an Aspect was added via another Aspect, and will not be applied",
            );
            return;
        }
        self.aspects.push(AspectRegistration {
            scope,
            aspect: Arc::new(aspect),
        });
    }

    /// Number of aspects registered so far
    #[must_use]
    pub fn aspect_count(&self) -> usize {
        self.aspects.len()
    }

    /// Invoke every registered aspect on every node in its scope, once
    ///
    /// Runs until no node is left unvisited, so children created by an aspect
    /// are picked up by the aspects of their ancestors.
    pub(crate) fn invoke_aspects(&mut self) -> Result<(), (ConstructId, anyhow::Error)> {
        self.invoking_aspects = true;
        let result = self.invoke_aspects_inner();
        self.invoking_aspects = false;
        result
    }

    fn invoke_aspects_inner(&mut self) -> Result<(), (ConstructId, anyhow::Error)> {
        loop {
            let mut visited_any = false;

            for node in self.descendants(self.root()) {
                for scope in self.scopes(node) {
                    let pending: Vec<(usize, Arc<dyn Aspect>)> = self
                        .aspects
                        .iter()
                        .enumerate()
                        .filter(|(index, reg)| {
                            reg.scope == scope && !self.invoked_aspects.contains(&(*index, node))
                        })
                        .map(|(index, reg)| (index, Arc::clone(&reg.aspect)))
                        .collect();

                    for (index, aspect) in pending {
                        self.invoked_aspects.insert((index, node));
                        visited_any = true;
                        aspect.visit(self, node).map_err(|e| (node, e))?;
                    }
                }
            }

            if !visited_any {
                return Ok(());
            }
        }
    }
}
