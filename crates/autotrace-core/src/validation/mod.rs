//! Self-validation
//!
//! Every mutation made by the instrumenters is paired with a check registered
//! on the mutated node. Checks run during the host's validation pass, only
//! observe the final tree, and derive their expectations from constants and
//! the inputs captured at registration time.

pub mod ecs;
pub mod lambda;

/// Issues reported by a single check; empty when the invariant holds
pub type ValidationIssues = Vec<String>;
