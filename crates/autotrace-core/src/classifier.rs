//! Runtime classification
//!
//! Decides which tracer layer, if any, applies to a function.

use crate::constants::layers;
use autotrace_construct::{Function, FunctionFlavor, Runtime};
use std::fmt;

/// Tracer flavor applied to a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TracerLayer {
    /// Wrapper-based tracer for Node.js runtimes
    Node,
    /// Handler-redirect tracer for Python 3 runtimes
    Python,
}

impl TracerLayer {
    /// Published layer name
    #[must_use]
    pub fn layer_name(self) -> &'static str {
        match self {
            Self::Node => layers::NODE,
            Self::Python => layers::PYTHON,
        }
    }
}

impl fmt::Display for TracerLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.layer_name())
    }
}

const KNOWN_RUNTIMES: [(Runtime, TracerLayer); 9] = [
    (Runtime::NODEJS_10_X, TracerLayer::Node),
    (Runtime::NODEJS_12_X, TracerLayer::Node),
    (Runtime::NODEJS_14_X, TracerLayer::Node),
    (Runtime::NODEJS_16_X, TracerLayer::Node),
    (Runtime::NODEJS_18_X, TracerLayer::Node),
    (Runtime::PYTHON_3_7, TracerLayer::Python),
    (Runtime::PYTHON_3_8, TracerLayer::Python),
    (Runtime::PYTHON_3_9, TracerLayer::Python),
    (Runtime::PYTHON_3_10, TracerLayer::Python),
];

/// Classify a runtime identifier
///
/// Known runtimes first, then by family prefix so newer runtimes are
/// picked up before they are added to the table.
#[must_use]
pub fn classify_runtime(runtime: &Runtime) -> Option<TracerLayer> {
    if let Some((_, layer)) = KNOWN_RUNTIMES.iter().find(|(known, _)| known == runtime) {
        return Some(*layer);
    }

    let name = runtime.name();
    if name.starts_with("nodejs") {
        Some(TracerLayer::Node)
    } else if name.starts_with("python3.") {
        Some(TracerLayer::Python)
    } else {
        None
    }
}

/// Classify a function
///
/// A Node.js function that leaves its runtime unset runs on the construct's
/// default Node.js runtime.
#[must_use]
pub fn classify(function: &Function) -> Option<TracerLayer> {
    match function.runtime() {
        Some(runtime) => classify_runtime(runtime),
        None if function.flavor() == FunctionFlavor::Nodejs => Some(TracerLayer::Node),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_runtimes() {
        assert_eq!(classify_runtime(&Runtime::NODEJS_14_X), Some(TracerLayer::Node));
        assert_eq!(classify_runtime(&Runtime::PYTHON_3_9), Some(TracerLayer::Python));
        assert_eq!(classify_runtime(&Runtime::JAVA_11), None);
        assert_eq!(classify_runtime(&Runtime::GO_1_X), None);
        assert_eq!(classify_runtime(&Runtime::PROVIDED_AL2), None);
    }

    #[test]
    fn newer_runtimes_by_prefix() {
        assert_eq!(classify_runtime(&Runtime::new("nodejs20.x")), Some(TracerLayer::Node));
        assert_eq!(classify_runtime(&Runtime::new("python3.12")), Some(TracerLayer::Python));
        assert_eq!(classify_runtime(&Runtime::new("python2.7")), None);
    }

    #[test]
    fn layer_names() {
        assert_eq!(TracerLayer::Node.to_string(), "lumigo-node-tracer");
        assert_eq!(TracerLayer::Python.layer_name(), "lumigo-python-tracer");
    }

    proptest! {
        #[test]
        fn nodejs_prefix_always_node(suffix in "[a-z0-9.]{0,8}") {
            let runtime = Runtime::new(format!("nodejs{suffix}"));
            prop_assert_eq!(classify_runtime(&runtime), Some(TracerLayer::Node));
        }

        #[test]
        fn other_families_never_traced(name in "(java|go|dotnet|ruby|provided)[a-z0-9.]{0,6}") {
            prop_assert_eq!(classify_runtime(&Runtime::new(name)), None);
        }
    }
}
