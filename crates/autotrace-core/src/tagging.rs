//! Tag application strategies
//!
//! Top-level entry points tag through [`Tags`], which registers an aspect.
//! Inside graph traversal that is not possible, since an aspect cannot add
//! aspects, so the orchestrator writes to the node's tag store directly.

use crate::constants::{auto_trace_tag_value, tags};
use autotrace_construct::{App, ConstructId, Tags, DEFAULT_TAG_PRIORITY};

/// Capability to put a tag on a node
pub trait TagSink {
    fn apply_tag(&self, app: &mut App, node: ConstructId, key: &str, value: &str);
}

/// Tags the node's subtree through a tag aspect, applied at synth
#[derive(Debug, Clone, Copy, Default)]
pub struct AspectTagging;

impl TagSink for AspectTagging {
    fn apply_tag(&self, app: &mut App, node: ConstructId, key: &str, value: &str) {
        Tags::of(node).add(app, key, value);
    }
}

/// Writes the tag straight into the node's own tag store
///
/// Nodes without a tag store get a warning instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectTagging;

impl TagSink for DirectTagging {
    fn apply_tag(&self, app: &mut App, node: ConstructId, key: &str, value: &str) {
        match app.tag_manager_mut(node) {
            Some(store) => store.set_tag(key, value, DEFAULT_TAG_PRIORITY),
            None => app.add_warning(node, format!("Cannot set the '{key}' tag with value '{value}'.")),
        }
    }
}

/// Apply the provenance and user tags as requested
pub(crate) fn apply_trace_tags(
    sink: &dyn TagSink,
    app: &mut App,
    node: ConstructId,
    apply_auto_trace_tag: bool,
    tag: Option<&str>,
) {
    if apply_auto_trace_tag {
        tracing::debug!(path = %app.path(node), "applying provenance tag");
        sink.apply_tag(app, node, tags::AUTO_TRACE, &auto_trace_tag_value());
    }
    if let Some(tag) = tag {
        tracing::debug!(path = %app.path(node), tag, "applying user tag");
        sink.apply_tag(app, node, tags::USER, tag);
    }
}
