//! Resource tags
//!
//! Taggable nodes own a [`TagManager`]. [`Tags::of`] applies a tag to a whole
//! subtree by registering an aspect, so it only takes effect at synth and
//! cannot be used from inside another aspect.

use crate::aspect::Aspect;
use crate::construct::{App, ConstructId};
use std::collections::BTreeMap;

/// Priority used by [`Tags::add`]
pub const DEFAULT_TAG_PRIORITY: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
struct TagEntry {
    value: String,
    priority: u32,
}

/// Tag store of a single resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagManager {
    tags: BTreeMap<String, TagEntry>,
}

impl TagManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a tag unless a higher-priority value is already present
    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>, priority: u32) {
        let key = key.into();
        if self.tags.get(&key).is_some_and(|existing| existing.priority > priority) {
            return;
        }
        self.tags.insert(
            key,
            TagEntry {
                value: value.into(),
                priority,
            },
        );
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(|entry| entry.value.as_str())
    }

    #[must_use]
    pub fn has_tags(&self) -> bool {
        !self.tags.is_empty()
    }

    /// Tags sorted by key
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.value.as_str()))
    }
}

/// Entry point for subtree tagging
#[derive(Debug, Clone, Copy)]
pub struct Tags {
    scope: ConstructId,
}

impl Tags {
    #[must_use]
    pub fn of(scope: ConstructId) -> Self {
        Self { scope }
    }

    /// Tag every taggable node under the scope at synth
    pub fn add(self, app: &mut App, key: impl Into<String>, value: impl Into<String>) {
        app.add_aspect(
            self.scope,
            TagAspect {
                key: key.into(),
                value: value.into(),
                priority: DEFAULT_TAG_PRIORITY,
            },
        );
    }
}

struct TagAspect {
    key: String,
    value: String,
    priority: u32,
}

impl Aspect for TagAspect {
    fn visit(&self, app: &mut App, node: ConstructId) -> anyhow::Result<()> {
        if let Some(tags) = app.tag_manager_mut(node) {
            tags.set_tag(self.key.clone(), self.value.clone(), self.priority);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construct::ConstructKind;
    use crate::stack::StackProps;

    #[test]
    fn higher_priority_wins() {
        let mut tags = TagManager::new();
        tags.set_tag("k", "high", 200);
        tags.set_tag("k", "low", 100);
        assert_eq!(tags.get("k"), Some("high"));

        tags.set_tag("k", "same", 200);
        assert_eq!(tags.get("k"), Some("same"));
    }

    #[test]
    fn tags_apply_to_taggable_nodes_at_aspect_time() {
        let mut app = App::new();
        let stack = app.add_stack("Stack", StackProps::default()).unwrap();
        let plain = app.add_child(stack, "Plain", ConstructKind::Generic).unwrap();

        Tags::of(stack).add(&mut app, "team", "core");
        assert_eq!(app.tag_manager(stack).unwrap().get("team"), None);

        app.invoke_aspects().unwrap();
        assert_eq!(app.tag_manager(stack).unwrap().get("team"), Some("core"));
        assert!(app.tag_manager(plain).is_none());
    }
}
