//! Construct tree
//!
//! [`App`] owns every node of the tree. Nodes are addressed by [`ConstructId`],
//! which is what callers hold on to and what references between resources
//! (container dependencies, service → task definition) are expressed in.

use crate::aspect::{Annotation, AnnotationLevel, AspectRegistration};
use crate::ecs::{ContainerDefinition, ScheduledTask, Service, TaskDefinition};
use crate::error::ConstructError;
use crate::lambda::{CfnFunction, Function};
use crate::secret::ImportedSecret;
use crate::stack::Stack;
use crate::tags::TagManager;
use crate::validation::Validation;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// Identity of a node in the construct tree
///
/// Process-unique, so maps keyed by it stay correct across several apps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConstructId(pub Uuid);

impl ConstructId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConstructId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConstructId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind-specific payload of a node
#[derive(Debug)]
pub enum ConstructKind {
    App,
    Stack(Stack),
    Function(Function),
    CfnFunction(CfnFunction),
    TaskDefinition(TaskDefinition),
    ContainerDefinition(ContainerDefinition),
    Service(Service),
    ScheduledTask(ScheduledTask),
    ImportedSecret(ImportedSecret),
    /// Plain grouping construct with no resource behind it
    Generic,
}

impl ConstructKind {
    /// Human-readable type name, used in error messages and hints
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::App => "App",
            Self::Stack(_) => "Stack",
            Self::Function(function) => function.flavor().type_name(),
            Self::CfnFunction(_) => "CfnFunction",
            Self::TaskDefinition(task_definition) => task_definition.compatibility().type_name(),
            Self::ContainerDefinition(_) => "ContainerDefinition",
            Self::Service(service) => service.kind().type_name(),
            Self::ScheduledTask(task) => task.kind().type_name(),
            Self::ImportedSecret(_) => "ImportedSecret",
            Self::Generic => "Construct",
        }
    }

    /// Whether resources of this kind carry their own tag store
    #[must_use]
    pub fn is_taggable(&self) -> bool {
        matches!(
            self,
            Self::Stack(_)
                | Self::Function(_)
                | Self::TaskDefinition(_)
                | Self::Service(_)
                | Self::ScheduledTask(_)
        )
    }
}

/// A single node of the construct tree
pub struct ConstructNode {
    id: ConstructId,
    local_id: String,
    parent: Option<ConstructId>,
    children: Vec<ConstructId>,
    pub(crate) kind: ConstructKind,
    pub(crate) tags: Option<TagManager>,
    pub(crate) annotations: Vec<Annotation>,
    pub(crate) validations: Vec<Box<dyn Validation>>,
}

impl ConstructNode {
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConstructId {
        self.id
    }

    /// Id of this node within its parent
    #[inline]
    #[must_use]
    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<ConstructId> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[ConstructId] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &ConstructKind {
        &self.kind
    }

    #[inline]
    #[must_use]
    pub fn tags(&self) -> Option<&TagManager> {
        self.tags.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Number of validations registered against this node
    #[inline]
    #[must_use]
    pub fn validation_count(&self) -> usize {
        self.validations.len()
    }
}

impl fmt::Debug for ConstructNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructNode")
            .field("id", &self.id)
            .field("local_id", &self.local_id)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("kind", &self.kind)
            .field("tags", &self.tags)
            .field("annotations", &self.annotations)
            .field("validations", &self.validations.len())
            .finish()
    }
}

/// Root of a construct tree
///
/// Owns all nodes, registered aspects and the bookkeeping needed to invoke
/// every aspect exactly once per node across repeated synths.
pub struct App {
    root: ConstructId,
    nodes: HashMap<ConstructId, ConstructNode>,
    pub(crate) aspects: Vec<AspectRegistration>,
    pub(crate) invoked_aspects: HashSet<(usize, ConstructId)>,
    pub(crate) invoking_aspects: bool,
}

impl App {
    /// Create an empty app
    #[must_use]
    pub fn new() -> Self {
        let root = ConstructId::new();
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            ConstructNode {
                id: root,
                local_id: String::new(),
                parent: None,
                children: Vec::new(),
                kind: ConstructKind::App,
                tags: None,
                annotations: Vec::new(),
                validations: Vec::new(),
            },
        );

        Self {
            root,
            nodes,
            aspects: Vec::new(),
            invoked_aspects: HashSet::new(),
            invoking_aspects: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> ConstructId {
        self.root
    }

    /// Add a child node under `parent`
    ///
    /// # Errors
    /// - `ConstructError::NotFound` if `parent` is not part of this app
    /// - `ConstructError::DuplicateId` if `parent` already has a child named `local_id`
    pub fn add_child(
        &mut self,
        parent: ConstructId,
        local_id: impl Into<String>,
        kind: ConstructKind,
    ) -> Result<ConstructId, ConstructError> {
        let local_id = local_id.into();

        if self.find_child(parent, &local_id)?.is_some() {
            return Err(ConstructError::DuplicateId {
                id: local_id,
                parent: self.describe(parent),
            });
        }

        let id = ConstructId::new();
        let tags = kind.is_taggable().then(TagManager::new);
        self.nodes.insert(
            id,
            ConstructNode {
                id,
                local_id,
                parent: Some(parent),
                children: Vec::new(),
                kind,
                tags,
                annotations: Vec::new(),
                validations: Vec::new(),
            },
        );
        self.node_mut(parent)?.children.push(id);

        Ok(id)
    }

    /// Detach a node and drop its whole subtree
    ///
    /// # Errors
    /// `ConstructError::NotFound` if `id` is unknown or is the root
    pub fn remove_node(&mut self, id: ConstructId) -> Result<(), ConstructError> {
        let parent = self.parent(id).ok_or(ConstructError::NotFound(id))?;
        for doomed in self.descendants(id) {
            self.nodes.remove(&doomed);
        }
        self.node_mut(parent)?.children.retain(|child| *child != id);
        Ok(())
    }

    /// Look up a direct child by local id
    ///
    /// # Errors
    /// `ConstructError::NotFound` if `parent` is unknown
    pub fn find_child(
        &self,
        parent: ConstructId,
        local_id: &str,
    ) -> Result<Option<ConstructId>, ConstructError> {
        let node = self.node(parent).ok_or(ConstructError::NotFound(parent))?;
        Ok(node
            .children
            .iter()
            .copied()
            .find(|child| self.nodes.get(child).is_some_and(|c| c.local_id == local_id)))
    }

    #[inline]
    #[must_use]
    pub fn node(&self, id: ConstructId) -> Option<&ConstructNode> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: ConstructId) -> Result<&mut ConstructNode, ConstructError> {
        self.nodes.get_mut(&id).ok_or(ConstructError::NotFound(id))
    }

    #[inline]
    #[must_use]
    pub fn kind(&self, id: ConstructId) -> Option<&ConstructKind> {
        self.nodes.get(&id).map(|node| &node.kind)
    }

    #[inline]
    pub fn kind_mut(&mut self, id: ConstructId) -> Option<&mut ConstructKind> {
        self.nodes.get_mut(&id).map(|node| &mut node.kind)
    }

    #[inline]
    #[must_use]
    pub fn parent(&self, id: ConstructId) -> Option<ConstructId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    #[must_use]
    pub fn children(&self, id: ConstructId) -> &[ConstructId] {
        self.nodes.get(&id).map_or(&[], |node| node.children.as_slice())
    }

    /// Slash-separated path from the app root (root excluded)
    #[must_use]
    pub fn path(&self, id: ConstructId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.nodes.get(&c)) {
            if node.parent.is_some() {
                segments.push(node.local_id.as_str());
            }
            current = node.parent;
        }
        segments.reverse();
        segments.join("/")
    }

    /// `"{type} [{path}]"`, as used in error messages
    #[must_use]
    pub fn describe(&self, id: ConstructId) -> String {
        match self.kind(id) {
            Some(ConstructKind::App) => "App".to_string(),
            Some(kind) => format!("{} [{}]", kind.type_name(), self.path(id)),
            None => format!("<unknown {id}>"),
        }
    }

    /// Ancestors of `id` from the root down to `id` itself
    #[must_use]
    pub fn scopes(&self, id: ConstructId) -> Vec<ConstructId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.nodes.get(&c)) {
            chain.push(node.id);
            current = node.parent;
        }
        chain.reverse();
        chain
    }

    /// Depth-first, pre-order listing of `id` and everything below it
    #[must_use]
    pub fn descendants(&self, id: ConstructId) -> Vec<ConstructId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                out.push(current);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Record an informational message on a node
    pub fn add_info(&mut self, id: ConstructId, message: impl Into<String>) {
        self.annotate(id, AnnotationLevel::Info, message.into());
    }

    /// Record a warning on a node
    pub fn add_warning(&mut self, id: ConstructId, message: impl Into<String>) {
        self.annotate(id, AnnotationLevel::Warning, message.into());
    }

    fn annotate(&mut self, id: ConstructId, level: AnnotationLevel, message: String) {
        let path = self.path(id);
        match level {
            AnnotationLevel::Info => tracing::info!(%path, "{message}"),
            AnnotationLevel::Warning => tracing::warn!(%path, "{message}"),
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.annotations.push(Annotation { level, message });
        }
    }

    /// Annotations recorded on a node
    #[must_use]
    pub fn annotations(&self, id: ConstructId) -> &[Annotation] {
        self.nodes.get(&id).map_or(&[], |node| node.annotations.as_slice())
    }

    /// Tag store of a taggable node
    #[must_use]
    pub fn tag_manager(&self, id: ConstructId) -> Option<&TagManager> {
        self.nodes.get(&id).and_then(|node| node.tags.as_ref())
    }

    /// Mutable tag store of a taggable node
    pub fn tag_manager_mut(&mut self, id: ConstructId) -> Option<&mut TagManager> {
        self.nodes.get_mut(&id).and_then(|node| node.tags.as_mut())
    }

    pub(crate) fn expect_kind_mut<T>(
        &mut self,
        id: ConstructId,
        expected: &'static str,
        select: impl FnOnce(&mut ConstructKind) -> Option<&mut T>,
    ) -> Result<&mut T, ConstructError> {
        let path = self.path(id);
        let kind = self.kind_mut(id).ok_or(ConstructError::NotFound(id))?;
        let actual = kind.type_name();
        select(kind).ok_or(ConstructError::UnexpectedKind {
            path,
            expected,
            actual,
        })
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root)
            .field("nodes", &self.nodes.len())
            .field("aspects", &self.aspects.len())
            .finish()
    }
}
