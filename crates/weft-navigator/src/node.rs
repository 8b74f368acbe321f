#![forbid(unsafe_code)]

//! Navigator tree model.
//!
//! A [`NavigatorNode`] is an immutable snapshot of the component tree as the
//! navigator panel shows it: names, kinds, and which containers are expanded.
//! Snapshots are cheap to rebuild and are rebuilt whenever the session or the
//! [`OpenSet`] changes.

use ahash::AHashSet;
use tracing::trace;
use weft_core::{ComponentId, EditorSession};

/// Whether a row can hold children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Leaf,
    AcceptsChild,
}

/// A node in the navigator hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigatorNode {
    id: ComponentId,
    name: String,
    kind: NodeKind,
    open: bool,
    children: Vec<NavigatorNode>,
}

impl NavigatorNode {
    /// A node that never holds children.
    #[must_use]
    pub fn leaf(id: impl Into<ComponentId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: NodeKind::Leaf,
            open: false,
            children: Vec::new(),
        }
    }

    /// A node that accepts children. Starts closed.
    #[must_use]
    pub fn container(id: impl Into<ComponentId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: NodeKind::AcceptsChild,
            open: false,
            children: Vec::new(),
        }
    }

    /// Append a child.
    ///
    /// Leaves never hold children; the child is dropped.
    #[must_use]
    pub fn child(mut self, node: NavigatorNode) -> Self {
        if self.accepts_child() {
            self.children.push(node);
        } else {
            trace!(parent = %self.id, child = %node.id, "navigator.child dropped: leaf");
        }
        self
    }

    /// Set whether this node is expanded. Ignored for leaves.
    #[must_use]
    pub fn with_open(mut self, open: bool) -> Self {
        self.open = open && self.accepts_child();
        self
    }

    #[must_use]
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub fn accepts_child(&self) -> bool {
        self.kind == NodeKind::AcceptsChild
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    #[must_use]
    pub fn children(&self) -> &[NavigatorNode] {
        &self.children
    }

    /// Depth-first search for `id`, including `self`.
    #[must_use]
    pub fn find(&self, id: &ComponentId) -> Option<&NavigatorNode> {
        if self.id == *id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Id of the node whose children contain `id`.
    #[must_use]
    pub fn parent_of(&self, id: &ComponentId) -> Option<&ComponentId> {
        for child in &self.children {
            if child.id == *id {
                return Some(&self.id);
            }
            if let Some(parent) = child.parent_of(id) {
                return Some(parent);
            }
        }
        None
    }

    /// Total node count, including `self`.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(Self::len).sum::<usize>()
    }

    /// Always false: a node counts itself.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Build a snapshot of `session` rooted at its root component.
    ///
    /// `name` renders the display name from a component's payload. Children
    /// listed in the tree but missing from the store are skipped.
    pub fn from_session<P: 'static>(
        session: &EditorSession<P>,
        open: &OpenSet,
        name: impl Fn(&ComponentId, &P) -> String,
    ) -> Self {
        let root = session.root();
        let mut node = Self::build(session, open, &name, &root).unwrap_or_else(|| {
            NavigatorNode::container(root.clone(), root.as_str())
        });
        // The root is never a row; its children are always listed.
        node.open = true;
        node
    }

    fn build<P: 'static>(
        session: &EditorSession<P>,
        open: &OpenSet,
        name: &impl Fn(&ComponentId, &P) -> String,
        id: &ComponentId,
    ) -> Option<Self> {
        let (label, accepts_child) = session
            .with_component(id, |desc| (name(id, desc.payload()), desc.accepts_child()))
            .ok()?;
        if !accepts_child {
            return Some(Self::leaf(id.clone(), label));
        }
        let children = session
            .children_of(id)
            .iter()
            .filter_map(|child| {
                let built = Self::build(session, open, name, child);
                if built.is_none() {
                    trace!(parent = %id, child = %child, "navigator.snapshot skipped unregistered child");
                }
                built
            })
            .collect();
        Some(Self {
            id: id.clone(),
            name: label,
            kind: NodeKind::AcceptsChild,
            open: open.is_open(id),
            children,
        })
    }
}

// ---------------------------------------------------------------------------
// OpenSet
// ---------------------------------------------------------------------------

/// Ids whose navigator rows are expanded.
#[derive(Debug, Clone, Default)]
pub struct OpenSet {
    open: AHashSet<ComponentId>,
}

impl OpenSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip `id`; returns whether it is now open.
    pub fn toggle(&mut self, id: &ComponentId) -> bool {
        if self.open.remove(id) {
            false
        } else {
            self.open.insert(id.clone());
            true
        }
    }

    /// Returns true if `id` was closed before.
    pub fn open(&mut self, id: impl Into<ComponentId>) -> bool {
        self.open.insert(id.into())
    }

    /// Returns true if `id` was open before.
    pub fn close(&mut self, id: &ComponentId) -> bool {
        self.open.remove(id)
    }

    #[must_use]
    pub fn is_open(&self, id: &ComponentId) -> bool {
        self.open.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.open.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

impl<I: Into<ComponentId>> FromIterator<I> for OpenSet {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        Self {
            open: iter.into_iter().map(Into::into).collect(),
        }
    }
}
