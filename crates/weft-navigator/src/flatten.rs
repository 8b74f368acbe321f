#![forbid(unsafe_code)]

//! Flattening a navigator snapshot into visible rows.
//!
//! Rows are produced by a depth-first pre-order walk below the root. A row
//! is emitted when every ancestor between it and the root is open, so a
//! closed container appears as a row while its descendants do not. The root
//! itself is never a row; its children sit at depth 0.

use weft_core::ComponentId;

use crate::node::{NavigatorNode, NodeKind};

/// One visible row of the navigator list.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedNode {
    pub id: ComponentId,
    pub name: String,
    /// Ancestors below the root.
    pub depth: usize,
    pub kind: NodeKind,
    /// Always false for leaves.
    pub open: bool,
    pub parent: ComponentId,
    /// Position within `parent`'s children.
    pub position: usize,
}

impl FlattenedNode {
    #[must_use]
    pub fn is_open_container(&self) -> bool {
        self.kind == NodeKind::AcceptsChild && self.open
    }

    #[must_use]
    pub fn is_closed_container(&self) -> bool {
        self.kind == NodeKind::AcceptsChild && !self.open
    }
}

/// Visible rows of `root`, top to bottom.
#[must_use]
pub fn flatten(root: &NavigatorNode) -> Vec<FlattenedNode> {
    let mut out = Vec::new();
    walk(root, 0, None, &mut out);
    out
}

/// Visible rows of `root` as if `excluded` and its subtree had been removed.
///
/// Positions are those the remaining siblings would have after the removal.
#[must_use]
pub fn flatten_excluding(root: &NavigatorNode, excluded: &ComponentId) -> Vec<FlattenedNode> {
    let mut out = Vec::new();
    walk(root, 0, Some(excluded), &mut out);
    out
}

fn walk(
    parent: &NavigatorNode,
    depth: usize,
    excluded: Option<&ComponentId>,
    out: &mut Vec<FlattenedNode>,
) {
    let kept = parent
        .children()
        .iter()
        .filter(|child| excluded != Some(child.id()));
    for (position, child) in kept.enumerate() {
        out.push(FlattenedNode {
            id: child.id().clone(),
            name: child.name().to_owned(),
            depth,
            kind: child.kind(),
            open: child.accepts_child() && child.is_open(),
            parent: parent.id().clone(),
            position,
        });
        if child.accepts_child() && child.is_open() {
            walk(child, depth + 1, excluded, out);
        }
    }
}

/// Number of rows directly following `index` that are deeper than it.
#[must_use]
pub fn visible_descendants(rows: &[FlattenedNode], index: usize) -> usize {
    let Some(row) = rows.get(index) else {
        return 0;
    };
    rows[index + 1..]
        .iter()
        .take_while(|r| r.depth > row.depth)
        .count()
}

/// Row index of `id`, if visible.
#[must_use]
pub fn index_of(rows: &[FlattenedNode], id: &ComponentId) -> Option<usize> {
    rows.iter().position(|r| r.id == *id)
}
