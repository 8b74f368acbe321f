#![forbid(unsafe_code)]

//! Ordered parent → children lists with a derived child → parent map.
//!
//! # Invariants
//!
//! 1. `parent[c] == p` iff `c` appears in `children[p]`.
//! 2. Every id appears in at most one child list, at most once.
//! 3. No id is its own ancestor.
//!
//! Mutation goes through [`TreeIndex::plan`] then [`TreeIndex::apply`]: the
//! plan validates everything against the current state and the apply step
//! cannot fail, so a rejected change leaves the index untouched.

use ahash::{AHashMap, AHashSet};

use crate::error::TreeError;
use crate::id::ComponentId;

/// A validated child-list replacement, ready to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildrenPlan {
    parent: ComponentId,
    children: Vec<ComponentId>,
    /// Other parents losing a child to `parent`, in first-seen order.
    donors: Vec<ComponentId>,
}

impl ChildrenPlan {
    #[must_use]
    pub fn parent(&self) -> &ComponentId {
        &self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }

    /// Parents other than [`parent`](Self::parent) whose lists will change.
    #[must_use]
    pub fn donors(&self) -> &[ComponentId] {
        &self.donors
    }
}

#[derive(Debug, Clone, Default)]
pub struct TreeIndex {
    children: AHashMap<ComponentId, Vec<ComponentId>>,
    parents: AHashMap<ComponentId, ComponentId>,
}

impl TreeIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordered children of `id`. Empty when `id` has none.
    #[must_use]
    pub fn children_of(&self, id: &ComponentId) -> &[ComponentId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn parent_of(&self, id: &ComponentId) -> Option<&ComponentId> {
        self.parents.get(id)
    }

    /// Position of `id` within its parent's child list.
    #[must_use]
    pub fn position_of(&self, id: &ComponentId) -> Option<usize> {
        let parent = self.parents.get(id)?;
        self.children_of(parent).iter().position(|c| c == id)
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors<'a>(&'a self, id: &ComponentId) -> impl Iterator<Item = &'a ComponentId> + 'a {
        let mut next = self.parents.get(id);
        std::iter::from_fn(move || {
            let current = next?;
            next = self.parents.get(current);
            Some(current)
        })
    }

    /// Whether `ancestor` is a strict ancestor of `id`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: &ComponentId, id: &ComponentId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Validate replacing the children of `parent` with `children`.
    ///
    /// `root` can never become a child. Registration and `accepts_child`
    /// checks belong to the caller, which owns the component store.
    pub fn plan(
        &self,
        root: &ComponentId,
        parent: &ComponentId,
        children: Vec<ComponentId>,
    ) -> Result<ChildrenPlan, TreeError> {
        let mut seen = AHashSet::with_capacity(children.len());
        let mut donors: Vec<ComponentId> = Vec::new();

        for child in &children {
            if !seen.insert(child) {
                return Err(TreeError::DuplicateChild {
                    parent: parent.clone(),
                    child: child.clone(),
                });
            }
            if child == parent || child == root || self.is_ancestor(child, parent) {
                return Err(TreeError::CycleDetected {
                    parent: parent.clone(),
                    child: child.clone(),
                });
            }
            if let Some(current) = self.parents.get(child)
                && current != parent
                && !donors.contains(current)
            {
                donors.push(current.clone());
            }
        }

        Ok(ChildrenPlan {
            parent: parent.clone(),
            children,
            donors,
        })
    }

    /// Apply a plan produced by [`plan`](Self::plan) against this same state.
    pub fn apply(&mut self, plan: ChildrenPlan) {
        let ChildrenPlan {
            parent, children, ..
        } = plan;

        // Detach previous children that are not kept.
        if let Some(previous) = self.children.remove(&parent) {
            for old in previous {
                if self.parents.get(&old) == Some(&parent) {
                    self.parents.remove(&old);
                }
            }
        }

        // Steal incoming children from their current parents.
        for child in &children {
            if let Some(donor) = self.parents.get(child).cloned()
                && donor != parent
                && let Some(list) = self.children.get_mut(&donor)
            {
                list.retain(|c| c != child);
            }
            self.parents.insert(child.clone(), parent.clone());
        }

        if !children.is_empty() {
            self.children.insert(parent, children);
        }
    }

    /// Remove `id` from the index: it leaves its parent's list and its own
    /// children become detached. Returns the former parent.
    pub fn detach(&mut self, id: &ComponentId) -> Option<ComponentId> {
        let parent = self.parents.remove(id);
        if let Some(parent) = &parent
            && let Some(list) = self.children.get_mut(parent)
        {
            list.retain(|c| c != id);
        }
        if let Some(children) = self.children.remove(id) {
            for child in children {
                self.parents.remove(&child);
            }
        }
        parent
    }

    /// Number of parent → child edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.parents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<ComponentId> {
        names.iter().map(|n| ComponentId::from(*n)).collect()
    }

    fn set(index: &mut TreeIndex, parent: &str, children: &[&str]) -> Result<(), TreeError> {
        let plan = index.plan(&"root".into(), &parent.into(), ids(children))?;
        index.apply(plan);
        Ok(())
    }

    #[test]
    fn children_and_parents_stay_in_sync() {
        let mut index = TreeIndex::new();
        set(&mut index, "root", &["a", "d"]).unwrap();
        set(&mut index, "a", &["b", "c"]).unwrap();

        assert_eq!(index.children_of(&"a".into()), ids(&["b", "c"]).as_slice());
        assert_eq!(index.parent_of(&"c".into()), Some(&"a".into()));
        assert_eq!(index.position_of(&"d".into()), Some(1));
        assert_eq!(index.edge_count(), 4);
    }

    #[test]
    fn unknown_id_has_no_children() {
        let index = TreeIndex::new();
        assert!(index.children_of(&"ghost".into()).is_empty());
    }

    #[test]
    fn moving_child_removes_it_from_old_parent() {
        let mut index = TreeIndex::new();
        set(&mut index, "root", &["a", "d"]).unwrap();
        set(&mut index, "a", &["b", "c"]).unwrap();

        let plan = index
            .plan(&"root".into(), &"root".into(), ids(&["a", "d", "b"]))
            .unwrap();
        assert_eq!(plan.donors(), ids(&["a"]).as_slice());
        index.apply(plan);

        assert_eq!(index.children_of(&"a".into()), ids(&["c"]).as_slice());
        assert_eq!(index.parent_of(&"b".into()), Some(&"root".into()));
    }

    #[test]
    fn dropped_children_become_detached() {
        let mut index = TreeIndex::new();
        set(&mut index, "root", &["a", "b"]).unwrap();
        set(&mut index, "root", &["b"]).unwrap();
        assert_eq!(index.parent_of(&"a".into()), None);
        assert_eq!(index.edge_count(), 1);
    }

    #[test]
    fn ancestor_as_child_is_a_cycle() {
        let mut index = TreeIndex::new();
        set(&mut index, "root", &["a"]).unwrap();
        set(&mut index, "a", &["b"]).unwrap();

        let err = set(&mut index, "b", &["a"]).unwrap_err();
        assert_eq!(
            err,
            TreeError::CycleDetected {
                parent: "b".into(),
                child: "a".into()
            }
        );
        // Untouched.
        assert_eq!(index.children_of(&"a".into()), ids(&["b"]).as_slice());
        assert!(index.children_of(&"b".into()).is_empty());
    }

    #[test]
    fn self_and_root_are_cycles() {
        let mut index = TreeIndex::new();
        set(&mut index, "root", &["a"]).unwrap();
        assert!(matches!(
            set(&mut index, "a", &["a"]),
            Err(TreeError::CycleDetected { .. })
        ));
        assert!(matches!(
            set(&mut index, "a", &["root"]),
            Err(TreeError::CycleDetected { .. })
        ));
    }

    #[test]
    fn duplicates_rejected() {
        let mut index = TreeIndex::new();
        let err = set(&mut index, "root", &["a", "a"]).unwrap_err();
        assert!(matches!(err, TreeError::DuplicateChild { .. }));
        assert_eq!(index.edge_count(), 0);
    }

    #[test]
    fn ancestors_nearest_first() {
        let mut index = TreeIndex::new();
        set(&mut index, "root", &["a"]).unwrap();
        set(&mut index, "a", &["b"]).unwrap();
        set(&mut index, "b", &["c"]).unwrap();
        let chain: Vec<_> = index.ancestors(&"c".into()).cloned().collect();
        assert_eq!(chain, ids(&["b", "a", "root"]));
        assert!(index.is_ancestor(&"root".into(), &"c".into()));
        assert!(!index.is_ancestor(&"c".into(), &"a".into()));
    }

    #[test]
    fn detach_orphans_children() {
        let mut index = TreeIndex::new();
        set(&mut index, "root", &["a", "d"]).unwrap();
        set(&mut index, "a", &["b"]).unwrap();
        assert_eq!(index.detach(&"a".into()), Some("root".into()));
        assert_eq!(index.children_of(&"root".into()), ids(&["d"]).as_slice());
        assert_eq!(index.parent_of(&"b".into()), None);
    }
}
