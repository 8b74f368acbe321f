#![forbid(unsafe_code)]

//! One editor session: store, tree index, and change bus behind one handle.
//!
//! [`EditorSession`] is cheap to clone; clones share the same state. It is
//! created per editor and handed to whatever needs the tree (navigator,
//! canvas renderers, property panels). There is no global instance.
//!
//! # Mutation
//!
//! [`set_children`](EditorSession::set_children) is the only way to change
//! the tree shape. It validates against the store and the index, applies the
//! change, releases the interior borrow, and only then publishes. Callbacks
//! are therefore free to read the session, or mutate it again.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::bus::{ChangeBus, Subscription, WeakChangeBus};
use crate::error::TreeError;
use crate::id::ComponentId;
use crate::store::{ComponentDescriptor, ComponentStore};
use crate::tree_index::TreeIndex;

struct SessionState<P> {
    root: ComponentId,
    store: ComponentStore<P>,
    tree: TreeIndex,
}

/// Handle to the component tree of one editor session.
pub struct EditorSession<P> {
    state: Rc<RefCell<SessionState<P>>>,
    bus: ChangeBus,
}

impl<P> Clone for EditorSession<P> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            bus: self.bus.clone(),
        }
    }
}

impl<P> fmt::Debug for EditorSession<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EditorSession")
            .field("root", &state.root)
            .field("components", &state.store.len())
            .field("edges", &state.tree.edge_count())
            .finish()
    }
}

impl<P: 'static> EditorSession<P> {
    /// Start a session around the synthetic root component.
    ///
    /// The root always accepts children, whatever the descriptor says.
    #[must_use]
    pub fn new(root: ComponentDescriptor<P>) -> Self {
        let root_id = root.id().clone();
        let mut store = ComponentStore::new();
        let root = if root.accepts_child() {
            root
        } else {
            ComponentDescriptor::container(root_id.clone(), root.into_payload())
        };
        // Fresh store: cannot collide.
        let _ = store.insert(root);
        Self {
            state: Rc::new(RefCell::new(SessionState {
                root: root_id,
                store,
                tree: TreeIndex::new(),
            })),
            bus: ChangeBus::new(),
        }
    }

    #[must_use]
    pub fn root(&self) -> ComponentId {
        self.state.borrow().root.clone()
    }

    #[must_use]
    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    /// Weak handle, for callbacks stored on this session's own bus.
    #[must_use]
    pub fn downgrade(&self) -> WeakSession<P> {
        WeakSession {
            state: Rc::downgrade(&self.state),
            bus: self.bus.downgrade(),
        }
    }

    // --- Store ------------------------------------------------------------

    /// Index a component created by the host. It starts detached.
    pub fn register(&self, descriptor: ComponentDescriptor<P>) -> Result<(), TreeError> {
        let id = descriptor.id().clone();
        self.state.borrow_mut().store.insert(descriptor)?;
        debug!(id = %id, "session.register");
        Ok(())
    }

    /// Remove a component from the store and the tree.
    ///
    /// Its parent loses it (and is notified); its children become detached.
    pub fn unregister(&self, id: &ComponentId) -> Result<ComponentDescriptor<P>, TreeError> {
        let (descriptor, parent) = {
            let mut state = self.state.borrow_mut();
            if *id == state.root {
                return Err(TreeError::InvalidParent { id: id.clone() });
            }
            let descriptor = state.store.remove(id)?;
            let parent = state.tree.detach(id);
            (descriptor, parent)
        };
        debug!(id = %id, parent = ?parent, "session.unregister");
        self.bus.publish(id);
        if let Some(parent) = parent {
            self.bus.publish(&parent);
        }
        Ok(descriptor)
    }

    #[must_use]
    pub fn contains(&self, id: &ComponentId) -> bool {
        self.state.borrow().store.contains(id)
    }

    /// Whether `id` accepts children.
    pub fn accepts_child(&self, id: &ComponentId) -> Result<bool, TreeError> {
        Ok(self.state.borrow().store.get(id)?.accepts_child())
    }

    /// Borrow a descriptor for the duration of `f`.
    ///
    /// `f` must not mutate this session.
    pub fn with_component<R>(
        &self,
        id: &ComponentId,
        f: impl FnOnce(&ComponentDescriptor<P>) -> R,
    ) -> Result<R, TreeError> {
        let state = self.state.borrow();
        Ok(f(state.store.get(id)?))
    }

    /// Mutate a component's payload (its props) and notify its subscribers.
    pub fn update_payload<R>(
        &self,
        id: &ComponentId,
        f: impl FnOnce(&mut P) -> R,
    ) -> Result<R, TreeError> {
        let out = {
            let mut state = self.state.borrow_mut();
            f(state.store.get_mut(id)?.payload_mut())
        };
        trace!(id = %id, "session.update_payload");
        self.bus.publish(id);
        Ok(out)
    }

    /// Attach the renderer back-reference for `id`. Does not notify.
    pub fn attach_renderer(&self, id: &ComponentId, renderer: Weak<dyn Any>) -> Result<(), TreeError> {
        self.state
            .borrow_mut()
            .store
            .get_mut(id)?
            .set_renderer(renderer);
        Ok(())
    }

    // --- Tree -------------------------------------------------------------

    /// Ordered children of `id`; empty if it has none or does not accept any.
    #[must_use]
    pub fn children_of(&self, id: &ComponentId) -> Vec<ComponentId> {
        let state = self.state.borrow();
        match state.store.get(id) {
            Ok(desc) if desc.accepts_child() => state.tree.children_of(id).to_vec(),
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn parent_of(&self, id: &ComponentId) -> Option<ComponentId> {
        self.state.borrow().tree.parent_of(id).cloned()
    }

    /// Position of `id` within its parent's children.
    #[must_use]
    pub fn position_of(&self, id: &ComponentId) -> Option<usize> {
        self.state.borrow().tree.position_of(id)
    }

    /// Ancestors of `id`, nearest first.
    #[must_use]
    pub fn ancestors(&self, id: &ComponentId) -> Vec<ComponentId> {
        self.state.borrow().tree.ancestors(id).cloned().collect()
    }

    #[must_use]
    pub fn is_ancestor(&self, ancestor: &ComponentId, id: &ComponentId) -> bool {
        self.state.borrow().tree.is_ancestor(ancestor, id)
    }

    /// Replace the children of `id` wholesale.
    ///
    /// All checks run before any mutation. On success, subscribers of `id`
    /// are notified first, then subscribers of every other parent that lost
    /// a child to `id`, all before this returns.
    pub fn set_children(&self, id: &ComponentId, children: Vec<ComponentId>) -> Result<(), TreeError> {
        let notify = {
            let mut state = self.state.borrow_mut();
            if !state.store.get(id)?.accepts_child() {
                return Err(TreeError::InvalidParent { id: id.clone() });
            }
            if let Some(missing) = children.iter().find(|c| !state.store.contains(c)) {
                return Err(TreeError::NotFound {
                    id: missing.clone(),
                });
            }
            let plan = state.tree.plan(&state.root, id, children)?;
            let mut notify = Vec::with_capacity(1 + plan.donors().len());
            notify.push(id.clone());
            notify.extend(plan.donors().iter().cloned());
            debug!(
                parent = %id,
                children = plan.children().len(),
                donors = plan.donors().len(),
                "session.set_children"
            );
            state.tree.apply(plan);
            notify
        };

        for parent in &notify {
            self.bus.publish(parent);
        }
        Ok(())
    }

    // --- Notification -----------------------------------------------------

    /// Subscribe to changes of `id`'s children or props.
    pub fn subscribe(
        &self,
        id: impl Into<ComponentId>,
        callback: impl Fn(&ComponentId) + 'static,
    ) -> Subscription {
        self.bus.subscribe(id, callback)
    }

    /// Tell subscribers of `id` to re-read it.
    pub fn publish(&self, id: &ComponentId) -> usize {
        self.bus.publish(id)
    }
}

/// Non-owning counterpart of [`EditorSession`].
///
/// Holds neither the state nor the bus, so a callback capturing it does not
/// keep its own session alive.
pub struct WeakSession<P> {
    state: Weak<RefCell<SessionState<P>>>,
    bus: WeakChangeBus,
}

impl<P> Clone for WeakSession<P> {
    fn clone(&self) -> Self {
        Self {
            state: Weak::clone(&self.state),
            bus: self.bus.clone(),
        }
    }
}

impl<P> WeakSession<P> {
    #[must_use]
    pub fn upgrade(&self) -> Option<EditorSession<P>> {
        Some(EditorSession {
            state: self.state.upgrade()?,
            bus: self.bus.upgrade()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn session() -> EditorSession<&'static str> {
        let session = EditorSession::new(ComponentDescriptor::container("root", "Body"));
        session
            .register(ComponentDescriptor::container("a", "Flex"))
            .unwrap();
        session.register(ComponentDescriptor::leaf("b", "Text")).unwrap();
        session.register(ComponentDescriptor::leaf("c", "Text")).unwrap();
        session.register(ComponentDescriptor::leaf("d", "Image")).unwrap();
        session
            .set_children(&"root".into(), vec!["a".into(), "d".into()])
            .unwrap();
        session
            .set_children(&"a".into(), vec!["b".into(), "c".into()])
            .unwrap();
        session
    }

    fn ids(names: &[&str]) -> Vec<ComponentId> {
        names.iter().map(|n| ComponentId::from(*n)).collect()
    }

    #[test]
    fn children_of_leaf_is_empty() {
        let s = session();
        assert!(s.children_of(&"b".into()).is_empty());
        assert!(s.children_of(&"ghost".into()).is_empty());
        assert_eq!(s.children_of(&"a".into()), ids(&["b", "c"]));
    }

    #[test]
    fn set_children_on_leaf_is_invalid_parent() {
        let s = session();
        let err = s.set_children(&"b".into(), ids(&["c"])).unwrap_err();
        assert_eq!(err, TreeError::InvalidParent { id: "b".into() });
        assert_eq!(s.children_of(&"a".into()), ids(&["b", "c"]));
    }

    #[test]
    fn unknown_child_is_not_found() {
        let s = session();
        let err = s.set_children(&"a".into(), ids(&["b", "zz"])).unwrap_err();
        assert_eq!(err, TreeError::NotFound { id: "zz".into() });
    }

    #[test]
    fn cycle_leaves_store_untouched_and_silent() {
        let s = session();
        s.register(ComponentDescriptor::container("inner", "Flex"))
            .unwrap();
        s.set_children(&"a".into(), ids(&["b", "c", "inner"])).unwrap();

        let fired = Rc::new(Cell::new(0));
        let _sub = {
            let fired = Rc::clone(&fired);
            s.subscribe("inner", move |_| fired.set(fired.get() + 1))
        };
        let err = s.set_children(&"inner".into(), ids(&["a"])).unwrap_err();
        assert!(matches!(err, TreeError::CycleDetected { .. }));
        assert_eq!(fired.get(), 0);
        assert_eq!(s.parent_of(&"a".into()), Some("root".into()));
    }

    #[test]
    fn notifies_target_then_donor() {
        let s = session();
        let log = Rc::new(RefCell::new(Vec::new()));
        let _subs: Vec<_> = ["root", "a"]
            .into_iter()
            .map(|id| {
                let log = Rc::clone(&log);
                s.subscribe(id, move |id| log.borrow_mut().push(id.to_string()))
            })
            .collect();

        s.set_children(&"root".into(), ids(&["a", "d", "b"])).unwrap();
        assert_eq!(*log.borrow(), vec!["root".to_string(), "a".to_string()]);
        assert_eq!(s.children_of(&"a".into()), ids(&["c"]));
    }

    #[test]
    fn callback_can_read_session() {
        let s = session();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _sub = {
            let weak = s.downgrade();
            let seen = Rc::clone(&seen);
            s.subscribe("a", move |id| {
                if let Some(s) = weak.upgrade() {
                    *seen.borrow_mut() = s.children_of(id);
                }
            })
        };
        s.set_children(&"a".into(), ids(&["c", "b"])).unwrap();
        assert_eq!(*seen.borrow(), ids(&["c", "b"]));
    }

    #[test]
    fn update_payload_publishes() {
        let s = session();
        let fired = Rc::new(Cell::new(false));
        let _sub = {
            let fired = Rc::clone(&fired);
            s.subscribe("b", move |_| fired.set(true))
        };
        s.update_payload(&"b".into(), |p| *p = "Heading").unwrap();
        assert!(fired.get());
        assert_eq!(s.with_component(&"b".into(), |d| *d.payload()).unwrap(), "Heading");
    }

    #[test]
    fn unregister_detaches_and_notifies_parent() {
        let s = session();
        let fired = Rc::new(Cell::new(0));
        let _sub = {
            let fired = Rc::clone(&fired);
            s.subscribe("a", move |_| fired.set(fired.get() + 1))
        };
        let desc = s.unregister(&"b".into()).unwrap();
        assert_eq!(desc.id(), &ComponentId::from("b"));
        assert_eq!(s.children_of(&"a".into()), ids(&["c"]));
        assert_eq!(fired.get(), 1);
        assert!(!s.contains(&"b".into()));
    }

    #[test]
    fn root_cannot_be_unregistered_or_parented() {
        let s = session();
        assert!(s.unregister(&"root".into()).is_err());
        assert!(matches!(
            s.set_children(&"a".into(), ids(&["root"])),
            Err(TreeError::CycleDetected { .. })
        ));
    }

    #[test]
    fn weak_session_in_own_callback_does_not_keep_it_alive() {
        let s = session();
        let weak = s.downgrade();
        let bus = s.bus().downgrade();
        let _sub = {
            let weak = weak.clone();
            s.subscribe("a", move |id| {
                if let Some(s) = weak.upgrade() {
                    let _ = s.children_of(id);
                }
            })
        };
        drop(s);
        assert!(weak.upgrade().is_none());
        assert!(bus.upgrade().is_none());
    }

    #[test]
    fn non_container_root_is_promoted() {
        let s = EditorSession::new(ComponentDescriptor::leaf("root", ()));
        assert_eq!(s.accepts_child(&"root".into()), Ok(true));
    }
}
