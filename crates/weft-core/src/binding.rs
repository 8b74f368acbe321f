#![forbid(unsafe_code)]

//! Renderer-side mirror of one component's children.
//!
//! A canvas renderer for a container component needs two things: the current
//! child ids to render, and a signal that it must re-render. [`ChildrenBinding`]
//! reads the children once at creation (they may already be in the tree when
//! the renderer mounts), then re-reads them on every notification for its id
//! and bumps [`version`](ChildrenBinding::version).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::bus::Subscription;
use crate::id::ComponentId;
use crate::session::EditorSession;

pub struct ChildrenBinding {
    id: ComponentId,
    children: Rc<RefCell<Vec<ComponentId>>>,
    version: Rc<Cell<u64>>,
    _subscription: Subscription,
}

impl ChildrenBinding {
    /// Bind to `id` on `session`.
    ///
    /// The binding only holds a weak session handle, so it never keeps the
    /// session alive. Dropping it unsubscribes.
    #[must_use]
    pub fn new<P: 'static>(session: &EditorSession<P>, id: impl Into<ComponentId>) -> Self {
        let id = id.into();
        let children = Rc::new(RefCell::new(session.children_of(&id)));
        let version = Rc::new(Cell::new(0u64));

        let subscription = {
            let weak = session.downgrade();
            let children = Rc::clone(&children);
            let version = Rc::clone(&version);
            session.subscribe(id.clone(), move |id| {
                // Unregistered or leaf: children_of is empty.
                let next = weak
                    .upgrade()
                    .map(|session| session.children_of(id))
                    .unwrap_or_default();
                *children.borrow_mut() = next;
                version.set(version.get() + 1);
                trace!(id = %id, version = version.get(), "binding.refresh");
            })
        };

        Self {
            id,
            children,
            version,
            _subscription: subscription,
        }
    }

    #[must_use]
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Children as of the last notification.
    #[must_use]
    pub fn children(&self) -> Vec<ComponentId> {
        self.children.borrow().clone()
    }

    /// Number of refreshes since the binding was created.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.get()
    }
}

impl fmt::Debug for ChildrenBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildrenBinding")
            .field("id", &self.id)
            .field("children", &self.children.borrow().len())
            .field("version", &self.version.get())
            .finish()
    }
}
