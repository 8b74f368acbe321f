#![forbid(unsafe_code)]

//! Per-component change notification.
//!
//! # Design
//!
//! [`ChangeBus`] keeps one topic per [`ComponentId`]. Each topic is an
//! ordered list of callbacks. [`ChangeBus::publish`] snapshots the topic,
//! releases the interior borrow, then calls every callback in subscription
//! order on the calling thread. Nothing is queued or batched.
//!
//! # Invariants
//!
//! 1. Callbacks run in subscription order, once per `publish`.
//! 2. A publish sees the subscriber list as it was when the publish began:
//!    callbacks added during delivery wait for the next publish, and a
//!    callback removed during delivery still receives the in-flight one.
//! 3. Dropping (or calling [`Subscription::unsubscribe`] on) a guard removes
//!    exactly that callback.
//!
//! # Failure Modes
//!
//! - **Re-entrant publish**: allowed. Nesting deeper than
//!   [`MAX_PUBLISH_DEPTH`] is dropped with a warning, so a callback that
//!   republishes its own topic cannot overflow the stack.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use tracing::{debug_span, trace, warn};

use crate::id::ComponentId;

/// Nesting limit for publishes triggered from inside callbacks.
pub const MAX_PUBLISH_DEPTH: usize = 64;

type Callback = Rc<dyn Fn(&ComponentId)>;

struct Entry {
    key: u64,
    callback: Callback,
}

#[derive(Default)]
struct BusInner {
    topics: AHashMap<ComponentId, Vec<Entry>>,
    next_key: u64,
}

/// Synchronous publish/subscribe channel keyed by component id.
///
/// Cloning a `ChangeBus` creates another handle to the same topics.
#[derive(Clone, Default)]
pub struct ChangeBus {
    inner: Rc<RefCell<BusInner>>,
    depth: Rc<Cell<usize>>,
}

impl fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ChangeBus")
            .field("topics", &inner.topics.len())
            .field("depth", &self.depth.get())
            .finish()
    }
}

impl ChangeBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` on the topic of `id`.
    ///
    /// The returned guard removes the callback when dropped.
    pub fn subscribe(
        &self,
        id: impl Into<ComponentId>,
        callback: impl Fn(&ComponentId) + 'static,
    ) -> Subscription {
        let id = id.into();
        let mut inner = self.inner.borrow_mut();
        let key = inner.next_key;
        inner.next_key += 1;
        inner.topics.entry(id.clone()).or_default().push(Entry {
            key,
            callback: Rc::new(callback),
        });
        trace!(id = %id, key, "bus.subscribe");
        Subscription {
            bus: Rc::downgrade(&self.inner),
            id,
            key,
            active: true,
        }
    }

    /// Invoke every callback currently subscribed to `id`.
    ///
    /// Returns the number of callbacks invoked.
    pub fn publish(&self, id: &ComponentId) -> usize {
        let depth = self.depth.get();
        if depth >= MAX_PUBLISH_DEPTH {
            warn!(id = %id, depth, "bus.publish dropped: re-entrant depth limit reached");
            return 0;
        }

        let callbacks: Vec<Callback> = {
            let inner = self.inner.borrow();
            match inner.topics.get(id) {
                Some(entries) => entries.iter().map(|e| Rc::clone(&e.callback)).collect(),
                None => return 0,
            }
        };

        let _span = debug_span!("weft.publish", id = %id, subscribers = callbacks.len()).entered();
        self.depth.set(depth + 1);
        for callback in &callbacks {
            callback(id);
        }
        self.depth.set(depth);
        callbacks.len()
    }

    /// Number of callbacks currently subscribed to `id`.
    #[must_use]
    pub fn subscriber_count(&self, id: &ComponentId) -> usize {
        self.inner.borrow().topics.get(id).map_or(0, Vec::len)
    }

    /// Number of ids with at least one subscriber.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.inner.borrow().topics.len()
    }

    /// Non-owning handle, safe to capture in this bus's own callbacks.
    #[must_use]
    pub fn downgrade(&self) -> WeakChangeBus {
        WeakChangeBus {
            inner: Rc::downgrade(&self.inner),
            depth: Rc::downgrade(&self.depth),
        }
    }
}

/// Weak counterpart of [`ChangeBus`].
#[derive(Clone, Default)]
pub struct WeakChangeBus {
    inner: Weak<RefCell<BusInner>>,
    depth: Weak<Cell<usize>>,
}

impl WeakChangeBus {
    #[must_use]
    pub fn upgrade(&self) -> Option<ChangeBus> {
        Some(ChangeBus {
            inner: self.inner.upgrade()?,
            depth: self.depth.upgrade()?,
        })
    }
}

impl fmt::Debug for WeakChangeBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakChangeBus")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// RAII guard for one callback registered on a [`ChangeBus`].
#[must_use = "dropping a Subscription unsubscribes its callback"]
pub struct Subscription {
    bus: Weak<RefCell<BusInner>>,
    id: ComponentId,
    key: u64,
    active: bool,
}

impl Subscription {
    /// The topic this subscription listens on.
    #[must_use]
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Remove the callback now.
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        let mut inner = bus.borrow_mut();
        if let Some(entries) = inner.topics.get_mut(&self.id) {
            entries.retain(|e| e.key != self.key);
            if entries.is_empty() {
                inner.topics.remove(&self.id);
            }
        }
        trace!(id = %self.id, key = self.key, "bus.unsubscribe");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("key", &self.key)
            .finish()
    }
}
