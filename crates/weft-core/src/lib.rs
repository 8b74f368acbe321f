#![forbid(unsafe_code)]

//! Core: the authoritative component tree of one editor session.
//!
//! # Role in weft
//! `weft-core` owns the state every other layer reads. The canvas renderer
//! subscribes to per-component change topics, and the navigator panel mutates
//! the tree through a single validated entry point.
//!
//! # Primary responsibilities
//! - **ComponentStore**: descriptors indexed by [`ComponentId`].
//! - **TreeIndex**: ordered parent → children lists with a derived parent map.
//! - **ChangeBus**: synchronous per-id publish/subscribe.
//! - **EditorSession**: the cloneable handle tying the three together, where
//!   `set_children` validates, applies, then publishes.
//! - **ChildrenBinding**: what a canvas renderer holds to mirror one
//!   component's children.
//!
//! # How it fits in the system
//! `weft-navigator` builds list snapshots from an [`EditorSession`] and feeds
//! drag-drop results back through [`EditorSession::set_children`]. Nothing in
//! this crate is global: every session is created and passed explicitly.

pub mod binding;
pub mod bus;
pub mod error;
pub mod id;
pub mod session;
pub mod store;
pub mod tree_index;

pub use binding::ChildrenBinding;
pub use bus::{ChangeBus, MAX_PUBLISH_DEPTH, Subscription, WeakChangeBus};
pub use error::TreeError;
pub use id::ComponentId;
pub use session::{EditorSession, WeakSession};
pub use store::{ComponentDescriptor, ComponentStore};
pub use tree_index::TreeIndex;

/// Result alias for tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;
