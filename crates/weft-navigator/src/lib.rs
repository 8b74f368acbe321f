#![forbid(unsafe_code)]

//! Navigator panel logic: the layer list beside the canvas.
//!
//! # Role in weft
//! The navigator shows the component tree as an indented list of fixed-height
//! rows and lets the user reorder and reparent components by dragging rows.
//!
//! # Primary responsibilities
//! - **NavigatorNode / OpenSet**: snapshot of the tree as displayed.
//! - **flatten**: snapshot to visible rows.
//! - **HoverGeometry**: pointer position to row index.
//! - **drag_drop**: the pure drag state machine and drop resolution.
//! - **Navigator**: event queue plus effect application against an
//!   [`EditorSession`](weft_core::EditorSession).
//!
//! # How it fits in the system
//! Reads from and writes to `weft-core` only through the session handle. The
//! host owns rendering, the open/closed state, and the clock.

pub mod config;
pub mod drag_drop;
pub mod flatten;
pub mod geometry;
pub mod navigator;
pub mod node;

pub use config::{ConfigError, NavigatorConfig};
pub use drag_drop::{
    Detour, DragContext, DragEffect, DragEvent, DragState, DropInstruction, DropResolution,
    TransitionInput, resolve_drop, transition,
};
pub use flatten::{FlattenedNode, flatten, flatten_excluding, index_of, visible_descendants};
pub use geometry::{DEFAULT_ROW_HEIGHT, HoverGeometry, PointerSample};
pub use navigator::{Navigator, NavigatorChange, NavigatorHandler};
pub use node::{NavigatorNode, NodeKind, OpenSet};
