#![forbid(unsafe_code)]

//! weft public facade crate.
//!
//! Re-exports the component tree core and the navigator panel logic, with a
//! prelude for day-to-day usage.
//!
//! ```rust,ignore
//! use weft::prelude::*;
//!
//! let session = EditorSession::new(ComponentDescriptor::container("root", "Body"));
//! let mut navigator = Navigator::new(NavigatorConfig::default());
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use weft_core::{
    ChangeBus, ChildrenBinding, ComponentDescriptor, ComponentId, ComponentStore, EditorSession,
    MAX_PUBLISH_DEPTH, Subscription, TreeError, TreeIndex, WeakChangeBus, WeakSession,
};

// --- Navigator re-exports --------------------------------------------------

pub use weft_navigator::{
    ConfigError, DragEffect, DragEvent, DragState, DropInstruction, FlattenedNode, HoverGeometry,
    Navigator, NavigatorChange, NavigatorConfig, NavigatorHandler, NavigatorNode, NodeKind,
    OpenSet, PointerSample, flatten,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for weft hosts.
#[derive(Debug)]
pub enum Error {
    /// Tree mutation or lookup failed.
    Tree(TreeError),
    /// Navigator configuration could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tree(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            Self::Config(err) => Some(err),
        }
    }
}

impl From<TreeError> for Error {
    fn from(err: TreeError) -> Self {
        Self::Tree(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

/// Standard result type for weft APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        ComponentDescriptor, ComponentId, DragEvent, EditorSession, Error, Navigator,
        NavigatorChange, NavigatorConfig, NavigatorHandler, NavigatorNode, OpenSet, PointerSample,
        Result,
    };

    pub use crate::{core, navigator};
}

pub use weft_core as core;
pub use weft_navigator as navigator;
