#![forbid(unsafe_code)]

//! Error taxonomy for tree lookups and mutations.
//!
//! | Variant | Meaning for callers |
//! |---|---|
//! | `NotFound` | Skip the node; never abort a gesture over it. |
//! | `InvalidParent` | Programming error: children given to a leaf. |
//! | `CycleDetected` | Expected outcome of an invalid drop target; abort silently. |
//! | `DuplicateChild` | Programming error: a child list repeats an id. |
//! | `DuplicateId` | A descriptor with this id is already registered. |

use std::fmt;

use crate::id::ComponentId;

/// Failure of a store or tree-index operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// No component is registered under this id.
    NotFound { id: ComponentId },
    /// The component does not accept children.
    InvalidParent { id: ComponentId },
    /// Making `child` a child of `parent` would create a cycle.
    CycleDetected {
        parent: ComponentId,
        child: ComponentId,
    },
    /// `child` appears more than once in the new child list of `parent`.
    DuplicateChild {
        parent: ComponentId,
        child: ComponentId,
    },
    /// A descriptor with this id is already registered.
    DuplicateId { id: ComponentId },
}

impl TreeError {
    /// Whether this error is the expected result of an invalid drop target
    /// rather than a bug in the caller.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::CycleDetected { .. } | Self::NotFound { .. })
    }
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "component {id} not found"),
            Self::InvalidParent { id } => {
                write!(f, "component {id} does not accept children")
            }
            Self::CycleDetected { parent, child } => {
                write!(f, "moving {child} under {parent} would create a cycle")
            }
            Self::DuplicateChild { parent, child } => {
                write!(f, "child {child} listed more than once under {parent}")
            }
            Self::DuplicateId { id } => write!(f, "component {id} is already registered"),
        }
    }
}

impl std::error::Error for TreeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = TreeError::CycleDetected {
            parent: "b".into(),
            child: "a".into(),
        };
        assert_eq!(err.to_string(), "moving a under b would create a cycle");
        assert_eq!(
            TreeError::NotFound { id: "x".into() }.to_string(),
            "component x not found"
        );
    }

    #[test]
    fn expected_errors() {
        assert!(TreeError::NotFound { id: "x".into() }.is_expected());
        assert!(!TreeError::InvalidParent { id: "x".into() }.is_expected());
    }
}
