//! Structured errors for layout operations.

use std::fmt;

use dockpane_core::{Location, Size};

use crate::item::ItemId;

/// Failure reasons surfaced by the layout engine.
///
/// Structural validation errors are raised before any state change;
/// refused resizes and drops leave the tree exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// An operation would put an item below its minimum size and no
    /// growth is permitted.
    ConstraintViolation {
        item: ItemId,
        min: Size,
        requested: Size,
    },
    /// A drop cannot be realized even after root growth.
    InsufficientSpace { needed: Size, available: Size },
    /// The anchor passed to an insert/drop is not in this tree.
    UnknownAnchor { item: ItemId },
    /// The item being inserted is already in the tree.
    DuplicateInsertion { item: ItemId },
    /// `Location::None` or an otherwise meaningless location.
    InvalidLocation { location: Location },
    /// `restore` called on a leaf that is already visible.
    AlreadyRestored { item: ItemId },
    /// `set_guest` called on a leaf that already hosts a guest.
    AlreadyAttached { item: ItemId },
    /// A snapshot whose version exceeds what this reader understands.
    SerializationVersionMismatch { version: u32, supported: u32 },
    /// A snapshot that is structurally invalid.
    MalformedSnapshot { reason: String },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConstraintViolation {
                item,
                min,
                requested,
            } => write!(
                f,
                "size {}x{} for item {} violates minimum {}x{}",
                requested.width, requested.height, item, min.width, min.height
            ),
            Self::InsufficientSpace { needed, available } => write!(
                f,
                "needed {}x{} but only {}x{} is available and the root is pinned",
                needed.width, needed.height, available.width, available.height
            ),
            Self::UnknownAnchor { item } => {
                write!(f, "anchor item {item} is not part of this layout")
            }
            Self::DuplicateInsertion { item } => {
                write!(f, "item {item} is already part of this layout")
            }
            Self::InvalidLocation { location } => {
                write!(f, "location {location:?} is not a valid insertion target")
            }
            Self::AlreadyRestored { item } => {
                write!(f, "item {item} is already visible and cannot be restored")
            }
            Self::AlreadyAttached { item } => {
                write!(f, "item {item} already hosts a guest")
            }
            Self::SerializationVersionMismatch { version, supported } => write!(
                f,
                "snapshot version {version} is newer than the supported version {supported}"
            ),
            Self::MalformedSnapshot { reason } => write!(f, "malformed snapshot: {reason}"),
        }
    }
}

impl std::error::Error for LayoutError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_the_offending_item() {
        let err = LayoutError::UnknownAnchor {
            item: ItemId::new(7).expect("non-zero id"),
        };
        assert!(err.to_string().contains('7'));

        let err = LayoutError::SerializationVersionMismatch {
            version: 9,
            supported: 3,
        };
        assert!(err.to_string().contains('9'));
        assert!(err.to_string().contains('3'));
    }
}
