//! The guest capability and the host-facing observer interface.
//!
//! A guest is an opaque widget hosted by a leaf item. The engine
//! positions it and toggles its visibility but never owns, draws, or
//! destroys it. Guests are client-owned; the engine holds `Rc` handles.

use std::rc::Rc;

use dockpane_core::{Rect, Size};

use crate::item::ItemId;

/// Capability implemented by the client's widget.
///
/// All geometry handed to [`Guest::set_geometry`] is in root-relative
/// coordinates. Minimum and maximum sizes may change at any time; when
/// they do, the client must feed the matching [`GuestEvent`] back into
/// the engine.
pub trait Guest {
    /// Current minimum size in pixels.
    fn min_size(&self) -> Size;

    /// Current maximum size in pixels. Defaults to effectively unbounded.
    fn max_size(&self) -> Size {
        Size::new(crate::item::MAX_LENGTH, crate::item::MAX_LENGTH)
    }

    /// Position the guest at `rect`, in root-relative coordinates.
    fn set_geometry(&self, rect: Rect);

    /// Show or hide the guest as its leaf transitions visible/placeholder.
    fn set_visible(&self, visible: bool);

    /// Identifier stable across save/restore; snapshots rebind by it.
    fn stable_id(&self) -> String;
}

/// Shared handle to a client-owned guest.
pub type GuestHandle = Rc<dyn Guest>;

/// Guest-side happenings the client reports back to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestEvent {
    /// The guest's minimum size changed; the engine re-reads it.
    MinSizeChanged,
    /// The guest invalidated its layout; the engine re-applies geometry.
    LayoutInvalidated,
    /// The guest was reparented away from the engine's host region; its
    /// leaf auto-transitions to a placeholder.
    Detached,
}

/// Synchronous change notifications for the one registered host.
///
/// Callbacks run inside the mutating operation, after invariants have
/// been re-established. Implementations must not call back into the
/// engine.
pub trait LayoutObserver {
    /// An item's geometry changed.
    fn on_geometry_changed(&self, _item: ItemId) {}

    /// An item transitioned visible ↔ placeholder.
    fn on_visibility_changed(&self, _item: ItemId) {}

    /// An item's minimum size changed.
    fn on_min_size_changed(&self, _item: ItemId) {}

    /// Items were inserted, removed, or reparented.
    fn on_structure_changed(&self) {}
}
