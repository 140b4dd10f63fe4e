#![forbid(unsafe_code)]

//! Recursive docking-layout engine.
//!
//! A host region is modelled as a tree of splittable containers and
//! leaf items. Leaves host opaque guest widgets (or stand in as
//! placeholders for hidden ones); containers order children along one
//! orientation and redistribute space on every edit so that minimum
//! sizes always hold.
//!
//! The crate is organised as:
//!
//! - [`item`] - the split-tree arena and every container algorithm
//!   (insert, remove, grow, squeeze, proportional resize, audit).
//! - [`separator`] - the press/move/release drag model behind
//!   interactive resizes, in eager and lazy (rubber-band) flavours.
//! - [`snapshot`] - versioned JSON layout snapshots with rescaling.
//! - [`engine`] - the [`DockLayout`] façade the surrounding UI calls.
//! - [`guest`] - the capability a hosted widget implements, and the
//!   observer interface for the host.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use dockpane_layout::{DockLayout, Guest, Location, Rect, Size};
//!
//! struct Panel(Cell<Rect>);
//! impl Guest for Panel {
//!     fn min_size(&self) -> Size { Size::new(100, 100) }
//!     fn set_geometry(&self, rect: Rect) { self.0.set(rect); }
//!     fn set_visible(&self, _visible: bool) {}
//!     fn stable_id(&self) -> String { "panel".into() }
//! }
//!
//! let mut layout = DockLayout::new(Size::new(1000, 1000));
//! let panel = Rc::new(Panel(Cell::new(Rect::default())));
//! let item = layout.add_guest(panel.clone(), Location::Left, None).unwrap();
//! assert_eq!(panel.0.get(), Rect::new(0, 0, 1000, 1000));
//! assert!(layout.check_sanity());
//! # let _ = item;
//! ```

pub mod engine;
mod drop;
pub mod error;
pub mod guest;
pub mod item;
pub mod separator;
pub mod snapshot;

pub use dockpane_core::{Location, Orientation, Point, Rect, Side, Size};

pub use engine::{DockLayout, LastPosition};
pub use error::LayoutError;
pub use guest::{Guest, GuestEvent, GuestHandle, LayoutObserver};
pub use item::{
    hardcoded_minimum_size, ItemId, ItemTree, LengthOnSide, SizingInfo, MAX_LENGTH, MIN_HEIGHT,
    MIN_WIDTH, SEPARATOR_THICKNESS,
};
pub use separator::{DragEffect, DragState, ResizeMode, SeparatorDrag, START_DRAG_DISTANCE};
pub use snapshot::{
    LayoutSnapshot, NodeDesc, OrientationDesc, RectDesc, RestoreOptions, SizeDesc,
    SERIALIZATION_VERSION,
};
