//! Drop-rectangle suggestion.
//!
//! Given a prospective pane's minimum size, an optional anchor item, and
//! a location, compute the rectangle the pane would occupy if dropped.
//! The rectangle is in the coordinate system of the owning container;
//! the caller lifts it to root coordinates.

use dockpane_core::{Location, Rect, Side, Size};

use crate::error::LayoutError;
use crate::item::{ItemId, ItemTree, SEPARATOR_THICKNESS};

/// Resolve the rectangle a drop would occupy.
///
/// Returns the owning container together with a rectangle relative to
/// it. An anchor that is the sole visible pane degrades to an
/// unanchored (root-band) suggestion.
pub(crate) fn suggested_drop_rect(
    tree: &ItemTree,
    min_size: Size,
    anchor: Option<ItemId>,
    location: Location,
) -> Result<(ItemId, Rect), LayoutError> {
    let Some(location_o) = location.orientation() else {
        return Err(LayoutError::InvalidLocation { location });
    };
    let side = location
        .side()
        .ok_or(LayoutError::InvalidLocation { location })?;

    let anchor = match anchor {
        Some(item) => {
            if !tree.contains(item) || !tree.is_visible(item) {
                return Err(LayoutError::UnknownAnchor { item });
            }
            match tree.parent(item) {
                // The root itself, or a pane alone in its container:
                // both collapse to the unanchored case.
                None => None,
                Some(parent) if tree.num_visible_children(parent) == 1 => None,
                Some(_) => Some(item),
            }
        }
        None => None,
    };

    let Some(anchor) = anchor else {
        return Ok((tree.root(), root_band(tree, min_size, location)));
    };

    let parent = tree
        .parent(anchor)
        .ok_or(LayoutError::UnknownAnchor { item: anchor })?;
    let Some(o) = tree.orientation(parent) else {
        return Err(LayoutError::UnknownAnchor { item: anchor });
    };
    let item_min = min_size.length(o);
    let available = tree.available_length(parent) - SEPARATOR_THICKNESS;
    let visible = tree.visible_children(parent);
    let equitable = tree.usable_length(parent) / (visible.len() as i32 + 1);
    let suggested = item_min.max(available.min(equitable));

    let index = visible
        .iter()
        .position(|&c| c == anchor)
        .ok_or(LayoutError::UnknownAnchor { item: anchor })?;
    let anchor_geo = tree.geometry(anchor);
    let container_length = tree.geometry(parent).length(o);

    let rect = if location_o == o {
        let pos = match side {
            Side::One => {
                if index == 0 {
                    0
                } else {
                    let side1 = tree.length_on_side(parent, index - 1, Side::One);
                    let side2 = tree.length_on_side(parent, index, Side::Two);
                    let anchor_pos = anchor_geo.pos_along(o);
                    let min1 = anchor_pos - side1.available();
                    let max2 = anchor_pos + side2.available() - suggested;
                    (anchor_pos - suggested / 2).clamp(min1, max2)
                }
            }
            Side::Two => {
                if index == visible.len() - 1 {
                    container_length - suggested
                } else {
                    let side1 = tree.length_on_side(parent, index, Side::One);
                    let side2 = tree.length_on_side(parent, index + 1, Side::Two);
                    let anchor_end = anchor_geo.end_along(o);
                    let min1 = anchor_end - side1.available();
                    let max2 = anchor_end + side2.available() - suggested;
                    (anchor_end - suggested / 2).clamp(min1, max2)
                }
            }
        };
        Rect::default()
            .with_pos_along(o, pos)
            .with_length(o, suggested)
            .with_pos_along(location_o.opposite(), anchor_geo.pos_along(location_o.opposite()))
            .with_length(
                location_o.opposite(),
                anchor_geo.length(location_o.opposite()),
            )
    } else {
        // Orthogonal drop: take half the anchor's extent at the
        // matching edge.
        let half = (anchor_geo.length(location_o) / 2).max(min_size.length(location_o));
        let pos = match side {
            Side::One => anchor_geo.pos_along(location_o),
            Side::Two => anchor_geo.end_along(location_o) - half,
        };
        Rect::default()
            .with_pos_along(location_o, pos)
            .with_length(location_o, half)
            .with_pos_along(o, anchor_geo.pos_along(o))
            .with_length(o, anchor_geo.length(o))
    };

    Ok((parent, rect))
}

/// A band of a third of the root (clamped by availability and the item
/// minimum) at the chosen edge.
fn root_band(tree: &ItemTree, min_size: Size, location: Location) -> Rect {
    let root = tree.root();
    let size = tree.size(root);
    let Some(o) = location.orientation() else {
        return Rect::from_size(size);
    };
    let item_min = min_size.length(o);
    let length = size.length(o);
    let available = (length - tree.min_size(root).length(o)) - SEPARATOR_THICKNESS;
    let one_third = length / 3;
    let suggested = item_min.max(available.min(one_third));

    let rect = Rect::from_size(size);
    match location {
        Location::Left => Rect::new(0, 0, suggested, size.height),
        Location::Top => Rect::new(0, 0, size.width, suggested),
        Location::Right => Rect::new(size.width - suggested, 0, suggested, size.height),
        Location::Bottom => Rect::new(0, size.height - suggested, size.width, suggested),
        Location::None => rect,
    }
}
