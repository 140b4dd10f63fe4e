//! Versioned, platform-independent layout snapshots.
//!
//! The wire format is JSON: a document version, the root size, the tree
//! minimum (advisory, for validation), and a node tree. Containers
//! contribute orientation and children; leaves contribute the stable
//! guest id, visibility, root-relative geometry, minimum size, and the
//! recorded percentage within the parent. Placeholders serialize like
//! visible leaves with `visible: false`.
//!
//! Version history:
//! - v1: initial format, no `minSize`.
//! - v2: added a top-level `screenSize` (parsed and ignored today).
//! - v3: current layouting engine (this module writes v3).
//!
//! Readers accept v1–v3 and reject anything newer.

use dockpane_core::{Orientation, Point, Rect, Size};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LayoutError;
use crate::item::{clamped_min_size, ItemId, ItemTree, SEPARATOR_THICKNESS};

/// Version written by this serializer.
pub const SERIALIZATION_VERSION: u32 = 3;

/// Wire form of a size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SizeDesc {
    pub w: i32,
    pub h: i32,
}

impl From<Size> for SizeDesc {
    fn from(size: Size) -> Self {
        Self {
            w: size.width,
            h: size.height,
        }
    }
}

impl From<SizeDesc> for Size {
    fn from(desc: SizeDesc) -> Self {
        Size::new(desc.w, desc.h)
    }
}

/// Wire form of a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RectDesc {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl From<Rect> for RectDesc {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            w: rect.width,
            h: rect.height,
        }
    }
}

impl From<RectDesc> for Rect {
    fn from(desc: RectDesc) -> Self {
        Rect::new(desc.x, desc.y, desc.w, desc.h)
    }
}

/// Wire form of an orientation (`"h"` / `"v"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrientationDesc {
    #[serde(rename = "h")]
    Horizontal,
    #[serde(rename = "v")]
    Vertical,
}

impl From<Orientation> for OrientationDesc {
    fn from(o: Orientation) -> Self {
        match o {
            Orientation::Horizontal => Self::Horizontal,
            Orientation::Vertical => Self::Vertical,
        }
    }
}

impl From<OrientationDesc> for Orientation {
    fn from(desc: OrientationDesc) -> Self {
        match desc {
            OrientationDesc::Horizontal => Self::Horizontal,
            OrientationDesc::Vertical => Self::Vertical,
        }
    }
}

/// One node of the serialized tree. Unknown kinds fail deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NodeDesc {
    #[serde(rename = "container")]
    Container {
        orientation: OrientationDesc,
        children: Vec<NodeDesc>,
    },
    #[serde(rename = "leaf")]
    Leaf {
        #[serde(rename = "guestId")]
        guest_id: String,
        visible: bool,
        geometry: RectDesc,
        #[serde(rename = "minSize")]
        min_size: SizeDesc,
        percentage: f64,
    },
}

/// A complete serialized layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSnapshot {
    pub serialization_version: u32,
    pub root_size: SizeDesc,
    #[serde(default)]
    pub min_size: SizeDesc,
    /// Legacy v2 field; parsed and ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_size: Option<SizeDesc>,
    pub root: NodeDesc,
}

/// Geometry rescaling behaviour when the host size differs on restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestoreOptions {
    /// Multiply every absolute coordinate by `current/saved` per axis;
    /// percentages remain the source of truth along orientations.
    pub relative_to_host_size: bool,
}

// ── Writing ─────────────────────────────────────────────────────────

/// Capture the tree as a version-3 snapshot.
pub(crate) fn save_layout(tree: &ItemTree) -> LayoutSnapshot {
    let root = tree.root();
    LayoutSnapshot {
        serialization_version: SERIALIZATION_VERSION,
        root_size: tree.size(root).into(),
        min_size: tree.min_size(root).into(),
        screen_size: None,
        root: save_node(tree, root, Point::default()),
    }
}

fn save_node(tree: &ItemTree, id: ItemId, origin: Point) -> NodeDesc {
    if let Some(orientation) = tree.orientation(id) {
        let child_origin = origin + tree.recorded_geometry(id).pos();
        NodeDesc::Container {
            orientation: orientation.into(),
            children: tree
                .children(id)
                .iter()
                .map(|&c| save_node(tree, c, child_origin))
                .collect(),
        }
    } else {
        let sizing = tree.sizing(id);
        NodeDesc::Leaf {
            guest_id: tree.guest_id(id).unwrap_or_default(),
            visible: tree.is_visible(id),
            geometry: sizing.geometry.translated(origin).into(),
            min_size: sizing.min_size.into(),
            percentage: sizing.percentage,
        }
    }
}

/// Serialize to the JSON wire format.
pub(crate) fn to_json(snapshot: &LayoutSnapshot) -> String {
    // The snapshot types contain no non-string map keys, so
    // serialization cannot fail.
    serde_json::to_string_pretty(snapshot).unwrap_or_default()
}

/// Parse a JSON document, checking the version before the structure so
/// newer documents fail with a version error rather than a parse error.
pub(crate) fn from_json(json: &str) -> Result<LayoutSnapshot, LayoutError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|err| LayoutError::MalformedSnapshot {
            reason: err.to_string(),
        })?;
    let version = value
        .get("serializationVersion")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| LayoutError::MalformedSnapshot {
            reason: "missing serializationVersion".to_owned(),
        })?;
    if version > u64::from(SERIALIZATION_VERSION) {
        return Err(LayoutError::SerializationVersionMismatch {
            version: version as u32,
            supported: SERIALIZATION_VERSION,
        });
    }
    serde_json::from_value(value).map_err(|err| LayoutError::MalformedSnapshot {
        reason: err.to_string(),
    })
}

// ── Reading ─────────────────────────────────────────────────────────

/// Rebuild a tree from a snapshot.
///
/// `host_size` is the size of the region the layout will live in. With
/// [`RestoreOptions::relative_to_host_size`] the saved coordinates are
/// rescaled to it; otherwise the tree is rebuilt at the saved size
/// (grown to its minimum if the document under-reports it) and the
/// caller resizes it into the host afterwards.
pub(crate) fn build_tree(
    snapshot: &LayoutSnapshot,
    host_size: Size,
    options: RestoreOptions,
) -> Result<ItemTree, LayoutError> {
    if snapshot.serialization_version > SERIALIZATION_VERSION {
        return Err(LayoutError::SerializationVersionMismatch {
            version: snapshot.serialization_version,
            supported: SERIALIZATION_VERSION,
        });
    }
    let NodeDesc::Container { orientation, children } = &snapshot.root else {
        return Err(LayoutError::MalformedSnapshot {
            reason: "root node must be a container".to_owned(),
        });
    };
    validate_node(&snapshot.root, true)?;

    let saved_size: Size = snapshot.root_size.into();
    if saved_size.is_empty() && !children.is_empty() {
        return Err(LayoutError::MalformedSnapshot {
            reason: "non-empty layout with an empty root size".to_owned(),
        });
    }

    let scale = if options.relative_to_host_size
        && !saved_size.is_empty()
        && saved_size != host_size
    {
        Some((
            f64::from(host_size.width) / f64::from(saved_size.width),
            f64::from(host_size.height) / f64::from(saved_size.height),
        ))
    } else {
        None
    };
    let target = if scale.is_some() { host_size } else { saved_size };

    let advisory_min: Size = snapshot.min_size.into();
    let computed_min = node_min(&snapshot.root);
    if !advisory_min.is_zero() && advisory_min != computed_min {
        debug!(
            ?advisory_min,
            ?computed_min,
            "snapshot minSize disagrees with the recomputed tree minimum"
        );
    }
    let target = target.expanded_to(computed_min);

    let mut tree = ItemTree::new(target);
    let root = tree.root();
    tree.set_container_orientation(root, (*orientation).into());
    for child in children {
        let id = populate(&mut tree, child, scale);
        tree.attach_child(root, id);
    }
    let _ = compute_container_extents(&mut tree, root);
    assign_geometry(
        &mut tree,
        root,
        Rect::from_size(target),
        Point::default(),
        scale.is_some(),
    );
    Ok(tree)
}

fn validate_node(desc: &NodeDesc, is_root: bool) -> Result<(), LayoutError> {
    match desc {
        NodeDesc::Container { children, .. } => {
            if children.is_empty() && !is_root {
                return Err(LayoutError::MalformedSnapshot {
                    reason: "nested container without children".to_owned(),
                });
            }
            for child in children {
                validate_node(child, false)?;
            }
            Ok(())
        }
        NodeDesc::Leaf {
            percentage,
            geometry,
            ..
        } => {
            if !percentage.is_finite() || *percentage < 0.0 || *percentage > 1.0 {
                return Err(LayoutError::MalformedSnapshot {
                    reason: format!("leaf percentage {percentage} out of range"),
                });
            }
            if geometry.w < 0 || geometry.h < 0 {
                return Err(LayoutError::MalformedSnapshot {
                    reason: "leaf geometry with negative extent".to_owned(),
                });
            }
            Ok(())
        }
    }
}

/// Composed minimum of a serialized subtree, counting only nodes with
/// visible descendants.
fn node_min(desc: &NodeDesc) -> Size {
    match desc {
        NodeDesc::Leaf {
            visible, min_size, ..
        } => {
            if *visible {
                clamped_min_size((*min_size).into())
            } else {
                Size::default()
            }
        }
        NodeDesc::Container {
            orientation,
            children,
        } => {
            let o: Orientation = (*orientation).into();
            let mins: Vec<Size> = children
                .iter()
                .map(node_min)
                .filter(|m| !m.is_zero())
                .collect();
            if mins.is_empty() {
                return Size::default();
            }
            let mut along = SEPARATOR_THICKNESS * (mins.len() as i32 - 1);
            let mut across = 0;
            for min in &mins {
                along += min.length(o);
                across = across.max(min.length(o.opposite()));
            }
            Size::default()
                .with_length(o, along)
                .with_length(o.opposite(), across)
        }
    }
}

/// First pass: create records carrying the saved root-relative geometry
/// (scaled when requested) in their sizing info.
fn populate(tree: &mut ItemTree, desc: &NodeDesc, scale: Option<(f64, f64)>) -> ItemId {
    match desc {
        NodeDesc::Leaf {
            guest_id,
            visible,
            geometry,
            min_size,
            percentage,
        } => {
            let id = tree.new_leaf((*min_size).into());
            if !guest_id.is_empty() {
                if let Some(leaf) = tree.leaf_mut(id) {
                    leaf.guest_id = Some(guest_id.clone());
                }
            }
            tree.set_visible_flag(id, *visible);
            tree.set_recorded_geometry(id, scaled_rect((*geometry).into(), scale));
            tree.set_percentage(id, if *visible { *percentage } else { 0.0 });
            id
        }
        NodeDesc::Container {
            orientation,
            children,
        } => {
            let id = tree.new_detached_container((*orientation).into());
            for child in children {
                let child_id = populate(tree, child, scale);
                tree.attach_child(id, child_id);
            }
            id
        }
    }
}

fn scaled_rect(rect: Rect, scale: Option<(f64, f64)>) -> Rect {
    let Some((fx, fy)) = scale else {
        return rect;
    };
    Rect::new(
        (f64::from(rect.x) * fx).round() as i32,
        (f64::from(rect.y) * fy).round() as i32,
        (f64::from(rect.width) * fx).round() as i32,
        (f64::from(rect.height) * fy).round() as i32,
    )
}

/// Second pass: give every container the root-relative bounding box of
/// its visible descendants, so child lengths can be read uniformly.
fn compute_container_extents(tree: &mut ItemTree, id: ItemId) -> Option<Rect> {
    if !tree.is_container(id) {
        return if tree.is_visible(id) {
            Some(tree.recorded_geometry(id))
        } else {
            None
        };
    }
    let children: Vec<ItemId> = tree.children(id).to_vec();
    let mut bbox: Option<Rect> = None;
    for child in children {
        if let Some(child_box) = compute_container_extents(tree, child) {
            bbox = Some(match bbox {
                Some(acc) => acc.union(&child_box),
                None => child_box,
            });
        }
    }
    let resolved = bbox.unwrap_or_default();
    tree.set_recorded_geometry(id, resolved);
    bbox
}

/// Third pass: walk top-down assigning parent-relative geometry.
///
/// Visible children share the usable length; the saved absolute lengths
/// drive the split (or the saved percentages, when rescaling), with the
/// rounding remainder going to the last child and minimums enforced.
fn assign_geometry(
    tree: &mut ItemTree,
    container: ItemId,
    rect: Rect,
    origin: Point,
    percentages_primary: bool,
) {
    tree.set_recorded_geometry(container, rect);
    let Some(o) = tree.orientation(container) else {
        return;
    };
    let children: Vec<ItemId> = tree.children(container).to_vec();
    let visible: Vec<ItemId> = children
        .iter()
        .copied()
        .filter(|&c| tree.is_visible(c))
        .collect();
    let child_origin = origin + rect.pos();

    // Hidden subtrees keep their saved proposal, mapped to parent
    // coordinates.
    for &child in &children {
        if !tree.is_visible(child) {
            let saved = tree.recorded_geometry(child);
            let local = saved.moved_to(saved.pos() - child_origin);
            if tree.is_container(child) {
                assign_hidden(tree, child, local, child_origin);
            } else {
                tree.set_recorded_geometry(child, local);
            }
        }
    }

    if visible.is_empty() {
        return;
    }

    let usable = rect.length(o) - SEPARATOR_THICKNESS * (visible.len() as i32 - 1);
    let mins: Vec<i32> = visible.iter().map(|&c| tree.min_length(c, o)).collect();
    let mut lengths: Vec<i32> = visible
        .iter()
        .map(|&c| {
            if percentages_primary && tree.is_leaf(c) {
                let pct = tree.sizing(c).percentage;
                (pct * f64::from(usable)).round() as i32
            } else {
                tree.recorded_geometry(c).length(o)
            }
        })
        .collect();
    reconcile_lengths(&mut lengths, &mins, usable);

    let across = rect.length(o.opposite());
    let mut next = 0;
    for (&child, &len) in visible.iter().zip(&lengths) {
        let child_rect = Rect::default()
            .with_pos_along(o, next)
            .with_length(o, len)
            .with_length(o.opposite(), across);
        if tree.is_container(child) {
            assign_geometry(tree, child, child_rect, child_origin, percentages_primary);
        } else {
            tree.set_recorded_geometry(child, child_rect);
        }
        next += len + SEPARATOR_THICKNESS;
    }
    tree.update_child_percentages(container);
}

/// Map a hidden container subtree into parent-relative coordinates
/// without laying it out.
fn assign_hidden(tree: &mut ItemTree, container: ItemId, rect: Rect, origin: Point) {
    tree.set_recorded_geometry(container, rect);
    let child_origin = origin + rect.pos();
    let children: Vec<ItemId> = tree.children(container).to_vec();
    for child in children {
        let saved = tree.recorded_geometry(child);
        let local = saved.moved_to(saved.pos() - child_origin);
        if tree.is_container(child) {
            assign_hidden(tree, child, local, child_origin);
        } else {
            tree.set_recorded_geometry(child, local);
        }
    }
}

/// Force `lengths` to sum to `usable` (remainder to the last entry),
/// then enforce minimums by taking the deficit from entries with slack.
fn reconcile_lengths(lengths: &mut [i32], mins: &[i32], usable: i32) {
    let n = lengths.len();
    if n == 0 {
        return;
    }
    let head: i32 = lengths[..n - 1].iter().sum();
    lengths[n - 1] = usable - head;

    let mut deficit = 0;
    for (len, &min) in lengths.iter_mut().zip(mins) {
        if *len < min {
            deficit += min - *len;
            *len = min;
        }
    }
    while deficit > 0 {
        let donors: Vec<usize> = (0..n).filter(|&i| lengths[i] > mins[i]).collect();
        if donors.is_empty() {
            break;
        }
        let per_donor = (deficit / donors.len() as i32).max(1);
        for &i in &donors {
            let take = per_donor.min(lengths[i] - mins[i]).min(deficit);
            lengths[i] -= take;
            deficit -= take;
            if deficit == 0 {
                break;
            }
        }
    }
}
