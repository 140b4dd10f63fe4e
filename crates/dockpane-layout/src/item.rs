//! The recursive split-tree model.
//!
//! A layout is a tree of items rooted at a container that always matches
//! the host region's size. Leaves host guests (or act as placeholders);
//! containers order their children along one orientation and own all
//! structural mutation: insertion, removal, interactive growth, and
//! proportional resize propagation.
//!
//! Nodes live in an id-keyed arena. Children reference each other only
//! through [`ItemId`], so reparenting (for example wrapping a child in a
//! fresh sub-container) is a couple of slot updates, never a deep copy.
//! Lookups never panic: queries answer neutrally for unknown ids or
//! mismatched node kinds (`None`, an empty slice, a zero default), and
//! fallible operations surface [`LayoutError::UnknownAnchor`].

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;

use dockpane_core::{Location, Orientation, Point, Rect, Side, Size};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LayoutError;
use crate::guest::GuestHandle;

/// Pixels between two visible siblings of a container.
pub const SEPARATOR_THICKNESS: i32 = 5;

/// Hardcoded floor for an item's minimum width.
pub const MIN_WIDTH: i32 = 80;

/// Hardcoded floor for an item's minimum height.
pub const MIN_HEIGHT: i32 = 90;

/// Effectively unbounded extent; the default maximum along both axes.
pub const MAX_LENGTH: i32 = 16_777_215;

/// The floor every leaf minimum is clamped to.
#[inline]
#[must_use]
pub const fn hardcoded_minimum_size() -> Size {
    Size::new(MIN_WIDTH, MIN_HEIGHT)
}

/// Clamp a guest-reported minimum to the hardcoded floor.
#[inline]
#[must_use]
pub fn clamped_min_size(min: Size) -> Size {
    min.expanded_to(hardcoded_minimum_size())
}

pub(crate) fn fuzzy_eq(left: f64, right: f64) -> bool {
    (left - right).abs() <= 1e-9 * left.abs().max(right.abs()).max(1.0)
}

/// Stable identifier for items in a layout tree.
///
/// `0` is reserved/invalid so ids are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    /// Lowest valid item id.
    pub const MIN: Self = Self(1);

    /// Create a new item id, rejecting 0.
    pub fn new(raw: u64) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-item sizing state.
///
/// The geometry is relative to the parent container. It is retained
/// while the item is hidden so a later restore can propose the pre-hide
/// length; observers never see it for hidden items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingInfo {
    pub geometry: Rect,
    pub min_size: Size,
    pub max_size: Size,
    /// Ratio of this item's length to the parent's usable length while
    /// visible; `0.0` while hidden.
    pub percentage: f64,
    pub being_inserted: bool,
}

impl SizingInfo {
    fn new(min_size: Size) -> Self {
        Self {
            geometry: Rect::from_size(min_size),
            min_size,
            max_size: Size::new(MAX_LENGTH, MAX_LENGTH),
            percentage: 0.0,
            being_inserted: false,
        }
    }

    /// Slack between the current and the minimum length along `o`.
    pub fn available_length(&self, o: Orientation) -> i32 {
        (self.geometry.length(o) - self.min_size.length(o)).max(0)
    }
}

impl Default for SizingInfo {
    fn default() -> Self {
        Self::new(Size::default())
    }
}

pub(crate) struct LeafData {
    pub guest: Option<GuestHandle>,
    /// Stable guest identifier, kept after detach so snapshots can
    /// rebind by name.
    pub guest_id: Option<String>,
    pub ref_count: u32,
}

impl fmt::Debug for LeafData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafData")
            .field("guest", &self.guest.is_some())
            .field("guest_id", &self.guest_id)
            .field("ref_count", &self.ref_count)
            .finish()
    }
}

#[derive(Debug)]
pub(crate) struct ContainerData {
    /// Meaningless while the container has at most one child; freely
    /// re-assigned on the first split.
    pub orientation: Orientation,
    pub children: Vec<ItemId>,
}

#[derive(Debug)]
pub(crate) enum Node {
    Leaf(LeafData),
    Container(ContainerData),
}

#[derive(Debug)]
pub(crate) struct ItemRecord {
    pub parent: Option<ItemId>,
    /// Leaf visibility flag; containers derive theirs from children.
    pub visible: bool,
    pub sizing: SizingInfo,
    pub node: Node,
}

/// Cumulative length/min pair over a run of visible siblings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LengthOnSide {
    pub length: i32,
    pub min_length: i32,
}

impl LengthOnSide {
    /// Slack the run can give up without violating minimums.
    #[must_use]
    pub fn available(&self) -> i32 {
        (self.length - self.min_length).max(0)
    }
}

/// The split-tree arena.
///
/// All mutation goes through container-level operations; leaves never
/// reach across siblings. Every public operation leaves invariants
/// intact ([`ItemTree::check_sanity`] audits them).
#[derive(Debug)]
pub struct ItemTree {
    root: ItemId,
    next_id: ItemId,
    nodes: BTreeMap<ItemId, ItemRecord>,
}

impl ItemTree {
    /// Build a tree with an empty root container of the given size.
    pub(crate) fn new(size: Size) -> Self {
        let root = ItemId::MIN;
        let mut nodes = BTreeMap::new();
        let sizing = SizingInfo {
            geometry: Rect::from_size(size),
            ..SizingInfo::default()
        };
        let _ = nodes.insert(
            root,
            ItemRecord {
                parent: None,
                visible: true,
                sizing,
                node: Node::Container(ContainerData {
                    orientation: Orientation::Horizontal,
                    children: Vec::new(),
                }),
            },
        );
        Self {
            root,
            next_id: root.next(),
            nodes,
        }
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// The root container.
    #[must_use]
    pub fn root(&self) -> ItemId {
        self.root
    }

    /// Whether `id` resolves to an item in this tree.
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.nodes.contains_key(&id)
    }

    fn record(&self, id: ItemId) -> Option<&ItemRecord> {
        self.nodes.get(&id)
    }

    fn record_mut(&mut self, id: ItemId) -> Option<&mut ItemRecord> {
        self.nodes.get_mut(&id)
    }

    pub(crate) fn leaf(&self, id: ItemId) -> Option<&LeafData> {
        match &self.record(id)?.node {
            Node::Leaf(data) => Some(data),
            Node::Container(_) => None,
        }
    }

    pub(crate) fn leaf_mut(&mut self, id: ItemId) -> Option<&mut LeafData> {
        match &mut self.record_mut(id)?.node {
            Node::Leaf(data) => Some(data),
            Node::Container(_) => None,
        }
    }

    fn container_mut(&mut self, id: ItemId) -> Option<&mut ContainerData> {
        match &mut self.record_mut(id)?.node {
            Node::Container(data) => Some(data),
            Node::Leaf(_) => None,
        }
    }

    /// True for container items; false for leaves and unknown ids.
    #[must_use]
    pub fn is_container(&self, id: ItemId) -> bool {
        matches!(
            self.record(id),
            Some(ItemRecord {
                node: Node::Container(_),
                ..
            })
        )
    }

    /// True for leaf items; false for containers and unknown ids.
    #[must_use]
    pub fn is_leaf(&self, id: ItemId) -> bool {
        matches!(
            self.record(id),
            Some(ItemRecord {
                node: Node::Leaf(_),
                ..
            })
        )
    }

    /// Parent container; `None` for the root and unknown ids.
    #[must_use]
    pub fn parent(&self, id: ItemId) -> Option<ItemId> {
        self.record(id)?.parent
    }

    /// A container's orientation; `None` for leaves and unknown ids.
    #[must_use]
    pub fn orientation(&self, id: ItemId) -> Option<Orientation> {
        match &self.record(id)?.node {
            Node::Container(data) => Some(data.orientation),
            Node::Leaf(_) => None,
        }
    }

    /// A container's ordered child list, placeholders included. Leaves
    /// and unknown ids have no children.
    #[must_use]
    pub fn children(&self, id: ItemId) -> &[ItemId] {
        match self.record(id) {
            Some(ItemRecord {
                node: Node::Container(data),
                ..
            }) => &data.children,
            _ => &[],
        }
    }

    /// Whether the item occupies pixels: leaves by flag, containers
    /// when any child does. Unknown ids are not visible.
    #[must_use]
    pub fn is_visible(&self, id: ItemId) -> bool {
        match self.record(id) {
            Some(ItemRecord {
                node: Node::Leaf(_),
                visible,
                ..
            }) => *visible,
            Some(ItemRecord {
                node: Node::Container(data),
                ..
            }) => data.children.iter().any(|&c| self.is_visible(c)),
            None => false,
        }
    }

    /// Visible children in order.
    #[must_use]
    pub fn visible_children(&self, id: ItemId) -> Vec<ItemId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_visible(c))
            .collect()
    }

    /// Number of visible children.
    #[must_use]
    pub fn num_visible_children(&self, id: ItemId) -> usize {
        self.children(id)
            .iter()
            .filter(|&&c| self.is_visible(c))
            .count()
    }

    /// Number of leaves in the subtree, placeholders included.
    #[must_use]
    pub fn count_recursive(&self, id: ItemId) -> usize {
        match self.record(id) {
            Some(ItemRecord {
                node: Node::Leaf(_),
                ..
            }) => 1,
            Some(ItemRecord {
                node: Node::Container(data),
                ..
            }) => data
                .children
                .iter()
                .map(|&c| self.count_recursive(c))
                .sum(),
            None => 0,
        }
    }

    /// Number of visible leaves in the subtree.
    #[must_use]
    pub fn visible_count_recursive(&self, id: ItemId) -> usize {
        match self.record(id) {
            Some(ItemRecord {
                node: Node::Leaf(_),
                visible,
                ..
            }) => usize::from(*visible),
            Some(ItemRecord {
                node: Node::Container(data),
                ..
            }) => data
                .children
                .iter()
                .map(|&c| self.visible_count_recursive(c))
                .sum(),
            None => 0,
        }
    }

    /// Parent-relative geometry; empty while hidden or mid-insertion.
    /// The root always reports its geometry, children or not.
    #[must_use]
    pub fn geometry(&self, id: ItemId) -> Rect {
        let Some(rec) = self.record(id) else {
            return Rect::default();
        };
        if id != self.root && (rec.sizing.being_inserted || !self.is_visible(id)) {
            Rect::default()
        } else {
            rec.sizing.geometry
        }
    }

    pub(crate) fn recorded_geometry(&self, id: ItemId) -> Rect {
        self.record(id)
            .map(|rec| rec.sizing.geometry)
            .unwrap_or_default()
    }

    pub(crate) fn sizing(&self, id: ItemId) -> SizingInfo {
        self.record(id)
            .map(|rec| rec.sizing)
            .unwrap_or_default()
    }

    /// Current size (zero while hidden).
    #[must_use]
    pub fn size(&self, id: ItemId) -> Size {
        self.geometry(id).size()
    }

    /// Extent along `o` (zero while hidden).
    #[must_use]
    pub fn length(&self, id: ItemId, o: Orientation) -> i32 {
        self.geometry(id).length(o)
    }

    /// Minimum size: stored for leaves, composed over visible children
    /// for containers (sums along the orientation plus separator waste,
    /// maximum orthogonally).
    #[must_use]
    pub fn min_size(&self, id: ItemId) -> Size {
        match self.record(id) {
            Some(ItemRecord {
                node: Node::Leaf(_),
                sizing,
                ..
            }) => sizing.min_size,
            Some(ItemRecord {
                node: Node::Container(data),
                ..
            }) => {
                let o = data.orientation;
                let visible = self.visible_children(id);
                if visible.is_empty() {
                    return Size::default();
                }
                let mut along = 0;
                let mut across = 0;
                for &child in &visible {
                    let min = self.min_size(child);
                    along += min.length(o);
                    across = across.max(min.length(o.opposite()));
                }
                along += SEPARATOR_THICKNESS * (visible.len() as i32 - 1);
                Size::default()
                    .with_length(o, along)
                    .with_length(o.opposite(), across)
            }
            None => Size::default(),
        }
    }

    /// Maximum size: stored for leaves, composed for containers
    /// (saturating at [`MAX_LENGTH`]).
    #[must_use]
    pub fn max_size(&self, id: ItemId) -> Size {
        match self.record(id) {
            Some(ItemRecord {
                node: Node::Leaf(_),
                sizing,
                ..
            }) => sizing.max_size,
            Some(ItemRecord {
                node: Node::Container(data),
                ..
            }) => {
                let o = data.orientation;
                let visible = self.visible_children(id);
                if visible.is_empty() {
                    return Size::new(MAX_LENGTH, MAX_LENGTH);
                }
                let mut along: i64 = 0;
                let mut across: i64 = MAX_LENGTH as i64;
                for &child in &visible {
                    let max = self.max_size(child);
                    along += max.length(o) as i64;
                    across = across.min(max.length(o.opposite()) as i64);
                }
                along += (SEPARATOR_THICKNESS * (visible.len() as i32 - 1)) as i64;
                let along = along.min(MAX_LENGTH as i64) as i32;
                Size::default()
                    .with_length(o, along)
                    .with_length(o.opposite(), across as i32)
            }
            None => Size::new(MAX_LENGTH, MAX_LENGTH),
        }
    }

    /// Minimum extent along `o`.
    #[must_use]
    pub fn min_length(&self, id: ItemId, o: Orientation) -> i32 {
        self.min_size(id).length(o)
    }

    /// Slack beyond the minimum, componentwise.
    #[must_use]
    pub fn available_size(&self, id: ItemId) -> Size {
        let size = self.size(id);
        let min = self.min_size(id);
        Size::new(
            (size.width - min.width).max(0),
            (size.height - min.height).max(0),
        )
    }

    /// Slack along the container's orientation; zero for leaves.
    #[must_use]
    pub fn available_length(&self, id: ItemId) -> i32 {
        let Some(o) = self.orientation(id) else {
            return 0;
        };
        self.available_size(id).length(o)
    }

    /// Container length minus the separators between visible children;
    /// zero for leaves.
    #[must_use]
    pub fn usable_length(&self, id: ItemId) -> i32 {
        let Some(o) = self.orientation(id) else {
            return 0;
        };
        let visible = self.num_visible_children(id) as i32;
        let length = self.recorded_geometry(id).length(o);
        if visible <= 1 {
            length
        } else {
            length - SEPARATOR_THICKNESS * (visible - 1)
        }
    }

    /// Offset of this item's coordinate system from the root's
    /// (the sum of ancestor positions plus its own).
    #[must_use]
    pub fn root_offset(&self, id: ItemId) -> Point {
        let mut offset = Point::default();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(rec) = self.record(current) else {
                break;
            };
            offset = offset + rec.sizing.geometry.pos();
            cursor = rec.parent;
        }
        offset
    }

    /// This item's geometry lifted into root coordinates.
    #[must_use]
    pub fn geometry_in_root(&self, id: ItemId) -> Rect {
        let geometry = self.geometry(id);
        let parent_offset = match self.parent(id) {
            Some(parent) => self.root_offset(parent),
            None => Point::default(),
        };
        geometry.translated(parent_offset)
    }

    /// The visible leaf under a root-relative point.
    #[must_use]
    pub fn item_at(&self, point: Point) -> Option<ItemId> {
        let mut container = self.root;
        let mut local = point - self.recorded_geometry(self.root).pos();
        'descend: loop {
            for &child in self.children(container) {
                if !self.is_visible(child) {
                    continue;
                }
                let geometry = self.recorded_geometry(child);
                if geometry.contains(local) {
                    if self.is_leaf(child) {
                        return Some(child);
                    }
                    local = local - geometry.pos();
                    container = child;
                    continue 'descend;
                }
            }
            return None;
        }
    }

    /// Index of `child` in `container`'s full child list.
    #[must_use]
    pub fn index_of_child(&self, container: ItemId, child: ItemId) -> Option<usize> {
        self.children(container).iter().position(|&c| c == child)
    }

    /// Nearest visible sibling of `item` on `side`, skipping
    /// placeholders. Works whether or not `item` itself is visible.
    #[must_use]
    pub fn visible_neighbour(&self, item: ItemId, side: Side) -> Option<ItemId> {
        let parent = self.parent(item)?;
        let children = self.children(parent);
        let index = children.iter().position(|&c| c == item)?;
        match side {
            Side::One => children[..index]
                .iter()
                .rev()
                .copied()
                .find(|&c| self.is_visible(c)),
            Side::Two => children[index + 1..]
                .iter()
                .copied()
                .find(|&c| self.is_visible(c)),
        }
    }

    /// Cumulative length/min of the visible run on `side` of the child
    /// at `pivot` (inclusive bounds follow the side).
    #[must_use]
    pub fn length_on_side(&self, container: ItemId, pivot: usize, side: Side) -> LengthOnSide {
        let Some(o) = self.orientation(container) else {
            return LengthOnSide::default();
        };
        let visible = self.visible_children(container);
        let range: &[ItemId] = match side {
            Side::One => {
                if pivot >= visible.len() {
                    &visible
                } else {
                    &visible[..=pivot]
                }
            }
            Side::Two => {
                if pivot >= visible.len() {
                    &[]
                } else {
                    &visible[pivot..]
                }
            }
        };
        let mut result = LengthOnSide::default();
        for &child in range {
            result.length += self.length(child, o);
            result.min_length += self.min_length(child, o);
        }
        result
    }

    /// Total slack of `item`'s visible neighbours on `side`.
    #[must_use]
    pub fn available_on_side(&self, item: ItemId, side: Side) -> i32 {
        let Some(parent) = self.parent(item) else {
            return 0;
        };
        let visible = self.visible_children(parent);
        let Some(index) = visible.iter().position(|&c| c == item) else {
            return 0;
        };
        match side {
            Side::One => {
                if index == 0 {
                    0
                } else {
                    self.length_on_side(parent, index - 1, Side::One).available()
                }
            }
            Side::Two => self.length_on_side(parent, index + 1, Side::Two).available(),
        }
    }

    /// Cumulative visible-neighbour length on `side` along `o`, walking
    /// up through ancestor containers.
    #[must_use]
    pub fn neighbours_length_recursive(&self, item: ItemId, side: Side, o: Orientation) -> i32 {
        let mut total = 0;
        let mut current = item;
        while let Some(parent) = self.parent(current) {
            if self.orientation(parent) == Some(o) {
                let visible = self.visible_children(parent);
                if let Some(index) = visible.iter().position(|&c| c == current) {
                    let run = match side {
                        Side::One => &visible[..index],
                        Side::Two => &visible[index + 1..],
                    };
                    for &sibling in run {
                        total += self.length(sibling, o);
                    }
                }
            }
            current = parent;
        }
        total
    }

    /// How much the root must grow to host an item of `min` inserted
    /// along `o`, counting one separator when the root already shows
    /// children.
    #[must_use]
    pub fn missing_size_for(&self, o: Orientation, min: Size) -> Size {
        let available = self.available_size(self.root);
        let waste = if self.num_visible_children(self.root) > 0 {
            Size::default().with_length(o, SEPARATOR_THICKNESS)
        } else {
            Size::default()
        };
        Size::new(
            (min.width - available.width + waste.width).max(0),
            (min.height - available.height + waste.height).max(0),
        )
    }

    /// Stable guest id recorded on a leaf, if any.
    #[must_use]
    pub fn guest_id(&self, id: ItemId) -> Option<String> {
        self.leaf(id)?.guest_id.clone()
    }

    /// Find the leaf bound to a guest stable id.
    #[must_use]
    pub fn item_for_guest(&self, stable_id: &str) -> Option<ItemId> {
        self.nodes.iter().find_map(|(&id, rec)| match &rec.node {
            Node::Leaf(leaf) if leaf.guest_id.as_deref() == Some(stable_id) => Some(id),
            _ => None,
        })
    }

    /// Every item id in the arena.
    #[must_use]
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.nodes.keys().copied().collect()
    }

    /// External reference count of a leaf; zero for containers and
    /// unknown ids.
    #[must_use]
    pub fn ref_count(&self, id: ItemId) -> u32 {
        self.leaf(id).map_or(0, |leaf| leaf.ref_count)
    }

    /// Drop a leaf that was allocated but never inserted.
    pub(crate) fn discard_detached(&mut self, id: ItemId) {
        if self.parent(id).is_none() && id != self.root {
            let _ = self.nodes.remove(&id);
        }
    }

    /// All leaf ids in depth-first order.
    #[must_use]
    pub fn leaves(&self) -> Vec<ItemId> {
        let mut result = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            match self.record(id) {
                Some(ItemRecord {
                    node: Node::Leaf(_),
                    ..
                }) => result.push(id),
                Some(ItemRecord {
                    node: Node::Container(data),
                    ..
                }) => stack.extend(data.children.iter().rev().copied()),
                None => {}
            }
        }
        result
    }

    // ── Mutation ────────────────────────────────────────────────────

    /// Allocate a detached, hidden leaf.
    pub(crate) fn new_leaf(&mut self, min_size: Size) -> ItemId {
        let id = self.next_id;
        self.next_id = self.next_id.next();
        let _ = self.nodes.insert(
            id,
            ItemRecord {
                parent: None,
                visible: false,
                sizing: SizingInfo::new(clamped_min_size(min_size)),
                node: Node::Leaf(LeafData {
                    guest: None,
                    guest_id: None,
                    ref_count: 0,
                }),
            },
        );
        id
    }

    fn new_container(&mut self, orientation: Orientation) -> ItemId {
        let id = self.next_id;
        self.next_id = self.next_id.next();
        let _ = self.nodes.insert(
            id,
            ItemRecord {
                parent: None,
                visible: true,
                sizing: SizingInfo::default(),
                node: Node::Container(ContainerData {
                    orientation,
                    children: Vec::new(),
                }),
            },
        );
        id
    }

    /// Allocate a detached container (snapshot rebuilds).
    pub(crate) fn new_detached_container(&mut self, orientation: Orientation) -> ItemId {
        self.new_container(orientation)
    }

    /// Append `child` to `container` without growing or re-layouting;
    /// the caller assigns geometry afterwards (snapshot rebuilds).
    pub(crate) fn attach_child(&mut self, container: ItemId, child: ItemId) {
        let Some(data) = self.container_mut(container) else {
            return;
        };
        data.children.push(child);
        if let Some(rec) = self.record_mut(child) {
            rec.parent = Some(container);
        }
    }

    pub(crate) fn set_visible_flag(&mut self, id: ItemId, visible: bool) {
        if let Some(rec) = self.record_mut(id) {
            rec.visible = visible;
        }
    }

    pub(crate) fn set_recorded_geometry(&mut self, id: ItemId, geometry: Rect) {
        if let Some(rec) = self.record_mut(id) {
            rec.sizing.geometry = geometry;
        }
    }

    pub(crate) fn set_container_orientation(&mut self, id: ItemId, orientation: Orientation) {
        if let Some(data) = self.container_mut(id) {
            data.orientation = orientation;
        }
    }

    pub(crate) fn set_percentage(&mut self, id: ItemId, percentage: f64) {
        if let Some(rec) = self.record_mut(id) {
            rec.sizing.percentage = percentage;
        }
    }

    /// Record a new minimum; any growth needed to honour it is the
    /// caller's next move (min-size-change propagation).
    pub(crate) fn set_item_min_size(&mut self, id: ItemId, min: Size) {
        let min = clamped_min_size(min);
        let Some(rec) = self.record_mut(id) else {
            return;
        };
        rec.sizing.min_size = min;
        if rec.parent.is_none() || !rec.visible {
            // Detached or hidden items just update their recorded
            // proposal; nothing is laid out yet.
            let size = rec.sizing.geometry.size().expanded_to(min);
            rec.sizing.geometry = rec.sizing.geometry.with_size(size);
        }
    }

    /// Insert `child` into `container`'s list at `index`; when `grow`
    /// is set, space is reclaimed from neighbours right away.
    ///
    /// Returns false when the neighbours could not donate enough space
    /// and the caller must re-tile (see [`ItemTree::relayout`]).
    pub(crate) fn insert_item(
        &mut self,
        container: ItemId,
        index: usize,
        child: ItemId,
        grow: bool,
    ) -> bool {
        let Some(data) = self.container_mut(container) else {
            return true;
        };
        data.children.insert(index, child);
        if let Some(rec) = self.record_mut(child) {
            rec.parent = Some(container);
        }
        let fit = if grow {
            self.restore_placeholder(child)
        } else {
            true
        };
        self.update_child_percentages(container);
        fit
    }

    /// Insert `child` at `location` relative to `target`.
    ///
    /// `target` may be the containing container itself (edge insertion)
    /// or any item in the tree (anchored insertion). Mismatched
    /// orientations split the anchor into a fresh sub-container.
    ///
    /// `Ok(true)` means the child was placed cleanly; `Ok(false)` means
    /// the target container could not free enough space and the caller
    /// must [`ItemTree::relayout`].
    pub(crate) fn insert_at_location(
        &mut self,
        target: ItemId,
        location: Location,
        child: ItemId,
    ) -> Result<bool, LayoutError> {
        let Some(o) = location.orientation() else {
            return Err(LayoutError::InvalidLocation { location });
        };
        let side = location.side().ok_or(LayoutError::InvalidLocation { location })?;
        if !self.contains(target) {
            return Err(LayoutError::UnknownAnchor { item: target });
        }
        if child == self.root || self.parent(child).is_some() {
            return Err(LayoutError::DuplicateInsertion { item: child });
        }

        let fit = if self.is_container(target) {
            let child_count = self.children(target).len();
            if child_count <= 1 {
                self.set_container_orientation(target, o);
            }
            if self.orientation(target) != Some(o) {
                // Orthogonal edge insertion: the container becomes
                // two-level by wrapping its children in a sub-container
                // of the old orientation.
                self.wrap_children(target);
                self.set_container_orientation(target, o);
            }
            let index = match side {
                Side::One => 0,
                Side::Two => self.children(target).len(),
            };
            self.insert_item(target, index, child, true)
        } else {
            let parent = self
                .parent(target)
                .ok_or(LayoutError::UnknownAnchor { item: target })?;
            if self.children(parent).len() <= 1 {
                self.set_container_orientation(parent, o);
            }
            if self.orientation(parent) == Some(o) {
                let mut index = self
                    .index_of_child(parent, target)
                    .ok_or(LayoutError::UnknownAnchor { item: target })?;
                if side == Side::Two {
                    index += 1;
                }
                self.insert_item(parent, index, child, true)
            } else {
                let sub = self
                    .convert_child_to_container(target, o)
                    .ok_or(LayoutError::UnknownAnchor { item: target })?;
                return self.insert_at_location(sub, location, child);
            }
        };

        if fit {
            debug_assert!(self.check_sanity());
        }
        Ok(fit)
    }

    /// Move `container`'s children into a fresh sub-container carrying
    /// the old orientation; the container keeps its geometry and ends up
    /// with that sub-container as its only child.
    fn wrap_children(&mut self, container: ItemId) {
        let Some(old_orientation) = self.orientation(container) else {
            return;
        };
        let size = self.recorded_geometry(container).size();
        let sub = self.new_container(old_orientation);
        let children = match self.container_mut(container) {
            Some(data) => std::mem::take(&mut data.children),
            None => return,
        };
        for &c in &children {
            if let Some(rec) = self.record_mut(c) {
                rec.parent = Some(sub);
            }
        }
        if let Some(data) = self.container_mut(sub) {
            data.children = children;
        }
        if let Some(rec) = self.record_mut(sub) {
            rec.sizing.geometry = Rect::from_size(size);
            rec.parent = Some(container);
        }
        if let Some(data) = self.container_mut(container) {
            data.children.push(sub);
        }
        self.update_child_percentages(sub);
        self.update_child_percentages(container);
    }

    /// Replace `leaf` with a fresh sub-container of `orientation` at the
    /// same index and geometry, then re-insert `leaf` as its sole child.
    ///
    /// `None` when `leaf` has no parent slot to take over (the root, or
    /// an id that is not in the tree).
    pub(crate) fn convert_child_to_container(
        &mut self,
        leaf: ItemId,
        orientation: Orientation,
    ) -> Option<ItemId> {
        let parent = self.parent(leaf)?;
        let index = self.index_of_child(parent, leaf)?;
        let geometry = self.recorded_geometry(leaf);
        let percentage = self.sizing(leaf).percentage;

        let sub = self.new_container(orientation);
        if let Some(data) = self.container_mut(parent) {
            data.children[index] = sub;
        }
        if let Some(rec) = self.record_mut(sub) {
            rec.parent = Some(parent);
            rec.sizing.geometry = geometry;
            rec.sizing.percentage = percentage;
        }

        if let Some(rec) = self.record_mut(leaf) {
            rec.parent = Some(sub);
            rec.sizing.geometry = Rect::from_size(geometry.size());
        }
        if let Some(data) = self.container_mut(sub) {
            data.children.push(leaf);
        }
        self.update_child_percentages(sub);
        Some(sub)
    }

    /// Remove `item` from its parent.
    ///
    /// Soft removal of a visible leaf turns it into a placeholder; soft
    /// removal of a leaf that already is one destroys it (the final
    /// unreference). Containers emptied of visible children cascade the
    /// removal upward, the root excepted. Freed space is absorbed by the
    /// nearest visible neighbours.
    ///
    /// Returns the guests of every leaf destroyed by the call so the
    /// caller can detach them. Removing the root or an unknown id is a
    /// no-op.
    pub(crate) fn remove_item(
        &mut self,
        item: ItemId,
        hard: bool,
    ) -> Vec<(ItemId, Option<GuestHandle>)> {
        let mut detached = Vec::new();
        self.remove_item_inner(item, hard, &mut detached);
        detached
    }

    fn remove_item_inner(
        &mut self,
        item: ItemId,
        hard: bool,
        detached: &mut Vec<(ItemId, Option<GuestHandle>)>,
    ) {
        let Some(parent) = self.parent(item) else {
            return;
        };
        let side1 = self.visible_neighbour(item, Side::One);
        let side2 = self.visible_neighbour(item, Side::Two);

        // Placeholders on their final release and containers emptied by
        // a cascade are destroyed even on soft removal.
        let destroy = hard
            || (self.is_leaf(item) && !self.is_visible(item))
            || (self.is_container(item) && self.children(item).is_empty());
        if destroy {
            let Some(index) = self.index_of_child(parent, item) else {
                return;
            };
            if let Some(data) = self.container_mut(parent) {
                let _ = data.children.remove(index);
            }
            self.destroy_subtree(item, detached);
        } else if self.is_leaf(item) {
            if let Some(rec) = self.record_mut(item) {
                rec.visible = false;
                rec.sizing.percentage = 0.0;
            }
            let guest = self.leaf_mut(item).and_then(|leaf| leaf.guest.take());
            detached.push((item, guest));
        }
        // Soft removal of a container changes nothing on the container
        // itself; its hidden state is derived from the children.

        let parent_emptied = if hard {
            self.children(parent).is_empty()
        } else {
            self.num_visible_children(parent) == 0
        };

        if parent_emptied && parent != self.root {
            self.remove_item_inner(parent, hard, detached);
        } else {
            self.grow_neighbours(parent, side1, side2);
            self.update_child_percentages(parent);
        }
    }

    fn destroy_subtree(&mut self, id: ItemId, detached: &mut Vec<(ItemId, Option<GuestHandle>)>) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(record) = self.nodes.remove(&current) else {
                continue;
            };
            match record.node {
                Node::Leaf(leaf) => detached.push((current, leaf.guest)),
                Node::Container(data) => stack.extend(data.children),
            }
        }
    }

    /// Split the space freed between two former neighbours: half each
    /// when both exist (leftover to side two), everything to the sole
    /// survivor otherwise.
    pub(crate) fn grow_neighbours(
        &mut self,
        container: ItemId,
        side1: Option<ItemId>,
        side2: Option<ItemId>,
    ) {
        let Some(o) = self.orientation(container) else {
            return;
        };
        let container_length = self.recorded_geometry(container).length(o);
        match (side1, side2) {
            (None, None) => {}
            (Some(one), Some(two)) => {
                let one_geo = self.recorded_geometry(one);
                let two_geo = self.recorded_geometry(two);
                let gap = two_geo.pos_along(o) - one_geo.end_along(o) - SEPARATOR_THICKNESS;
                if gap <= 0 {
                    return;
                }
                let one_share = gap / 2;
                self.set_length_recursive(one, o, one_geo.length(o) + one_share);
                self.set_length_recursive(two, o, two_geo.length(o) + (gap - one_share));
            }
            (Some(one), None) => {
                let geo = self.recorded_geometry(one);
                let grown = container_length - geo.pos_along(o);
                if grown > geo.length(o) {
                    self.set_length_recursive(one, o, grown);
                }
            }
            (None, Some(two)) => {
                let geo = self.recorded_geometry(two);
                let grown = geo.end_along(o);
                if grown > geo.length(o) {
                    self.set_length_recursive(two, o, grown);
                }
            }
        }
        self.position_items(container);
    }

    /// Set an item's extent along `o`, redistributing inside
    /// sub-containers.
    pub(crate) fn set_length_recursive(&mut self, id: ItemId, o: Orientation, length: i32) {
        if self.is_container(id) {
            let size = self.recorded_geometry(id).size().with_length(o, length);
            if let Err(err) = self.set_size_recursive(id, size) {
                warn!(item = %id, %err, "refused recursive length change");
            }
        } else if let Some(rec) = self.record_mut(id) {
            rec.sizing.geometry = rec.sizing.geometry.with_length(o, length);
        }
    }

    /// Resize a subtree.
    ///
    /// Along the orientation each visible child receives its recorded
    /// percentage of the usable length (remainder to the last child, and
    /// minimums enforced by pulling the deficit from siblings with
    /// slack); orthogonally every child matches the container. Refuses
    /// sizes below the composed minimum and leaves the tree untouched.
    pub(crate) fn set_size_recursive(
        &mut self,
        id: ItemId,
        new_size: Size,
    ) -> Result<(), LayoutError> {
        if !self.contains(id) {
            return Err(LayoutError::UnknownAnchor { item: id });
        }
        if self.is_leaf(id) {
            if let Some(rec) = self.record_mut(id) {
                rec.sizing.geometry = rec.sizing.geometry.with_size(new_size);
            }
            return Ok(());
        }

        let min = self.min_size(id);
        if new_size.width < min.width || new_size.height < min.height {
            return Err(LayoutError::ConstraintViolation {
                item: id,
                min,
                requested: new_size,
            });
        }

        let Some(o) = self.orientation(id) else {
            return Err(LayoutError::UnknownAnchor { item: id });
        };
        let old_size = self.recorded_geometry(id).size();
        if old_size == new_size {
            return Ok(());
        }
        let length_changed = old_size.length(o) != new_size.length(o);

        if let Some(rec) = self.record_mut(id) {
            rec.sizing.geometry = rec.sizing.geometry.with_size(new_size);
        }

        let visible = self.visible_children(id);
        if visible.is_empty() {
            return Ok(());
        }

        let usable = self.usable_length(id);
        let lengths = if length_changed {
            let percentages: Vec<f64> = visible
                .iter()
                .map(|&c| self.sizing(c).percentage)
                .collect();
            let mins: Vec<i32> = visible.iter().map(|&c| self.min_length(c, o)).collect();
            distribute_lengths(&percentages, &mins, usable)
        } else {
            visible
                .iter()
                .map(|&c| self.recorded_geometry(c).length(o))
                .collect()
        };

        let across = new_size.length(o.opposite());
        let mut next = 0;
        for (&child, &len) in visible.iter().zip(&lengths) {
            let child_size = Size::default()
                .with_length(o, len)
                .with_length(o.opposite(), across);
            let geometry = Rect::from_size(child_size).with_pos_along(o, next);
            if self.is_container(child) {
                if let Some(rec) = self.record_mut(child) {
                    rec.sizing.geometry = rec.sizing.geometry.moved_to(geometry.pos());
                }
                self.set_size_recursive(child, child_size)?;
            } else if let Some(rec) = self.record_mut(child) {
                rec.sizing.geometry = geometry;
            }
            next += len + SEPARATOR_THICKNESS;
        }
        self.update_child_percentages(id);
        Ok(())
    }

    /// Deterministic positioning pass: visible children packed along the
    /// orientation with separator spacing, stretched orthogonally.
    pub(crate) fn position_items(&mut self, container: ItemId) {
        let Some(o) = self.orientation(container) else {
            return;
        };
        let across = self.recorded_geometry(container).length(o.opposite());
        let visible = self.visible_children(container);
        let mut next = 0;
        for &child in &visible {
            self.set_length_recursive(child, o.opposite(), across);
            let Some(rec) = self.record_mut(child) else {
                continue;
            };
            rec.sizing.geometry = rec
                .sizing
                .geometry
                .with_pos_along(o, next)
                .with_pos_along(o.opposite(), 0);
            next += rec.sizing.geometry.length(o) + SEPARATOR_THICKNESS;
        }
        self.update_child_percentages(container);
    }

    /// Refresh recorded percentages from current lengths.
    pub(crate) fn update_child_percentages(&mut self, container: ItemId) {
        let Some(o) = self.orientation(container) else {
            return;
        };
        let usable = self.usable_length(container);
        let children: Vec<ItemId> = self.children(container).to_vec();
        for child in children {
            let visible = self.is_visible(child);
            let length = self.recorded_geometry(child).length(o);
            let Some(rec) = self.record_mut(child) else {
                continue;
            };
            rec.sizing.percentage = if visible && usable > 0 {
                f64::from(length) / f64::from(usable)
            } else {
                0.0
            };
        }
    }

    /// Make a placeholder visible again and grow it back into its slot.
    ///
    /// The wanted length is the recorded pre-hide length clamped to the
    /// minimum plus whatever the container can spare; neighbours donate
    /// it (plus the reappearing separator) through the squeeze pass.
    ///
    /// Returns false when the neighbours cannot cover even the minimum
    /// (the container itself is too small); the item is then marked
    /// visible at its minimum and the caller must re-tile.
    pub(crate) fn restore_placeholder(&mut self, item: ItemId) -> bool {
        if !self.is_leaf(item) {
            return false;
        }
        let Some(parent) = self.parent(item) else {
            return false;
        };
        let Some(o) = self.orientation(parent) else {
            return false;
        };

        self.set_visible_flag(item, true);

        if self.num_visible_children(parent) == 1 {
            let size = self.recorded_geometry(parent).size();
            self.set_recorded_geometry(item, Rect::from_size(size));
            self.update_child_percentages(parent);
            return true;
        }

        if let Some(rec) = self.record_mut(item) {
            rec.sizing.being_inserted = true;
        }
        let available = self.available_length(parent);
        let min_len = self.min_length(item, o);
        let recorded = self.recorded_geometry(item).length(o);
        let wanted = recorded.clamp(min_len, min_len + available);

        let zeroed = self.recorded_geometry(item).with_length(o, 0);
        self.set_recorded_geometry(item, zeroed);
        let fit = match self.grow_item_by(item, wanted, SEPARATOR_THICKNESS) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    item = %item,
                    %err,
                    "placeholder restore could not reclaim space; re-tile needed"
                );
                let at_min = self.recorded_geometry(item).with_length(o, min_len);
                self.set_recorded_geometry(item, at_min);
                false
            }
        };
        if let Some(rec) = self.record_mut(item) {
            rec.sizing.being_inserted = false;
        }
        self.position_items(parent);
        fit
    }

    /// Re-tile a subtree at its current size: every container shares
    /// its usable length among visible children by their recorded
    /// percentages, minimums enforced. The universal repair after an
    /// insertion or restore that did not fit its container.
    pub(crate) fn relayout(&mut self, id: ItemId) {
        let Some(o) = self.orientation(id) else {
            return;
        };
        let visible = self.visible_children(id);
        if visible.is_empty() {
            return;
        }
        let usable = self.usable_length(id);
        let mut percentages: Vec<f64> = visible
            .iter()
            .map(|&c| self.sizing(c).percentage)
            .collect();
        let sum: f64 = percentages.iter().sum();
        if sum <= f64::EPSILON {
            percentages.fill(1.0 / visible.len() as f64);
        }
        let mins: Vec<i32> = visible.iter().map(|&c| self.min_length(c, o)).collect();
        let lengths = distribute_lengths(&percentages, &mins, usable);

        let across = self.recorded_geometry(id).length(o.opposite());
        let mut next = 0;
        for (&child, &len) in visible.iter().zip(&lengths) {
            let child_size = Size::default()
                .with_length(o, len)
                .with_length(o.opposite(), across);
            let geometry = Rect::from_size(child_size).with_pos_along(o, next);
            self.set_recorded_geometry(child, geometry);
            self.relayout(child);
            next += len + SEPARATOR_THICKNESS;
        }
        self.update_child_percentages(id);
    }

    /// Grow (or shrink, for negative `amount`) an item along its
    /// parent's orientation, both sides contributing equally.
    pub(crate) fn grow_item(&mut self, item: ItemId, amount: i32) -> Result<(), LayoutError> {
        if amount == 0 {
            return Ok(());
        }
        if amount > 0 {
            self.grow_item_by(item, amount, 0)?;
        } else {
            self.shrink_item_by(item, -amount)?;
        }
        let Some(parent) = self.parent(item) else {
            return Err(LayoutError::UnknownAnchor { item });
        };
        self.position_items(parent);
        Ok(())
    }

    /// Squeeze `amount + separator_waste` pixels out of the neighbours
    /// and add `amount` to the item. The split across sides aims the new
    /// side-one edge at the midpoint of the whole squeeze, clamped by
    /// each side's slack.
    fn grow_item_by(
        &mut self,
        item: ItemId,
        amount: i32,
        separator_waste: i32,
    ) -> Result<(), LayoutError> {
        let Some(parent) = self.parent(item) else {
            return Err(LayoutError::UnknownAnchor { item });
        };
        let Some(o) = self.orientation(parent) else {
            return Err(LayoutError::UnknownAnchor { item: parent });
        };
        let visible = self.visible_children(parent);
        let Some(index) = visible.iter().position(|&c| c == item) else {
            return Err(LayoutError::UnknownAnchor { item });
        };

        if visible.len() == 1 {
            let length = self.recorded_geometry(parent).length(o);
            self.set_length_recursive(item, o, length);
            return Ok(());
        }

        let available1 = if index == 0 {
            0
        } else {
            self.length_on_side(parent, index - 1, Side::One).available()
        };
        let available2 = self.length_on_side(parent, index + 1, Side::Two).available();

        let needed = amount + separator_waste;
        if available1 + available2 < needed {
            return Err(LayoutError::ConstraintViolation {
                item,
                min: self.min_size(parent),
                requested: self.recorded_geometry(parent).size(),
            });
        }

        let pos = self.recorded_geometry(item).pos_along(o);
        let mut side1_growth = if index == 0 {
            0
        } else {
            let target = pos - needed / 2;
            let clamped = target.clamp(pos - available1, pos + available2 - needed);
            pos - clamped
        };
        side1_growth = side1_growth.clamp(0, available1);
        let mut side2_growth = needed - side1_growth;
        if side2_growth > available2 {
            side1_growth += side2_growth - available2;
            side2_growth = available2;
        }

        self.squeeze_side(parent, index, Side::One, side1_growth)?;
        self.squeeze_side(parent, index, Side::Two, side2_growth)?;

        let new_length = self.recorded_geometry(item).length(o) + amount;
        self.set_length_recursive(item, o, new_length);
        Ok(())
    }

    /// Give `amount` pixels back to the neighbours, mirroring the
    /// grow split so an unclamped grow/shrink pair is a no-op.
    fn shrink_item_by(&mut self, item: ItemId, amount: i32) -> Result<(), LayoutError> {
        let Some(parent) = self.parent(item) else {
            return Err(LayoutError::UnknownAnchor { item });
        };
        let Some(o) = self.orientation(parent) else {
            return Err(LayoutError::UnknownAnchor { item: parent });
        };
        let visible = self.visible_children(parent);
        let Some(index) = visible.iter().position(|&c| c == item) else {
            return Err(LayoutError::UnknownAnchor { item });
        };

        let own_available = (self.length(item, o) - self.min_length(item, o)).max(0);
        if own_available < amount {
            return Err(LayoutError::ConstraintViolation {
                item,
                min: self.min_size(item),
                requested: self
                    .recorded_geometry(item)
                    .size()
                    .with_length(o, self.recorded_geometry(item).length(o) - amount),
            });
        }
        if visible.len() == 1 {
            return Ok(());
        }

        let side1_share = if index == 0 {
            0
        } else if index == visible.len() - 1 {
            amount
        } else {
            amount / 2
        };
        let side2_share = amount - side1_share;

        self.give_to_side(parent, index, Side::One, side1_share);
        self.give_to_side(parent, index, Side::Two, side2_share);

        let new_length = self.recorded_geometry(item).length(o) - amount;
        self.set_length_recursive(item, o, new_length);
        Ok(())
    }

    /// Two-sided growth with explicit per-side amounts (separator drags).
    pub(crate) fn grow_item_sides(
        &mut self,
        item: ItemId,
        side1_growth: i32,
        side2_growth: i32,
    ) -> Result<(), LayoutError> {
        let side1_growth = side1_growth.max(0);
        let side2_growth = side2_growth.max(0);
        let Some(parent) = self.parent(item) else {
            return Err(LayoutError::UnknownAnchor { item });
        };
        let Some(o) = self.orientation(parent) else {
            return Err(LayoutError::UnknownAnchor { item: parent });
        };
        let visible = self.visible_children(parent);
        let Some(index) = visible.iter().position(|&c| c == item) else {
            return Err(LayoutError::UnknownAnchor { item });
        };

        self.squeeze_side(parent, index, Side::One, side1_growth)?;
        self.squeeze_side(parent, index, Side::Two, side2_growth)?;
        let new_length =
            self.recorded_geometry(item).length(o) + side1_growth + side2_growth;
        self.set_length_recursive(item, o, new_length);
        self.position_items(parent);
        Ok(())
    }

    fn squeeze_side(
        &mut self,
        parent: ItemId,
        index: usize,
        side: Side,
        needed: i32,
    ) -> Result<(), LayoutError> {
        if needed <= 0 {
            return Ok(());
        }
        let Some(o) = self.orientation(parent) else {
            return Ok(());
        };
        let visible = self.visible_children(parent);
        let neighbours: Vec<ItemId> = match side {
            Side::One => visible[..index].to_vec(),
            Side::Two => visible[index + 1..].to_vec(),
        };
        // Composed minimums: container neighbours donate only down to
        // the minimum their own children impose.
        let availabilities: Vec<i32> = neighbours
            .iter()
            .map(|&n| (self.length(n, o) - self.min_length(n, o)).max(0))
            .collect();
        let Some(squeezes) = calculate_squeezes(&availabilities, needed) else {
            warn!(
                container = %parent,
                needed,
                "no donors left for squeeze; dumping layout\n{}",
                self.dump_layout()
            );
            debug_assert!(false, "squeeze with saturated donors");
            return Err(LayoutError::ConstraintViolation {
                item: parent,
                min: self.min_size(parent),
                requested: self.recorded_geometry(parent).size(),
            });
        };
        for (&neighbour, &squeeze) in neighbours.iter().zip(&squeezes) {
            if squeeze > 0 {
                let length = self.recorded_geometry(neighbour).length(o) - squeeze;
                self.set_length_recursive(neighbour, o, length);
            }
        }
        Ok(())
    }

    fn give_to_side(&mut self, parent: ItemId, index: usize, side: Side, amount: i32) {
        if amount <= 0 {
            return;
        }
        let Some(o) = self.orientation(parent) else {
            return;
        };
        let visible = self.visible_children(parent);
        let neighbours: Vec<ItemId> = match side {
            Side::One => visible[..index].to_vec(),
            Side::Two => visible[index + 1..].to_vec(),
        };
        if neighbours.is_empty() {
            return;
        }
        // Unbounded availability mirrors the squeeze distribution.
        let availabilities = vec![MAX_LENGTH; neighbours.len()];
        let Some(gains) = calculate_squeezes(&availabilities, amount) else {
            return;
        };
        for (&neighbour, &gain) in neighbours.iter().zip(&gains) {
            if gain > 0 {
                let length = self.recorded_geometry(neighbour).length(o) + gain;
                self.set_length_recursive(neighbour, o, length);
            }
        }
    }

    // ── Audit ───────────────────────────────────────────────────────

    /// Audit the full tree against its structural invariants.
    ///
    /// Non-mutating; failures are logged together with a layout dump.
    #[must_use]
    pub fn check_sanity(&self) -> bool {
        self.check_sanity_from(self.root)
    }

    fn check_sanity_from(&self, id: ItemId) -> bool {
        let Some(rec) = self.record(id) else {
            warn!(item = %id, "dangling item id");
            return false;
        };
        let Node::Container(data) = &rec.node else {
            return true;
        };

        if data.children.is_empty() && id != self.root {
            warn!(container = %id, "empty container should have been removed");
            return false;
        }

        let o = data.orientation;
        let length = rec.sizing.geometry.length(o);
        let across = rec.sizing.geometry.length(o.opposite());
        let container_rect = Rect::from_size(rec.sizing.geometry.size());
        let visible = self.visible_children(id);

        let mut expected_pos = 0;
        let mut occupied = SEPARATOR_THICKNESS * (visible.len() as i32 - 1).max(0);
        let mut percentage_sum = 0.0;
        for &child in &visible {
            let Some(child_rec) = self.record(child) else {
                warn!(item = %child, "dangling child id");
                return false;
            };
            let geometry = child_rec.sizing.geometry;
            let min = self.min_size(child);

            if geometry.width < min.width || geometry.height < min.height {
                warn!(
                    item = %child,
                    "size constraints not honoured: min={min:?} size={:?}\n{}",
                    geometry.size(),
                    self.dump_layout()
                );
                return false;
            }
            if geometry.pos_along(o) != expected_pos {
                warn!(
                    item = %child,
                    expected = expected_pos,
                    actual = geometry.pos_along(o),
                    "unexpected child position\n{}",
                    self.dump_layout()
                );
                return false;
            }
            if geometry.length(o.opposite()) != across || geometry.pos_along(o.opposite()) != 0 {
                warn!(
                    item = %child,
                    "child does not span the container orthogonally\n{}",
                    self.dump_layout()
                );
                return false;
            }
            if !container_rect.contains_rect(&geometry) {
                warn!(
                    item = %child,
                    "child geometry out of container bounds\n{}",
                    self.dump_layout()
                );
                return false;
            }
            expected_pos = geometry.end_along(o) + SEPARATOR_THICKNESS;
            occupied += geometry.length(o);
            percentage_sum += child_rec.sizing.percentage;
        }

        if !visible.is_empty() {
            if occupied != length {
                warn!(
                    container = %id,
                    expected = length,
                    occupied,
                    "children do not fill the container\n{}",
                    self.dump_layout()
                );
                return false;
            }
            if !fuzzy_eq(percentage_sum, 1.0) {
                warn!(
                    container = %id,
                    percentage_sum,
                    "child percentages do not add up\n{}",
                    self.dump_layout()
                );
                return false;
            }
        }

        for &child in &data.children {
            let Some(child_rec) = self.record(child) else {
                warn!(item = %child, "dangling child id");
                return false;
            };
            if child_rec.parent != Some(id) {
                warn!(item = %child, "stale parent link");
                return false;
            }
            if !self.is_visible(child) && !fuzzy_eq(child_rec.sizing.percentage, 0.0) {
                warn!(item = %child, "hidden item carries a percentage");
                return false;
            }
            if !self.check_sanity_from(child) {
                return false;
            }
        }
        true
    }

    /// Human-readable indented dump of the tree, for tests and logs.
    #[must_use]
    pub fn dump_layout(&self) -> String {
        let mut out = String::new();
        self.dump_item(self.root, 0, &mut out);
        out
    }

    fn dump_item(&self, id: ItemId, level: usize, out: &mut String) {
        let indent = "  ".repeat(level);
        let Some(rec) = self.record(id) else {
            let _ = writeln!(out, "{indent}? dangling {id}");
            return;
        };
        let geo = rec.sizing.geometry;
        let flags = {
            let mut flags = String::new();
            if !self.is_visible(id) {
                flags.push_str(" ;hidden;");
            }
            if rec.sizing.being_inserted {
                flags.push_str(" ;being-inserted;");
            }
            flags
        };
        match &rec.node {
            Node::Container(data) => {
                let marker = if id == self.root { "* Root" } else { "* Container" };
                let percentages: Vec<f64> = data
                    .children
                    .iter()
                    .filter(|&&c| self.is_visible(c))
                    .map(|&c| self.sizing(c).percentage)
                    .collect();
                let _ = writeln!(
                    out,
                    "{indent}{marker} {id} {:?} ({},{} {}x{}){flags} %={percentages:?}",
                    data.orientation, geo.x, geo.y, geo.width, geo.height
                );
                for &child in &data.children {
                    self.dump_item(child, level + 1, out);
                }
            }
            Node::Leaf(leaf) => {
                let name = leaf.guest_id.as_deref().unwrap_or("-");
                let _ = writeln!(
                    out,
                    "{indent}- Leaf {id} [{name}] ({},{} {}x{}) refs={}{flags}",
                    geo.x, geo.y, geo.width, geo.height, leaf.ref_count
                );
            }
        }
    }
}

/// Share `usable` pixels among children: rounded percentages with the
/// remainder going to the last child, then minimums enforced by pulling
/// the deficit from siblings with slack.
pub(crate) fn distribute_lengths(percentages: &[f64], mins: &[i32], usable: i32) -> Vec<i32> {
    let n = percentages.len().min(mins.len());
    if n == 0 {
        return Vec::new();
    }
    let mut lengths = Vec::with_capacity(n);
    let mut assigned = 0;
    for &pct in &percentages[..n - 1] {
        let len = (pct * f64::from(usable)).round() as i32;
        lengths.push(len);
        assigned += len;
    }
    lengths.push(usable - assigned);

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
    lengths
}

/// Donation vector: extract `needed` pixels from donors, evenly per
/// round, never below a donor's minimum. `None` when the donors cannot
/// cover the request.
pub(crate) fn calculate_squeezes(availabilities: &[i32], needed: i32) -> Option<Vec<i32>> {
    let count = availabilities.len();
    let mut remaining: Vec<i32> = availabilities.to_vec();
    let mut squeezes = vec![0; count];
    let mut missing = needed;
    while missing > 0 {
        let num_donors = remaining.iter().filter(|&&a| a > 0).count() as i32;
        if num_donors == 0 {
            return None;
        }
        let mut to_take = missing / num_donors;
        if to_take == 0 {
            to_take = missing;
        }
        for i in 0..count {
            let available = remaining[i];
            if available == 0 {
                continue;
            }
            let took = to_take.min(available).min(missing);
            remaining[i] -= took;
            missing -= took;
            squeezes[i] += took;
            if missing == 0 {
                break;
            }
        }
    }
    Some(squeezes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ST: i32 = SEPARATOR_THICKNESS;

    fn root_tree(width: i32, height: i32) -> ItemTree {
        ItemTree::new(Size::new(width, height))
    }

    fn leaf(tree: &mut ItemTree, min_w: i32, min_h: i32) -> ItemId {
        tree.new_leaf(Size::new(min_w, min_h))
    }

    fn insert(tree: &mut ItemTree, target: ItemId, loc: Location, child: ItemId) {
        tree.insert_at_location(target, loc, child)
            .expect("insertion should succeed");
    }

    #[test]
    fn fresh_root_is_sane() {
        let tree = root_tree(1000, 1000);
        assert!(tree.is_container(tree.root()));
        assert_eq!(tree.size(tree.root()), Size::new(1000, 1000));
        assert_eq!(tree.min_size(tree.root()), Size::default());
        assert!(tree.check_sanity());
    }

    #[test]
    fn unknown_ids_answer_neutrally() {
        let tree = root_tree(1000, 1000);
        let ghost = ItemId::new(404).expect("non-zero");
        assert!(!tree.contains(ghost));
        assert!(!tree.is_container(ghost));
        assert!(!tree.is_leaf(ghost));
        assert!(!tree.is_visible(ghost));
        assert_eq!(tree.parent(ghost), None);
        assert_eq!(tree.orientation(ghost), None);
        assert!(tree.children(ghost).is_empty());
        assert_eq!(tree.geometry(ghost), Rect::default());
        assert_eq!(tree.ref_count(ghost), 0);
    }

    #[test]
    fn leaf_accessors_answer_neutrally() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let item = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Top, item);

        // A live leaf is not a container, and vice versa.
        assert_eq!(tree.orientation(item), None);
        assert!(tree.children(item).is_empty());
        assert_eq!(tree.guest_id(root), None);
        assert_eq!(tree.ref_count(root), 0);
        assert_eq!(tree.usable_length(item), 0);
        assert_eq!(tree.available_length(item), 0);
    }

    #[test]
    fn insert_one_fills_the_root() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let item = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Top, item);

        assert_eq!(tree.children(root).len(), 1);
        assert!(tree.is_leaf(item));
        assert_eq!(tree.size(item), tree.size(root));
        assert_eq!(tree.geometry(item).pos(), Point::default());
        assert!(tree.check_sanity());
    }

    #[test]
    fn insert_three_side_by_side() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let one = leaf(&mut tree, 100, 100);
        let two = leaf(&mut tree, 100, 100);
        let three = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, one);
        insert(&mut tree, root, Location::Right, two);
        insert(&mut tree, root, Location::Right, three);

        assert_eq!(tree.children(root).len(), 3);
        assert_eq!(tree.orientation(root), Some(Orientation::Horizontal));
        let widths: i32 = [one, two, three]
            .iter()
            .map(|&i| tree.geometry(i).width)
            .sum();
        assert_eq!(widths + 2 * ST, 1000);
        for id in [one, two, three] {
            assert_eq!(tree.geometry(id).height, 1000);
        }
        assert!(tree.check_sanity());
    }

    #[test]
    fn insert_relative_to_leaf_keeps_order() {
        // [1, 2] then insert 3 left of 2: [1, 3, 2].
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let one = leaf(&mut tree, 100, 100);
        let two = leaf(&mut tree, 100, 100);
        let three = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, one);
        insert(&mut tree, root, Location::Right, two);
        insert(&mut tree, two, Location::Left, three);

        assert!(tree.geometry(one).x < tree.geometry(three).x);
        assert!(tree.geometry(three).x < tree.geometry(two).x);
        assert_eq!(tree.geometry(three).y, tree.geometry(two).y);
        assert_eq!(tree.children(root).len(), 3);
        assert!(tree.check_sanity());
    }

    #[test]
    fn orthogonal_insert_converts_anchor_to_container() {
        // [1, 2] then insert 3 below 2.
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let one = leaf(&mut tree, 100, 100);
        let two = leaf(&mut tree, 100, 100);
        let three = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, one);
        insert(&mut tree, root, Location::Right, two);
        let two_width = tree.geometry(two).width;
        insert(&mut tree, two, Location::Bottom, three);

        let sub = tree.parent(two).expect("two must have been reparented");
        assert_ne!(sub, root);
        assert!(tree.is_container(sub));
        assert_eq!(tree.orientation(root), Some(Orientation::Horizontal));
        assert_eq!(tree.orientation(sub), Some(Orientation::Vertical));
        assert_eq!(tree.parent(three), Some(sub));
        assert_eq!(tree.geometry(sub).width, two_width);
        assert_eq!(tree.geometry(sub).height, 1000);
        assert_eq!(
            tree.geometry(two).bottom() + ST,
            tree.geometry(three).y
        );
        assert!(tree.check_sanity());
    }

    #[test]
    fn orthogonal_insert_on_sub_container_nests_again() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let one = leaf(&mut tree, 100, 100);
        let two = leaf(&mut tree, 100, 100);
        let three = leaf(&mut tree, 100, 100);
        let three_one = leaf(&mut tree, 100, 100);
        let three_two = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, one);
        insert(&mut tree, root, Location::Right, two);
        insert(&mut tree, two, Location::Right, three);
        insert(&mut tree, three, Location::Bottom, three_one);
        let outer = tree.parent(three).expect("nested container");
        insert(&mut tree, three, Location::Right, three_two);
        let inner = tree.parent(three).expect("innermost container");

        assert_eq!(tree.parent(inner), Some(outer));
        assert_eq!(tree.orientation(outer), Some(Orientation::Vertical));
        assert_eq!(tree.orientation(inner), Some(Orientation::Horizontal));
        assert_eq!(tree.children(root).len(), 3);
        assert_eq!(tree.children(outer).len(), 2);
        assert_eq!(tree.children(inner).len(), 2);
        assert_eq!(
            tree.geometry(inner).width,
            tree.geometry(three).width + ST + tree.geometry(three_two).width
        );
        assert!(tree.check_sanity());
    }

    #[test]
    fn orthogonal_insert_on_root_wraps_children() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let one = leaf(&mut tree, 100, 100);
        let two = leaf(&mut tree, 100, 100);
        let four = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, one);
        insert(&mut tree, root, Location::Right, two);
        insert(&mut tree, root, Location::Top, four);

        assert_eq!(tree.parent(four), Some(root));
        assert_eq!(tree.orientation(root), Some(Orientation::Vertical));
        assert_eq!(tree.children(root).len(), 2);
        assert_eq!(tree.geometry(four).width, 1000);
        assert_eq!(tree.geometry(four).pos(), Point::default());
        let wrapped = tree.parent(one).expect("one must live in the wrapper");
        assert_eq!(tree.parent(wrapped), Some(root));
        assert_eq!(tree.orientation(wrapped), Some(Orientation::Horizontal));
        assert!(tree.check_sanity());
    }

    #[test]
    fn remove_merges_space_into_neighbours() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let one = leaf(&mut tree, 100, 100);
        let two = leaf(&mut tree, 100, 100);
        let three = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Top, one);
        insert(&mut tree, root, Location::Bottom, two);
        insert(&mut tree, root, Location::Bottom, three);

        let h1 = tree.geometry(one).height;
        let h3 = tree.geometry(three).height;
        let freed = tree.geometry(two).height + ST;
        tree.remove_item(two, true);

        assert_eq!(tree.children(root).len(), 2);
        assert_eq!(tree.geometry(one).height, h1 + freed / 2);
        assert_eq!(tree.geometry(three).height, h3 + freed - freed / 2);
        assert_eq!(
            tree.geometry(one).height + ST + tree.geometry(three).height,
            1000
        );
        assert!(tree.check_sanity());
    }

    #[test]
    fn removing_last_child_collapses_the_container() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let one = leaf(&mut tree, 100, 100);
        let two = leaf(&mut tree, 100, 100);
        let three = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, one);
        insert(&mut tree, root, Location::Right, two);
        insert(&mut tree, two, Location::Bottom, three);
        let sub = tree.parent(two).expect("sub-container");

        tree.remove_item(three, true);
        assert!(tree.contains(sub));
        assert_eq!(tree.geometry(two).height, 1000);

        tree.remove_item(two, true);
        assert!(!tree.contains(sub), "emptied container must collapse");
        assert_eq!(tree.children(root).len(), 1);
        assert_eq!(tree.geometry(one).width, 1000);
        assert!(tree.check_sanity());
    }

    #[test]
    fn min_size_composes_across_nesting() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let one = leaf(&mut tree, 101, 150);
        let two = leaf(&mut tree, 200, 300);
        let two_two = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, one);
        insert(&mut tree, root, Location::Right, two);
        insert(&mut tree, two, Location::Bottom, two_two);

        assert_eq!(tree.min_size(two), Size::new(200, 300));
        let sub = tree.parent(two).expect("sub-container");
        assert_eq!(tree.min_size(sub), Size::new(200, 300 + 100 + ST));
        assert_eq!(tree.min_size(root), Size::new(101 + 200 + ST, 300 + 100 + ST));
    }

    #[test]
    fn resize_scales_children_proportionally() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let one = leaf(&mut tree, 100, 100);
        let two = leaf(&mut tree, 100, 100);
        let three = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, one);
        insert(&mut tree, root, Location::Right, two);
        insert(&mut tree, root, Location::Right, three);

        let before: Vec<f64> = [one, two, three]
            .iter()
            .map(|&i| tree.sizing(i).percentage)
            .collect();

        tree.set_size_recursive(root, Size::new(2000, 505))
            .expect("resize should fit");

        assert_eq!(tree.size(root), Size::new(2000, 505));
        let widths: i32 = [one, two, three]
            .iter()
            .map(|&i| tree.geometry(i).width)
            .sum();
        assert_eq!(widths + 2 * ST, 2000);
        for (idx, &id) in [one, two, three].iter().enumerate() {
            assert_eq!(tree.geometry(id).height, 505);
            let after = tree.sizing(id).percentage;
            assert!(
                (after - before[idx]).abs() < 0.01,
                "percentage drifted: {} -> {after}",
                before[idx]
            );
        }
        assert!(tree.check_sanity());
    }

    #[test]
    fn resize_below_min_is_refused() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let one = leaf(&mut tree, 500, 500);
        insert(&mut tree, root, Location::Left, one);

        tree.set_size_recursive(root, Size::new(500, 500))
            .expect("exactly the minimum still fits");
        assert_eq!(tree.size(root), Size::new(500, 500));

        let err = tree
            .set_size_recursive(root, Size::new(499, 500))
            .expect_err("below the minimum must be refused");
        assert!(matches!(err, LayoutError::ConstraintViolation { .. }));
        assert_eq!(tree.size(root), Size::new(500, 500), "size unchanged");
        assert!(tree.check_sanity());
    }

    #[test]
    fn resize_respects_an_individual_child_min() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let big = leaf(&mut tree, 400, 100);
        let small = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, big);
        insert(&mut tree, root, Location::Right, small);

        // Shrinking proportionally would push `big` below 400.
        tree.set_size_recursive(root, Size::new(520, 1000))
            .expect("total still fits");
        assert!(tree.geometry(big).width >= 400);
        assert!(tree.geometry(small).width >= 100);
        assert!(tree.check_sanity());
    }

    #[test]
    fn available_and_neighbour_queries() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        assert_eq!(tree.available_size(root), Size::new(1000, 1000));

        let one = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, one);
        assert_eq!(tree.available_size(root), Size::new(900, 900));
        assert_eq!(tree.min_size(root), Size::new(100, 100));
        assert_eq!(tree.available_on_side(one, Side::One), 0);
        assert_eq!(tree.available_on_side(one, Side::Two), 0);

        let two = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, two);
        assert_eq!(tree.available_size(root), Size::new(800 - ST, 900));
        assert_eq!(tree.min_size(root), Size::new(200 + ST, 100));
        assert_eq!(
            tree.neighbours_length_recursive(one, Side::One, Orientation::Horizontal),
            tree.geometry(two).width
        );
        assert_eq!(
            tree.neighbours_length_recursive(two, Side::Two, Orientation::Horizontal),
            tree.geometry(one).width
        );
        assert_eq!(
            tree.neighbours_length_recursive(one, Side::One, Orientation::Vertical),
            0
        );
    }

    #[test]
    fn missing_size_accounts_for_separator_waste() {
        let mut tree = root_tree(1000, 1000);
        let fits = Size::new(100, 100);
        assert_eq!(
            tree.missing_size_for(Orientation::Vertical, fits),
            Size::default()
        );
        let too_tall = Size::new(1100, 1200);
        assert_eq!(
            tree.missing_size_for(Orientation::Vertical, too_tall),
            Size::new(100, 200)
        );

        let root = tree.root();
        let one = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Top, one);
        let min = Size::new(1000, 1000);
        assert_eq!(
            tree.missing_size_for(Orientation::Vertical, min),
            Size::new(100, 100 + ST)
        );
    }

    #[test]
    fn placeholder_hides_and_restores_in_place() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let one = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, one);
        assert!(tree.is_visible(one));

        tree.remove_item(one, false);
        assert!(!tree.is_visible(one));
        assert_eq!(tree.visible_count_recursive(root), 0);
        assert_eq!(tree.count_recursive(root), 1);
        assert!(tree.check_sanity());

        let two = leaf(&mut tree, 100, 100);
        let three = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, two);
        insert(&mut tree, root, Location::Left, three);
        assert!(tree.check_sanity());
        assert_eq!(
            tree.geometry(two).width + tree.geometry(three).width + ST,
            1000
        );

        tree.remove_item(two, false);
        assert!(tree.check_sanity());
        assert_eq!(tree.geometry(three).width, 1000);

        tree.restore_placeholder(two);
        assert!(tree.is_visible(two));
        assert!(tree.check_sanity());
    }

    #[test]
    fn restore_returns_to_the_same_slot_with_similar_width() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let one = leaf(&mut tree, 100, 100);
        let two = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, one);
        insert(&mut tree, root, Location::Right, two);

        let one_width = tree.geometry(one).width;
        tree.remove_item(one, false);
        assert_eq!(tree.geometry(two).width, 1000);

        tree.restore_placeholder(one);
        assert_eq!(tree.index_of_child(root, one), Some(0));
        let restored = tree.geometry(one).width;
        assert!(
            (restored - one_width).abs() <= 1,
            "restored width {restored} too far from {one_width}"
        );
        assert!(tree.check_sanity());
    }

    #[test]
    fn grow_then_shrink_round_trips() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let one = leaf(&mut tree, 100, 100);
        let two = leaf(&mut tree, 100, 100);
        let three = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, one);
        insert(&mut tree, root, Location::Right, two);
        insert(&mut tree, root, Location::Right, three);
        // Widen so every pane carries slack on both sides of `two`.
        tree.set_size_recursive(root, Size::new(2000, 1000))
            .expect("resize should fit");

        let before: Vec<i32> = [one, two, three]
            .iter()
            .map(|&i| tree.geometry(i).width)
            .collect();

        tree.grow_item(two, 60).expect("slack is plentiful");
        assert!(tree.check_sanity());
        assert_eq!(tree.geometry(two).width, before[1] + 60);

        tree.grow_item(two, -60).expect("shrinking back");
        let after: Vec<i32> = [one, two, three]
            .iter()
            .map(|&i| tree.geometry(i).width)
            .collect();
        assert_eq!(before, after);
        assert!(tree.check_sanity());
    }

    #[test]
    fn grow_item_sides_moves_one_boundary() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let one = leaf(&mut tree, 100, 100);
        let two = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, one);
        insert(&mut tree, root, Location::Right, two);
        // Give `two` slack to donate.
        tree.set_size_recursive(root, Size::new(2000, 1000))
            .expect("resize should fit");

        let w1 = tree.geometry(one).width;
        let w2 = tree.geometry(two).width;
        tree.grow_item_sides(one, 0, 40).expect("two has slack");
        assert_eq!(tree.geometry(one).width, w1 + 40);
        assert_eq!(tree.geometry(two).width, w2 - 40);
        assert!(tree.check_sanity());
    }

    #[test]
    fn grow_on_detached_items_is_an_error() {
        let mut tree = root_tree(1000, 1000);
        let one = leaf(&mut tree, 100, 100);
        // Never inserted: growing it must fail, not panic.
        let err = tree.grow_item(one, 50).expect_err("detached item");
        assert!(matches!(err, LayoutError::UnknownAnchor { .. }));
    }

    #[test]
    fn squeeze_distribution_is_even_until_saturation() {
        let squeezes = calculate_squeezes(&[100, 100, 100], 90).expect("feasible");
        assert_eq!(squeezes.iter().sum::<i32>(), 90);
        assert_eq!(squeezes, vec![30, 30, 30]);

        let squeezes = calculate_squeezes(&[10, 100, 100], 90).expect("feasible");
        assert_eq!(squeezes.iter().sum::<i32>(), 90);
        assert_eq!(squeezes[0], 10, "saturated donor gives all it has");

        assert_eq!(calculate_squeezes(&[10, 10], 90), None);
    }

    #[test]
    fn distribute_lengths_enforces_minimums() {
        let lengths = distribute_lengths(&[0.5, 0.5], &[100, 100], 1000);
        assert_eq!(lengths.iter().sum::<i32>(), 1000);

        let lengths = distribute_lengths(&[0.9, 0.1], &[100, 400], 1000);
        assert_eq!(lengths.iter().sum::<i32>(), 1000);
        assert!(lengths[1] >= 400);
    }

    #[test]
    fn item_at_descends_into_nesting() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let one = leaf(&mut tree, 100, 100);
        let two = leaf(&mut tree, 100, 100);
        let three = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, one);
        insert(&mut tree, root, Location::Right, two);
        insert(&mut tree, two, Location::Bottom, three);

        assert_eq!(tree.item_at(Point::new(10, 10)), Some(one));
        let three_geo = tree.geometry_in_root(three);
        let inside_three = Point::new(three_geo.x + 5, three_geo.y + 5);
        assert_eq!(tree.item_at(inside_three), Some(three));
        assert_eq!(tree.item_at(Point::new(-5, -5)), None);
    }

    #[test]
    fn map_to_root_accumulates_ancestor_offsets() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let one = leaf(&mut tree, 100, 100);
        let two = leaf(&mut tree, 100, 100);
        let three = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, one);
        insert(&mut tree, root, Location::Right, two);
        insert(&mut tree, two, Location::Bottom, three);

        let sub = tree.parent(three).expect("sub-container");
        let expected_x = tree.geometry(sub).x + tree.geometry(three).x;
        let expected_y = tree.geometry(sub).y + tree.geometry(three).y;
        assert_eq!(tree.geometry_in_root(three).pos(), Point::new(expected_x, expected_y));
    }

    #[test]
    fn dump_layout_mentions_every_leaf() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let one = leaf(&mut tree, 100, 100);
        let two = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, one);
        insert(&mut tree, root, Location::Right, two);
        tree.remove_item(two, false);

        let dump = tree.dump_layout();
        assert!(dump.contains("Root"));
        assert!(dump.contains(&one.to_string()));
        assert!(dump.contains(&two.to_string()));
        assert!(dump.contains(";hidden;"));
    }

    #[test]
    fn duplicate_and_invalid_insertions_are_rejected() {
        let mut tree = root_tree(1000, 1000);
        let root = tree.root();
        let one = leaf(&mut tree, 100, 100);
        insert(&mut tree, root, Location::Left, one);

        let err = tree
            .insert_at_location(root, Location::Right, one)
            .expect_err("re-inserting a parented item");
        assert!(matches!(err, LayoutError::DuplicateInsertion { .. }));

        let two = leaf(&mut tree, 100, 100);
        let err = tree
            .insert_at_location(root, Location::None, two)
            .expect_err("the null location");
        assert!(matches!(err, LayoutError::InvalidLocation { .. }));

        let ghost = ItemId::new(999).expect("non-zero");
        let err = tree
            .insert_at_location(ghost, Location::Left, two)
            .expect_err("unknown anchor");
        assert!(matches!(err, LayoutError::UnknownAnchor { .. }));
    }
}
