//! The external interface façade.
//!
//! [`DockLayout`] is what the surrounding UI talks to: it owns the item
//! tree, binds guests to leaves, applies the root-growth policy, routes
//! separator drags into the tree's growth routines, and pushes geometry
//! and visibility out to guests and the registered observer after every
//! mutation, once invariants are re-established.

use std::collections::BTreeMap;
use std::rc::Rc;

use dockpane_core::{Location, Orientation, Rect, Side, Size};
use tracing::warn;

use crate::drop;
use crate::error::LayoutError;
use crate::guest::{GuestEvent, GuestHandle, LayoutObserver};
use crate::item::{clamped_min_size, ItemId, ItemTree};
use crate::separator::{DragEffect, ResizeMode, SeparatorDrag};
use crate::snapshot::{self, LayoutSnapshot, RestoreOptions};

/// A client-held claim on a hidden leaf's slot.
///
/// While at least one of these is alive (engine-side, reference
/// counted), the leaf survives as a placeholder and can be restored to
/// its original relative position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastPosition {
    item: ItemId,
    guest_id: String,
}

impl LastPosition {
    /// The leaf this claim keeps alive.
    #[must_use]
    pub fn item(&self) -> ItemId {
        self.item
    }

    /// Stable id of the guest that last occupied the slot.
    #[must_use]
    pub fn guest_id(&self) -> &str {
        &self.guest_id
    }
}

struct ActiveDrag {
    container: ItemId,
    boundary: usize,
    machine: SeparatorDrag,
    /// Boundary position at press time, container-relative.
    origin: i32,
    /// Cumulative delta already applied (eager mode).
    applied: i32,
    /// Last rubber-band position (lazy mode), container-relative.
    rubber: i32,
    min_delta: i32,
    max_delta: i32,
}

/// The docking-layout engine for one host region.
///
/// Single-threaded and cooperative: every operation completes
/// synchronously and leaves the tree invariant-preserving before it
/// returns.
pub struct DockLayout {
    tree: ItemTree,
    observer: Option<Rc<dyn LayoutObserver>>,
    resize_mode: ResizeMode,
    drag: Option<ActiveDrag>,
    size_pinned: bool,
    in_resize: bool,
    in_min_size_propagation: bool,
    pushed: BTreeMap<ItemId, (Rect, bool)>,
}

impl DockLayout {
    /// Create an engine whose root container matches `size`.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            tree: ItemTree::new(size),
            observer: None,
            resize_mode: ResizeMode::default(),
            drag: None,
            size_pinned: false,
            in_resize: false,
            in_min_size_propagation: false,
            pushed: BTreeMap::new(),
        }
    }

    /// Read-only access to the underlying tree.
    #[must_use]
    pub fn tree(&self) -> &ItemTree {
        &self.tree
    }

    /// Current root (host region) size.
    #[must_use]
    pub fn size(&self) -> Size {
        self.tree.size(self.tree.root())
    }

    /// Register the one host observer.
    pub fn set_observer(&mut self, observer: Rc<dyn LayoutObserver>) {
        self.observer = Some(observer);
    }

    /// Drop the registered observer.
    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    /// Choose eager or lazy (rubber-band) separator resizing.
    pub fn set_resize_mode(&mut self, mode: ResizeMode) {
        self.resize_mode = mode;
    }

    /// Pin or unpin the root: a pinned root refuses growth, so drops
    /// that do not fit fail with `InsufficientSpace`.
    pub fn set_size_pinned(&mut self, pinned: bool) {
        self.size_pinned = pinned;
    }

    /// True while a separator drag is past its threshold; hosts use it
    /// to suspend expensive work.
    #[must_use]
    pub fn is_resizing(&self) -> bool {
        self.drag.as_ref().is_some_and(|d| d.machine.is_dragging())
    }

    // ── Host sizing ─────────────────────────────────────────────────

    /// Resize the root, propagating proportionally into the tree.
    ///
    /// Refused (tree untouched) when `size` is below the tree minimum.
    /// Nested calls short-circuit; the outermost call owns the pass.
    pub fn resize_root(&mut self, size: Size) -> Result<(), LayoutError> {
        if self.in_resize {
            return Ok(());
        }
        self.in_resize = true;
        let root = self.tree.root();
        let result = self.tree.set_size_recursive(root, size);
        self.in_resize = false;
        if result.is_ok() {
            self.flush(false);
        }
        result
    }

    fn ensure_space(&mut self, o: Orientation, min: Size) -> Result<(), LayoutError> {
        let missing = self.tree.missing_size_for(o, min);
        if missing.is_zero() {
            return Ok(());
        }
        if self.size_pinned {
            return Err(LayoutError::InsufficientSpace {
                needed: min,
                available: self.tree.available_size(self.tree.root()),
            });
        }
        let root = self.tree.root();
        let grown = self.tree.size(root) + missing;
        self.tree.set_size_recursive(root, grown)
    }

    // ── Guests in and out ───────────────────────────────────────────

    /// Host a new guest at `location`, relative to `anchor` or to the
    /// whole region. The pane takes the drop-rectangle's equitable
    /// share; the root grows when the guest's minimum does not fit and
    /// is not pinned.
    pub fn add_guest(
        &mut self,
        guest: GuestHandle,
        location: Location,
        anchor: Option<ItemId>,
    ) -> Result<ItemId, LayoutError> {
        self.insert_guest(guest, location, anchor, None)
    }

    /// Like [`DockLayout::add_guest`], but with an explicit size
    /// proposal (for example the rectangle a drop indicator showed, or
    /// a pane's former size when a client re-opens it).
    pub fn insert_guest(
        &mut self,
        guest: GuestHandle,
        location: Location,
        anchor: Option<ItemId>,
        proposed: Option<Size>,
    ) -> Result<ItemId, LayoutError> {
        let Some(o) = location.orientation() else {
            return Err(LayoutError::InvalidLocation { location });
        };
        if let Some(anchor) = anchor {
            if !self.tree.contains(anchor) {
                return Err(LayoutError::UnknownAnchor { item: anchor });
            }
        }
        let min = clamped_min_size(guest.min_size());
        self.ensure_space(o, min)?;

        let proposal = match proposed {
            Some(size) => size,
            None => drop::suggested_drop_rect(&self.tree, min, anchor, location)
                .map(|(_, rect)| rect.size())
                .unwrap_or(min),
        }
        .expanded_to(min);

        let leaf = self.tree.new_leaf(min);
        self.tree
            .set_recorded_geometry(leaf, Rect::from_size(proposal));
        if let Some(data) = self.tree.leaf_mut(leaf) {
            data.guest_id = Some(guest.stable_id());
            data.guest = Some(guest);
        }
        let target = anchor.unwrap_or(self.tree.root());
        let fit = match self.tree.insert_at_location(target, location, leaf) {
            Ok(fit) => fit,
            Err(err) => {
                self.tree.discard_detached(leaf);
                return Err(err);
            }
        };
        // Re-tile from the root when the target container was too small
        // (the root has room, ensured above), or when the insertion
        // just made a hidden container visible again and its parent has
        // not been tiling it.
        let parent_just_appeared = self.tree.parent(leaf).is_some_and(|parent| {
            parent != self.tree.root()
                && !self
                    .tree
                    .children(parent)
                    .iter()
                    .any(|&c| c != leaf && self.tree.is_visible(c))
        });
        if !fit || parent_just_appeared {
            let root = self.tree.root();
            self.tree.relayout(root);
        }
        // Nested containers may still be short of the new minimum
        // orthogonally; one propagation pass settles them.
        self.propagate_min_size_change(leaf)?;
        self.flush(true);
        Ok(leaf)
    }

    /// Attach a guest to an existing, guest-less leaf (typically one
    /// produced by a snapshot restore). The leaf's minimum rebinds to
    /// the guest's.
    pub fn set_guest(&mut self, item: ItemId, guest: GuestHandle) -> Result<(), LayoutError> {
        let Some(leaf) = self.tree.leaf(item) else {
            return Err(LayoutError::UnknownAnchor { item });
        };
        if leaf.guest.is_some() {
            return Err(LayoutError::AlreadyAttached { item });
        }
        let min = clamped_min_size(guest.min_size());
        if let Some(data) = self.tree.leaf_mut(item) {
            data.guest_id = Some(guest.stable_id());
            data.guest = Some(guest);
        }
        self.tree.set_item_min_size(item, min);
        self.propagate_min_size_change(item)?;
        self.flush(false);
        Ok(())
    }

    /// Remove an item: hard removal destroys it (and any emptied
    /// ancestors), soft removal turns it into a placeholder.
    pub fn remove_item(&mut self, item: ItemId, hard: bool) -> Result<(), LayoutError> {
        if !self.tree.contains(item) || item == self.tree.root() {
            return Err(LayoutError::UnknownAnchor { item });
        }
        let detached = self.tree.remove_item(item, hard);
        for (leaf, guest) in detached {
            let _ = self.pushed.remove(&leaf);
            if let Some(guest) = guest {
                // Detach before destruction; the guest stays client-owned.
                guest.set_visible(false);
            }
        }
        self.flush(true);
        Ok(())
    }

    /// Hide a leaf, keeping its slot for a later [`DockLayout::restore`].
    ///
    /// Panics on containers.
    pub fn turn_into_placeholder(&mut self, item: ItemId) -> Result<(), LayoutError> {
        assert!(
            !self.tree.contains(item) || self.tree.is_leaf(item),
            "turn_into_placeholder is leaf-only"
        );
        self.remove_item(item, false)
    }

    /// Re-attach a guest to a placeholder and grow it back into place.
    pub fn restore(&mut self, item: ItemId, guest: GuestHandle) -> Result<(), LayoutError> {
        if !self.tree.contains(item) || !self.tree.is_leaf(item) {
            return Err(LayoutError::UnknownAnchor { item });
        }
        if self.tree.is_visible(item) {
            return Err(LayoutError::AlreadyRestored { item });
        }
        // If the guest's minimum outgrew the layout since the hide,
        // grow the root first so the restore can reclaim enough space.
        let old_min = self.tree.min_size(item);
        self.tree
            .set_item_min_size(item, clamped_min_size(guest.min_size()));
        let root = self.tree.root();
        self.tree.set_visible_flag(item, true);
        let root_min = self.tree.min_size(root);
        self.tree.set_visible_flag(item, false);
        let root_size = self.tree.size(root);
        let grown = root_size.expanded_to(root_min);
        if grown != root_size {
            if self.size_pinned {
                self.tree.set_item_min_size(item, old_min);
                return Err(LayoutError::ConstraintViolation {
                    item,
                    min: root_min,
                    requested: root_size,
                });
            }
            self.tree.set_size_recursive(root, grown)?;
        }

        if let Some(data) = self.tree.leaf_mut(item) {
            data.guest_id = Some(guest.stable_id());
            data.guest = Some(guest);
        }
        // A parent that was itself hidden re-appears with this restore;
        // its own container has not been tiling it, so re-tile from the
        // root once the leaf is back.
        let chain_reappears = self
            .tree
            .parent(item)
            .is_some_and(|parent| parent != root && !self.tree.is_visible(parent));
        if !self.tree.restore_placeholder(item) || chain_reappears {
            self.tree.relayout(root);
        }
        self.propagate_min_size_change(item)?;
        self.flush(true);
        Ok(())
    }

    // ── Reference-counted placeholders ──────────────────────────────

    /// Claim a leaf's slot. The claim keeps the leaf alive as a
    /// placeholder after its guest goes away.
    pub fn take_last_position(&mut self, item: ItemId) -> Result<LastPosition, LayoutError> {
        let Some(leaf) = self.tree.leaf_mut(item) else {
            return Err(LayoutError::UnknownAnchor { item });
        };
        leaf.ref_count += 1;
        let guest_id = leaf.guest_id.clone().unwrap_or_default();
        Ok(LastPosition { item, guest_id })
    }

    /// Release a claim; the last release of a hidden leaf removes it.
    pub fn release_last_position(&mut self, claim: LastPosition) -> Result<(), LayoutError> {
        let item = claim.item;
        let Some(data) = self.tree.leaf_mut(item) else {
            // The leaf was already destroyed (for example by a hard
            // removal); nothing left to release.
            return Ok(());
        };
        data.ref_count = data.ref_count.saturating_sub(1);
        let remaining = data.ref_count;
        if remaining == 0 && !self.tree.is_visible(item) {
            self.remove_item(item, false)?;
        }
        Ok(())
    }

    /// Restore through a claim. The first claim to restore wins;
    /// subsequent restores fail with `AlreadyRestored`.
    pub fn restore_last_position(
        &mut self,
        claim: &LastPosition,
        guest: GuestHandle,
    ) -> Result<(), LayoutError> {
        self.restore(claim.item, guest)
    }

    // ── Guest events ────────────────────────────────────────────────

    /// Feed a guest-side event back into the engine.
    pub fn guest_event(&mut self, item: ItemId, event: GuestEvent) -> Result<(), LayoutError> {
        if !self.tree.contains(item) || !self.tree.is_leaf(item) {
            return Err(LayoutError::UnknownAnchor { item });
        }
        match event {
            GuestEvent::MinSizeChanged => {
                let Some(guest) = self.tree.leaf(item).and_then(|l| l.guest.clone()) else {
                    return Ok(());
                };
                self.tree
                    .set_item_min_size(item, clamped_min_size(guest.min_size()));
                self.propagate_min_size_change(item)?;
                if let Some(observer) = self.observer.clone() {
                    observer.on_min_size_changed(item);
                }
                self.flush(false);
            }
            GuestEvent::LayoutInvalidated => {
                // Forget what was pushed so the next flush re-sends it.
                let _ = self.pushed.remove(&item);
                self.flush(false);
            }
            GuestEvent::Detached => {
                // The guest was torn off the host hierarchy: its leaf
                // lives on as a placeholder.
                if self.tree.is_visible(item) {
                    self.remove_item(item, false)?;
                }
            }
        }
        Ok(())
    }

    /// A cascade of child min-size updates collapses into one root
    /// resize attempt, then per-level growth back to the minimum.
    fn propagate_min_size_change(&mut self, item: ItemId) -> Result<(), LayoutError> {
        if self.in_min_size_propagation {
            return Ok(());
        }
        self.in_min_size_propagation = true;
        let result = self.propagate_min_size_change_inner(item);
        self.in_min_size_propagation = false;
        result
    }

    fn propagate_min_size_change_inner(&mut self, item: ItemId) -> Result<(), LayoutError> {
        let root = self.tree.root();
        let root_min = self.tree.min_size(root);
        let root_size = self.tree.size(root);
        let grown = root_size.expanded_to(root_min);
        if grown != root_size {
            if self.size_pinned {
                return Err(LayoutError::ConstraintViolation {
                    item: root,
                    min: root_min,
                    requested: root_size,
                });
            }
            self.tree.set_size_recursive(root, grown)?;
        }

        // Walk the ancestor path top-down, growing whichever level is
        // below its minimum along its parent's orientation. Topmost
        // first so each grow finds its donors already sized.
        let mut path = vec![item];
        let mut cursor = item;
        while let Some(parent) = self.tree.parent(cursor) {
            path.push(parent);
            cursor = parent;
        }
        path.reverse();
        for &node in path.iter().skip(1) {
            if !self.tree.is_visible(node) {
                continue;
            }
            let Some(o) = self.tree.parent(node).and_then(|p| self.tree.orientation(p)) else {
                continue;
            };
            let missing = self.tree.min_length(node, o) - self.tree.length(node, o);
            if missing > 0 && self.tree.grow_item(node, missing).is_err() {
                // Siblings could not cover it; the root has room, so a
                // full re-tile settles every level at once.
                self.tree.relayout(root);
                return Ok(());
            }
        }
        Ok(())
    }

    // ── Drop suggestion ─────────────────────────────────────────────

    /// The rectangle (in root coordinates) a drop would occupy.
    pub fn suggested_drop_rect(
        &self,
        min_size: Size,
        anchor: Option<ItemId>,
        location: Location,
    ) -> Result<Rect, LayoutError> {
        let (container, rect) = drop::suggested_drop_rect(&self.tree, min_size, anchor, location)?;
        Ok(rect.translated(self.tree.root_offset(container)))
    }

    // ── Separator drags ─────────────────────────────────────────────

    /// Number of draggable boundaries in a container.
    #[must_use]
    pub fn separator_count(&self, container: ItemId) -> usize {
        if !self.tree.contains(container) || !self.tree.is_container(container) {
            return 0;
        }
        self.tree.num_visible_children(container).saturating_sub(1)
    }

    /// Press on the boundary between visible children `boundary` and
    /// `boundary + 1` of `container`, at `position` along the
    /// container's orientation.
    pub fn begin_drag(
        &mut self,
        container: ItemId,
        boundary: usize,
        position: i32,
    ) -> Result<(), LayoutError> {
        if boundary >= self.separator_count(container) {
            return Err(LayoutError::UnknownAnchor { item: container });
        }
        let Some(o) = self.tree.orientation(container) else {
            return Err(LayoutError::UnknownAnchor { item: container });
        };
        let visible = self.tree.visible_children(container);
        let origin = self.tree.geometry(visible[boundary]).end_along(o);
        let min_delta = -self
            .tree
            .length_on_side(container, boundary, Side::One)
            .available();
        let max_delta = self
            .tree
            .length_on_side(container, boundary + 1, Side::Two)
            .available();

        let mut machine = SeparatorDrag::new(self.resize_mode);
        let _ = machine.press(position);
        self.drag = Some(ActiveDrag {
            container,
            boundary,
            machine,
            origin,
            applied: 0,
            rubber: origin,
            min_delta,
            max_delta,
        });
        Ok(())
    }

    /// Pointer moved during a drag. `button_down` is the platform's
    /// live button state (lazy mode uses it to survive lost release
    /// events). Without an active drag this is a no-op.
    pub fn update_drag(&mut self, position: i32, button_down: bool) -> Result<(), LayoutError> {
        let Some(drag) = &mut self.drag else {
            return Ok(());
        };
        let effect = drag.machine.moved(position, button_down);
        self.apply_drag_effect(effect)
    }

    /// Finish a drag: `commit` applies the pending delta (lazy mode),
    /// cancelling drops it.
    pub fn end_drag(&mut self, position: i32, commit: bool) -> Result<(), LayoutError> {
        let Some(drag) = &mut self.drag else {
            return Ok(());
        };
        let effect = if commit {
            drag.machine.release(position)
        } else {
            drag.machine.cancel()
        };
        let result = self.apply_drag_effect(effect);
        // A release before the drag threshold leaves the machine idle
        // with nothing to apply; drop the interaction either way.
        if self
            .drag
            .as_ref()
            .is_some_and(|d| !d.machine.is_dragging())
        {
            self.drag = None;
        }
        result
    }

    /// External cancellation (Escape, application quit): pending delta
    /// is dropped, state returns to rest.
    pub fn cancel_drag(&mut self) {
        if let Some(drag) = &mut self.drag {
            let _ = drag.machine.cancel();
        }
        self.drag = None;
    }

    /// Where the rubber band sits during a lazy drag,
    /// container-relative along the orientation.
    #[must_use]
    pub fn rubber_band_position(&self) -> Option<i32> {
        self.drag
            .as_ref()
            .filter(|d| d.machine.is_dragging())
            .map(|d| d.rubber)
    }

    fn apply_drag_effect(&mut self, effect: DragEffect) -> Result<(), LayoutError> {
        match effect {
            DragEffect::None => Ok(()),
            DragEffect::Resize { delta } => {
                self.apply_drag_step(delta)?;
                self.flush(false);
                Ok(())
            }
            DragEffect::RubberBand { position } => {
                if let Some(drag) = &mut self.drag {
                    let lo = drag.origin + drag.min_delta;
                    let hi = drag.origin + drag.max_delta;
                    drag.rubber = position.clamp(lo, hi);
                }
                Ok(())
            }
            DragEffect::Commit { position } => {
                let final_delta = self.drag.as_ref().map_or(0, |d| {
                    (position - d.origin).clamp(d.min_delta, d.max_delta) - d.applied
                });
                let result = self.apply_drag_step(final_delta);
                self.drag = None;
                self.flush(false);
                result
            }
            DragEffect::Cancel => {
                self.drag = None;
                Ok(())
            }
        }
    }

    /// Apply a signed boundary move, clamped to the slack captured at
    /// press time.
    fn apply_drag_step(&mut self, delta: i32) -> Result<(), LayoutError> {
        let Some(drag) = &mut self.drag else {
            return Ok(());
        };
        let target = (drag.applied + delta).clamp(drag.min_delta, drag.max_delta);
        let step = target - drag.applied;
        if step == 0 {
            return Ok(());
        }
        drag.applied = target;
        let container = drag.container;
        let boundary = drag.boundary;

        let visible = self.tree.visible_children(container);
        if step > 0 {
            self.tree.grow_item_sides(visible[boundary], 0, step)
        } else {
            self.tree.grow_item_sides(visible[boundary + 1], -step, 0)
        }
    }

    // ── Interactive grow (keyboard and friends) ─────────────────────

    /// Grow or shrink an item by `amount` pixels, both sides
    /// contributing equally. Only visible, non-root items can grow.
    pub fn grow_item(&mut self, item: ItemId, amount: i32) -> Result<(), LayoutError> {
        if !self.tree.contains(item)
            || item == self.tree.root()
            || !self.tree.is_visible(item)
        {
            return Err(LayoutError::UnknownAnchor { item });
        }
        self.tree.grow_item(item, amount)?;
        self.flush(false);
        Ok(())
    }

    // ── Snapshots ───────────────────────────────────────────────────

    /// Capture the current layout.
    #[must_use]
    pub fn save_layout(&self) -> LayoutSnapshot {
        snapshot::save_layout(&self.tree)
    }

    /// Capture the current layout as a JSON document.
    #[must_use]
    pub fn save_layout_json(&self) -> String {
        snapshot::to_json(&self.save_layout())
    }

    /// Replace the layout with a snapshot. Guests are not rebound; the
    /// client looks leaves up by stable id and attaches them.
    pub fn restore_layout(
        &mut self,
        layout: &LayoutSnapshot,
        options: RestoreOptions,
    ) -> Result<(), LayoutError> {
        let tree = snapshot::build_tree(layout, self.size(), options)?;
        self.tree = tree;
        self.drag = None;
        self.pushed.clear();
        self.flush(true);
        if !self.check_sanity() {
            warn!("restored layout failed the sanity audit");
        }
        Ok(())
    }

    /// Replace the layout from a JSON document.
    pub fn restore_layout_json(
        &mut self,
        json: &str,
        options: RestoreOptions,
    ) -> Result<(), LayoutError> {
        let layout = snapshot::from_json(json)?;
        self.restore_layout(&layout, options)
    }

    /// Find the leaf bound to a guest stable id.
    #[must_use]
    pub fn item_for_guest(&self, stable_id: &str) -> Option<ItemId> {
        self.tree.item_for_guest(stable_id)
    }

    // ── Debug surface ───────────────────────────────────────────────

    /// Non-mutating full-tree invariant audit.
    #[must_use]
    pub fn check_sanity(&self) -> bool {
        self.tree.check_sanity()
    }

    /// Human-readable tree dump.
    #[must_use]
    pub fn dump_layout(&self) -> String {
        self.tree.dump_layout()
    }

    // ── Change propagation ──────────────────────────────────────────

    /// Push effective geometry/visibility to guests and the observer.
    /// Runs at the end of every mutating operation, after invariants
    /// hold.
    fn flush(&mut self, structure_changed: bool) {
        let observer = self.observer.clone();
        let ids = self.tree.item_ids();
        self.pushed.retain(|id, _| self.tree.contains(*id));

        for id in ids {
            let visible = self.tree.is_visible(id);
            let geometry = if visible {
                self.tree.geometry_in_root(id)
            } else {
                Rect::default()
            };
            let previous = self.pushed.insert(id, (geometry, visible));
            let (geometry_changed, visibility_changed) = match previous {
                Some((old_geometry, old_visible)) => {
                    (old_geometry != geometry, old_visible != visible)
                }
                None => (true, true),
            };
            if !geometry_changed && !visibility_changed {
                continue;
            }
            if let Some(guest) = self.tree.leaf(id).and_then(|l| l.guest.clone()) {
                if visibility_changed {
                    guest.set_visible(visible);
                }
                if geometry_changed && visible {
                    guest.set_geometry(geometry);
                }
            }
            if let Some(observer) = &observer {
                if geometry_changed {
                    observer.on_geometry_changed(id);
                }
                if visibility_changed {
                    observer.on_visibility_changed(id);
                }
            }
        }
        if structure_changed {
            if let Some(observer) = &observer {
                observer.on_structure_changed();
            }
        }
    }
}
