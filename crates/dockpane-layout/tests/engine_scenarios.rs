//! End-to-end scenarios against the engine façade: pane insertion in
//! every direction, proportional resizes, removal with space
//! redistribution, placeholder restore, drop suggestions, root growth,
//! separator drags, and snapshot round trips.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use dockpane_layout::{
    DockLayout, Guest, GuestEvent, ItemId, Location, Rect, ResizeMode, RestoreOptions, Size,
    SEPARATOR_THICKNESS,
};

const ST: i32 = SEPARATOR_THICKNESS;

struct TestPane {
    id: String,
    min: Cell<Size>,
    geometry: Cell<Rect>,
    visible: Cell<bool>,
    pushes: RefCell<Vec<Rect>>,
}

impl TestPane {
    fn new(id: &str, min_w: i32, min_h: i32) -> Rc<Self> {
        Rc::new(Self {
            id: id.to_owned(),
            min: Cell::new(Size::new(min_w, min_h)),
            geometry: Cell::new(Rect::default()),
            visible: Cell::new(false),
            pushes: RefCell::new(Vec::new()),
        })
    }
}

impl Guest for TestPane {
    fn min_size(&self) -> Size {
        self.min.get()
    }

    fn set_geometry(&self, rect: Rect) {
        self.geometry.set(rect);
        self.pushes.borrow_mut().push(rect);
    }

    fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }

    fn stable_id(&self) -> String {
        self.id.clone()
    }
}

fn widths(layout: &DockLayout, items: &[ItemId]) -> Vec<i32> {
    items
        .iter()
        .map(|&i| layout.tree().geometry(i).width)
        .collect()
}

fn heights(layout: &DockLayout, items: &[ItemId]) -> Vec<i32> {
    items
        .iter()
        .map(|&i| layout.tree().geometry(i).height)
        .collect()
}

#[test]
fn three_horizontal_panes_then_resize() {
    let mut layout = DockLayout::new(Size::new(1000, 1000));
    let l1 = layout
        .add_guest(TestPane::new("l1", 100, 100), Location::Left, None)
        .expect("l1");
    let l2 = layout
        .add_guest(TestPane::new("l2", 100, 100), Location::Right, None)
        .expect("l2");
    let l3 = layout
        .add_guest(TestPane::new("l3", 100, 100), Location::Right, None)
        .expect("l3");
    let panes = [l1, l2, l3];

    assert_eq!(heights(&layout, &panes), vec![1000, 1000, 1000]);
    let before = widths(&layout, &panes);
    assert_eq!(before.iter().sum::<i32>() + 2 * ST, 1000);
    assert!(layout.check_sanity());

    layout
        .resize_root(Size::new(2000, 505))
        .expect("resize fits");

    assert_eq!(heights(&layout, &panes), vec![505, 505, 505]);
    let after = widths(&layout, &panes);
    assert_eq!(after.iter().sum::<i32>() + 2 * ST, 2000);
    for (w_before, w_after) in before.iter().zip(&after) {
        let expected = f64::from(*w_before) * 1990.0 / 990.0;
        assert!(
            (f64::from(*w_after) - expected).abs() <= 1.0,
            "width {w_after} not proportional to {w_before}"
        );
    }
    assert!(layout.check_sanity());
}

#[test]
fn orthogonal_insertion_creates_a_sub_container() {
    let mut layout = DockLayout::new(Size::new(1000, 1000));
    let l1 = layout
        .add_guest(TestPane::new("l1", 100, 100), Location::Left, None)
        .expect("l1");
    let l2 = layout
        .add_guest(TestPane::new("l2", 100, 100), Location::Right, None)
        .expect("l2");
    let l2_width = layout.tree().geometry(l2).width;

    let l3 = layout
        .add_guest(TestPane::new("l3", 100, 100), Location::Bottom, Some(l2))
        .expect("l3");

    let tree = layout.tree();
    let sub = tree.parent(l2).expect("l2 reparented");
    assert_ne!(sub, tree.root());
    assert_eq!(tree.parent(l3), Some(sub));
    assert_eq!(tree.geometry(sub).width, l2_width);
    assert_eq!(tree.geometry(sub).height, 1000);
    assert_eq!(tree.geometry(l2).bottom() + ST, tree.geometry(l3).y);
    assert_eq!(tree.parent(l1), Some(tree.root()));
    assert!(layout.check_sanity());
}

#[test]
fn removing_a_pane_grows_its_neighbours() {
    let mut layout = DockLayout::new(Size::new(1000, 1000));
    let a = layout
        .add_guest(TestPane::new("a", 100, 100), Location::Top, None)
        .expect("a");
    let b = layout
        .add_guest(TestPane::new("b", 100, 100), Location::Bottom, None)
        .expect("b");
    let c = layout
        .add_guest(TestPane::new("c", 100, 100), Location::Bottom, None)
        .expect("c");

    let before = heights(&layout, &[a, b, c]);
    let freed = before[1] + ST;
    layout.remove_item(b, true).expect("remove b");

    let after = heights(&layout, &[a, c]);
    assert_eq!(after[0], before[0] + freed / 2);
    assert_eq!(after[1], before[2] + (freed - freed / 2));
    assert_eq!(after[0] + ST + after[1], 1000);
    assert!(layout.check_sanity());
}

#[test]
fn placeholder_restores_to_its_slot() {
    let mut layout = DockLayout::new(Size::new(1000, 1000));
    let pane1 = TestPane::new("l1", 100, 100);
    let l1 = layout
        .add_guest(pane1.clone(), Location::Left, None)
        .expect("l1");
    let l2 = layout
        .add_guest(TestPane::new("l2", 100, 100), Location::Right, None)
        .expect("l2");

    let w1 = layout.tree().geometry(l1).width;
    let w2 = layout.tree().geometry(l2).width;

    layout.turn_into_placeholder(l1).expect("hide l1");
    assert!(!pane1.visible.get());
    assert_eq!(layout.tree().geometry(l2).width, 1000);
    assert_eq!(layout.tree().num_visible_children(layout.tree().root()), 1);

    let replacement = TestPane::new("l1", 100, 100);
    layout.restore(l1, replacement.clone()).expect("restore l1");
    assert!(replacement.visible.get());
    assert_eq!(layout.tree().index_of_child(layout.tree().root(), l1), Some(0));
    assert!((layout.tree().geometry(l1).width - w1).abs() <= 1);
    assert!((layout.tree().geometry(l2).width - w2).abs() <= 1);
    assert!(layout.check_sanity());
}

#[test]
fn drop_rect_on_an_empty_root() {
    let layout = DockLayout::new(Size::new(2000, 1000));
    let rect = layout
        .suggested_drop_rect(Size::new(100, 100), None, Location::Left)
        .expect("left band");
    assert_eq!(rect, Rect::new(0, 0, (2000 / 3).max(100), 1000));
}

#[test]
fn insufficient_space_grows_the_root() {
    let mut layout = DockLayout::new(Size::new(1000, 1000));
    let l1 = layout
        .add_guest(TestPane::new("l1", 600, 500), Location::Left, None)
        .expect("l1");
    let l2 = layout
        .add_guest(TestPane::new("l2", 600, 500), Location::Right, None)
        .expect("l2 grows the root");

    assert!(layout.size().width >= 1200 + ST);
    assert_eq!(layout.size().height, 1000);
    assert_eq!(layout.tree().geometry(l1).width, 600);
    assert_eq!(layout.tree().geometry(l2).width, 600);
    assert!(layout.check_sanity());
}

#[test]
fn deep_nesting_keeps_every_level_sane() {
    // [1, 2, [3 | 3.2] over [3.1]] with a final top-level band on top.
    let mut layout = DockLayout::new(Size::new(1200, 1200));
    let _l1 = layout
        .add_guest(TestPane::new("1", 100, 100), Location::Left, None)
        .expect("1");
    let l2 = layout
        .add_guest(TestPane::new("2", 100, 100), Location::Right, None)
        .expect("2");
    let l3 = layout
        .add_guest(TestPane::new("3", 100, 100), Location::Right, Some(l2))
        .expect("3");
    let l31 = layout
        .add_guest(TestPane::new("3.1", 100, 100), Location::Bottom, Some(l3))
        .expect("3.1");
    let l32 = layout
        .add_guest(TestPane::new("3.2", 100, 100), Location::Right, Some(l3))
        .expect("3.2");
    let l4 = layout
        .add_guest(TestPane::new("4", 100, 100), Location::Top, None)
        .expect("4");

    let tree = layout.tree();
    let inner = tree.parent(l3).expect("inner");
    let outer = tree.parent(inner).expect("outer");
    assert_eq!(tree.parent(l32), Some(inner));
    assert_eq!(tree.parent(l31), Some(outer));
    assert_eq!(tree.geometry(l4).width, 1200);
    assert_eq!(tree.geometry(l4).pos().y, 0);
    assert!(layout.check_sanity());

    layout
        .resize_root(Size::new(2500, 900))
        .expect("resize deep tree");
    assert!(layout.check_sanity());
}

#[test]
fn removal_cascade_collapses_emptied_containers() {
    let mut layout = DockLayout::new(Size::new(1000, 1000));
    let l1 = layout
        .add_guest(TestPane::new("1", 100, 100), Location::Left, None)
        .expect("1");
    let l2 = layout
        .add_guest(TestPane::new("2", 100, 100), Location::Right, None)
        .expect("2");
    let l3 = layout
        .add_guest(TestPane::new("3", 100, 100), Location::Bottom, Some(l2))
        .expect("3");

    let sub = layout.tree().parent(l2).expect("sub-container");
    layout.remove_item(l3, true).expect("remove 3");
    assert!(layout.tree().contains(sub));
    layout.remove_item(l2, true).expect("remove 2");
    assert!(!layout.tree().contains(sub), "emptied container collapsed");
    assert_eq!(layout.tree().geometry(l1).width, 1000);
    assert!(layout.check_sanity());
}

#[test]
fn remove_and_reinsert_reproduces_the_layout() {
    let mut layout = DockLayout::new(Size::new(1000, 1000));
    let a = layout
        .add_guest(TestPane::new("a", 100, 100), Location::Left, None)
        .expect("a");
    let b = layout
        .add_guest(TestPane::new("b", 100, 100), Location::Right, None)
        .expect("b");
    let c = layout
        .add_guest(TestPane::new("c", 100, 100), Location::Right, None)
        .expect("c");

    let before = widths(&layout, &[a, b, c]);
    let b_size = layout.tree().geometry(b).size();
    layout.remove_item(b, true).expect("remove b");

    let b2 = layout
        .insert_guest(
            TestPane::new("b", 100, 100),
            Location::Right,
            Some(a),
            Some(b_size),
        )
        .expect("reinsert b");
    let after = widths(&layout, &[a, b2, c]);
    for (x, y) in before.iter().zip(&after) {
        assert!((x - y).abs() <= 1, "{before:?} vs {after:?}");
    }
    assert!(layout.check_sanity());
}

#[test]
fn eager_separator_drag_end_to_end() {
    let mut layout = DockLayout::new(Size::new(1000, 1000));
    let a = layout
        .add_guest(TestPane::new("a", 100, 100), Location::Left, None)
        .expect("a");
    let b = layout
        .add_guest(TestPane::new("b", 100, 100), Location::Right, None)
        .expect("b");
    let root = layout.tree().root();
    assert_eq!(layout.separator_count(root), 1);

    let w = widths(&layout, &[a, b]);
    let boundary = layout.tree().geometry(a).right();
    layout.begin_drag(root, 0, boundary).expect("press");
    layout.update_drag(boundary - 50, true).expect("drag left");
    assert!(layout.is_resizing());
    assert_eq!(widths(&layout, &[a, b]), vec![w[0] - 50, w[1] + 50]);
    layout.end_drag(boundary - 50, true).expect("release");
    assert!(!layout.is_resizing());
    assert!(layout.check_sanity());
}

#[test]
fn lazy_drag_with_pointer_loss_commits_the_last_position() {
    let mut layout = DockLayout::new(Size::new(1000, 1000));
    layout.set_resize_mode(ResizeMode::Lazy);
    let a = layout
        .add_guest(TestPane::new("a", 100, 100), Location::Left, None)
        .expect("a");
    let b = layout
        .add_guest(TestPane::new("b", 100, 100), Location::Right, None)
        .expect("b");
    let root = layout.tree().root();

    let w = widths(&layout, &[a, b]);
    let boundary = layout.tree().geometry(a).right();
    layout.begin_drag(root, 0, boundary).expect("press");
    layout.update_drag(boundary - 40, true).expect("rubber band");
    assert_eq!(widths(&layout, &[a, b]), w, "lazy mode defers");

    // The release event never arrives; a move reports the button up.
    layout.update_drag(boundary - 70, false).expect("lost release");
    assert!(!layout.is_resizing());
    assert_eq!(widths(&layout, &[a, b]), vec![w[0] - 40, w[1] + 40]);
    assert!(layout.check_sanity());
}

#[test]
fn detach_event_turns_the_leaf_into_a_placeholder() {
    let mut layout = DockLayout::new(Size::new(1000, 1000));
    let pane = TestPane::new("a", 100, 100);
    let a = layout
        .add_guest(pane.clone(), Location::Left, None)
        .expect("a");
    let b = layout
        .add_guest(TestPane::new("b", 100, 100), Location::Right, None)
        .expect("b");

    layout.guest_event(a, GuestEvent::Detached).expect("torn off");
    assert!(!layout.tree().is_visible(a));
    assert!(!pane.visible.get());
    assert_eq!(layout.tree().geometry(b).width, 1000);
    assert!(layout.check_sanity());
}

#[test]
fn min_size_change_reflows_the_layout() {
    let mut layout = DockLayout::new(Size::new(1000, 1000));
    let pane = TestPane::new("a", 100, 100);
    let a = layout
        .add_guest(pane.clone(), Location::Left, None)
        .expect("a");
    let _b = layout
        .add_guest(TestPane::new("b", 100, 100), Location::Right, None)
        .expect("b");

    pane.min.set(Size::new(900, 100));
    layout
        .guest_event(a, GuestEvent::MinSizeChanged)
        .expect("min grew");
    assert!(layout.tree().geometry(a).width >= 900);
    // 900 + 100 + separator does not fit in 1000, so the root grew.
    assert!(layout.size().width >= 900 + 100 + ST);
    assert!(layout.check_sanity());
}

#[test]
fn snapshot_round_trip_preserves_geometry() {
    let mut layout = DockLayout::new(Size::new(1000, 1000));
    let a = layout
        .add_guest(TestPane::new("a", 100, 100), Location::Left, None)
        .expect("a");
    let b = layout
        .add_guest(TestPane::new("b", 100, 100), Location::Right, None)
        .expect("b");
    let _c = layout
        .add_guest(TestPane::new("c", 100, 100), Location::Bottom, Some(b))
        .expect("c");
    layout.turn_into_placeholder(a).expect("hide a");

    let json = layout.save_layout_json();
    let mut restored = DockLayout::new(Size::new(1000, 1000));
    restored
        .restore_layout_json(&json, RestoreOptions::default())
        .expect("restore");
    assert!(restored.check_sanity());

    for id in layout.tree().leaves() {
        let guest_id = layout.tree().guest_id(id).expect("named leaf");
        let twin = restored.item_for_guest(&guest_id).expect("same leaf");
        assert_eq!(
            layout.tree().geometry_in_root(id),
            restored.tree().geometry_in_root(twin),
            "geometry of {guest_id}"
        );
        assert_eq!(
            layout.tree().is_visible(id),
            restored.tree().is_visible(twin),
            "visibility of {guest_id}"
        );
    }

    // The hidden pane can be rebound and restored in the new engine.
    let twin = restored.item_for_guest("a").expect("placeholder kept");
    restored
        .restore(twin, TestPane::new("a", 100, 100))
        .expect("restore placeholder");
    assert!(restored.check_sanity());
}

#[test]
fn snapshot_restores_rescaled_to_a_larger_host() {
    let mut layout = DockLayout::new(Size::new(1000, 1000));
    layout
        .add_guest(TestPane::new("a", 100, 100), Location::Left, None)
        .expect("a");
    layout
        .add_guest(TestPane::new("b", 100, 100), Location::Right, None)
        .expect("b");

    let snapshot = layout.save_layout();
    let mut restored = DockLayout::new(Size::new(2000, 1400));
    restored
        .restore_layout(
            &snapshot,
            RestoreOptions {
                relative_to_host_size: true,
            },
        )
        .expect("rescaled restore");
    assert_eq!(restored.size(), Size::new(2000, 1400));
    assert!(restored.check_sanity());

    let a = restored.item_for_guest("a").expect("a");
    assert_eq!(restored.tree().geometry(a).height, 1400);
}
