//! Resize propagation through a deeply nested split tree.

use std::hint::black_box;
use std::rc::Rc;

use criterion::{criterion_group, criterion_main, Criterion};
use dockpane_layout::{DockLayout, Guest, Location, Rect, Size};

struct BenchPane {
    id: String,
}

impl Guest for BenchPane {
    fn min_size(&self) -> Size {
        Size::new(80, 90)
    }

    fn set_geometry(&self, _rect: Rect) {}

    fn set_visible(&self, _visible: bool) {}

    fn stable_id(&self) -> String {
        self.id.clone()
    }
}

fn build_layout(panes: usize) -> DockLayout {
    let mut layout = DockLayout::new(Size::new(6000, 6000));
    let mut anchor = None;
    for i in 0..panes {
        // Alternate axes so every insertion nests one level deeper.
        let location = if i % 2 == 0 {
            Location::Right
        } else {
            Location::Bottom
        };
        let pane = Rc::new(BenchPane {
            id: format!("pane-{i}"),
        });
        let item = layout
            .add_guest(pane, location, anchor)
            .expect("bench layout must fit");
        anchor = Some(item);
    }
    assert!(layout.check_sanity());
    layout
}

fn bench_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("resize_propagation");
    for &panes in &[8usize, 24, 48] {
        let mut layout = build_layout(panes);
        let mut toggle = false;
        group.bench_function(format!("{panes}_panes"), |b| {
            b.iter(|| {
                toggle = !toggle;
                let size = if toggle {
                    Size::new(6400, 5800)
                } else {
                    Size::new(6000, 6000)
                };
                layout.resize_root(black_box(size)).expect("resize fits");
            });
        });
    }
    group.finish();
}

fn bench_save(c: &mut Criterion) {
    let layout = build_layout(32);
    c.bench_function("snapshot_save_32_panes", |b| {
        b.iter(|| black_box(layout.save_layout_json()));
    });
}

criterion_group!(benches, bench_resize, bench_save);
criterion_main!(benches);
