// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Viewport culling over a recorded scene: R-tree + bit set.
//!
//! Records a grid of rectangles, bulk-loads their world-space bounds into an
//! R-tree, then culls against a sliding viewport, tracking the visible set in
//! a `BitSet`.
//!
//! Run:
//! - `cargo run -p canopy_demos --example scene_culling`

use canopy_bitset::BitSet;
use canopy_rtree::{Aabb, Config, RTree};
use kurbo::Rect;

/// One recorded draw: an id and its world-space bounds.
struct Command {
    id: u32,
    bounds: Rect,
}

fn aabb_of(rect: Rect) -> Aabb<f64> {
    Aabb::new(rect.x0, rect.y0, rect.x1, rect.y1)
}

fn main() {
    // A 40x25 grid of slightly overlapping rectangles.
    let mut scene = Vec::new();
    for row in 0..25u32 {
        for col in 0..40u32 {
            let id = row * 40 + col;
            let origin = (f64::from(col) * 24.0, f64::from(row) * 24.0);
            scene.push(Command {
                id,
                bounds: Rect::from_origin_size(origin, (30.0, 30.0)),
            });
        }
    }

    // Bulk-load: stage everything, then commit once.
    let mut tree: RTree<f64, u32> =
        RTree::with_config(Config::new(5, 16)).expect("fill bounds are valid");
    for cmd in &scene {
        tree.stage(cmd.id, aabb_of(cmd.bounds));
    }
    tree.commit();
    println!(
        "indexed {} commands, tree height {}, bounds {:?}",
        tree.len(),
        tree.height(),
        tree.bounds()
    );

    // Slide a viewport across the scene and cull.
    let mut visible = BitSet::new(scene.len());
    for step in 0..4 {
        let viewport = Rect::from_origin_size((f64::from(step) * 200.0, 100.0), (320.0, 240.0));
        let mut hits = Vec::new();
        let count = tree.search(aabb_of(viewport), &mut hits);
        for id in hits {
            visible.set(id as usize, true);
        }
        println!("viewport {step}: {count} commands visible");
    }
    println!(
        "{} of {} commands were visible in at least one viewport",
        visible.count_ones(),
        visible.len()
    );

    // Point hit-test, e.g. for picking under a cursor.
    let cursor = (500.0, 300.0);
    let picked: Vec<u32> = tree.query_point(cursor.0, cursor.1).collect();
    println!("{} commands under the cursor at {cursor:?}", picked.len());
}
