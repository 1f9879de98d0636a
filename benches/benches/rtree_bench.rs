// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Build and query micro-benchmarks for the R-tree.
//!
//! Rectangles are confined to a smallish area so queries generally hit
//! something and overlap occurs.

use std::hint::black_box;

use canopy_rtree::{Aabb, Config, RTree};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const GENERATE_EXTENTS: i32 = 1000;
const NUM_BUILD_RECTS: usize = 500;
const NUM_QUERY_RECTS: usize = 5000;
const GRID_WIDTH: i32 = 100;

type MakeRect = fn(&mut SmallRng, i32) -> Aabb<i32>;

fn xy_ordered(rng: &mut SmallRng, index: i32) -> Aabb<i32> {
    let x0 = index % GRID_WIDTH;
    let y0 = index / GRID_WIDTH;
    Aabb::new(
        x0,
        y0,
        x0 + 1 + rng.gen_range(0..GENERATE_EXTENTS / 3),
        y0 + 1 + rng.gen_range(0..GENERATE_EXTENTS / 3),
    )
}

fn yx_ordered(rng: &mut SmallRng, index: i32) -> Aabb<i32> {
    let x0 = index / GRID_WIDTH;
    let y0 = index % GRID_WIDTH;
    Aabb::new(
        x0,
        y0,
        x0 + 1 + rng.gen_range(0..GENERATE_EXTENTS / 3),
        y0 + 1 + rng.gen_range(0..GENERATE_EXTENTS / 3),
    )
}

fn random_rects(rng: &mut SmallRng, _index: i32) -> Aabb<i32> {
    let x0 = rng.gen_range(-GENERATE_EXTENTS..GENERATE_EXTENTS);
    let y0 = rng.gen_range(-GENERATE_EXTENTS..GENERATE_EXTENTS);
    Aabb::new(
        x0,
        y0,
        x0 + 1 + rng.gen_range(0..GENERATE_EXTENTS / 5),
        y0 + 1 + rng.gen_range(0..GENERATE_EXTENTS / 5),
    )
}

fn concentric(_rng: &mut SmallRng, index: i32) -> Aabb<i32> {
    Aabb::new(0, 0, index + 1, index + 1)
}

const GENERATORS: [(&str, MakeRect); 4] = [
    ("xy_ordered", xy_ordered),
    ("yx_ordered", yx_ordered),
    ("random", random_rects),
    ("concentric", concentric),
];

fn build_config() -> Config {
    Config::new(5, 16)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("rtree_build");
    for (name, make_rect) in GENERATORS {
        group.bench_function(BenchmarkId::new("immediate", name), move |b| {
            b.iter(|| {
                let mut rng = SmallRng::seed_from_u64(0xC0FFEE);
                let mut tree: RTree<i32, usize> =
                    RTree::with_config(build_config()).expect("valid config");
                for i in 0..NUM_BUILD_RECTS {
                    tree.insert(i, make_rect(&mut rng, i as i32));
                }
                black_box(tree.len());
            });
        });
        group.bench_function(BenchmarkId::new("staged_sorted", name), move |b| {
            b.iter(|| {
                let mut rng = SmallRng::seed_from_u64(0xC0FFEE);
                let mut tree: RTree<i32, usize> =
                    RTree::with_config(build_config()).expect("valid config");
                for i in 0..NUM_BUILD_RECTS {
                    tree.stage(i, make_rect(&mut rng, i as i32));
                }
                tree.commit();
                black_box(tree.len());
            });
        });
        group.bench_function(BenchmarkId::new("staged_unsorted", name), move |b| {
            b.iter(|| {
                let mut rng = SmallRng::seed_from_u64(0xC0FFEE);
                let mut tree: RTree<i32, usize> =
                    RTree::with_config(build_config().unsorted_bulk_load()).expect("valid config");
                for i in 0..NUM_BUILD_RECTS {
                    tree.stage(i, make_rect(&mut rng, i as i32));
                }
                tree.commit();
                black_box(tree.len());
            });
        });
    }
    group.finish();
}

fn query_tree(sorted: bool) -> RTree<i32, usize> {
    let config = if sorted {
        build_config()
    } else {
        build_config().unsorted_bulk_load()
    };
    let mut rng = SmallRng::seed_from_u64(0xBBB0);
    let mut tree = RTree::with_config(config).expect("valid config");
    for i in 0..NUM_QUERY_RECTS {
        tree.stage(i, random_rects(&mut rng, i as i32));
    }
    tree.commit();
    tree
}

fn small_query(rng: &mut SmallRng) -> Aabb<i32> {
    let x0 = rng.gen_range(0..GENERATE_EXTENTS);
    let y0 = rng.gen_range(0..GENERATE_EXTENTS);
    Aabb::new(x0, y0, x0 + GENERATE_EXTENTS / 20, y0 + GENERATE_EXTENTS / 20)
}

fn large_query(rng: &mut SmallRng) -> Aabb<i32> {
    let x0 = rng.gen_range(0..GENERATE_EXTENTS);
    let y0 = rng.gen_range(0..GENERATE_EXTENTS);
    Aabb::new(x0, y0, x0 + GENERATE_EXTENTS / 2, y0 + GENERATE_EXTENTS / 2)
}

fn random_query(rng: &mut SmallRng) -> Aabb<i32> {
    let x0 = rng.gen_range(0..GENERATE_EXTENTS);
    let y0 = rng.gen_range(0..GENERATE_EXTENTS);
    Aabb::new(
        x0,
        y0,
        x0 + 1 + rng.gen_range(0..GENERATE_EXTENTS / 2),
        y0 + 1 + rng.gen_range(0..GENERATE_EXTENTS / 2),
    )
}

fn full_query(_rng: &mut SmallRng) -> Aabb<i32> {
    Aabb::new(
        -GENERATE_EXTENTS,
        -GENERATE_EXTENTS,
        2 * GENERATE_EXTENTS,
        2 * GENERATE_EXTENTS,
    )
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("rtree_query");
    let shapes: [(&str, fn(&mut SmallRng) -> Aabb<i32>); 4] = [
        ("small", small_query),
        ("large", large_query),
        ("random", random_query),
        ("full", full_query),
    ];
    for (variant, sorted) in [("sorted", true), ("unsorted", false)] {
        let tree = query_tree(sorted);
        for (shape, make_query) in shapes {
            let tree = &tree;
            let mut rng = SmallRng::seed_from_u64(0xDEC0DE);
            group.bench_function(BenchmarkId::new(shape, variant), move |b| {
                b.iter(|| {
                    let mut hits = Vec::new();
                    tree.search(make_query(&mut rng), &mut hits);
                    black_box(hits.len());
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_query);
criterion_main!(benches);
