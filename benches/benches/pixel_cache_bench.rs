// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Insert/pin/release churn for the pixel cache.

use std::hint::black_box;

use canopy_pixel_cache::LruPixelCache;
use criterion::{Criterion, criterion_group, criterion_main};

const TILE_BYTES: usize = 16 * 1024;

fn bench_pin_release(c: &mut Criterion) {
    let cache = LruPixelCache::new(64 * TILE_BYTES);
    let (id, pin) = cache.insert_and_pin(vec![0u8; TILE_BYTES]);
    drop(pin);

    c.bench_function("pixel_cache_pin_release", |b| {
        b.iter(|| {
            let pinned = cache.pin(id).expect("entry stays cached");
            black_box(pinned.len());
        });
    });
}

fn bench_insert_under_pressure(c: &mut Criterion) {
    // A budget of four tiles forces an eviction on nearly every insert.
    c.bench_function("pixel_cache_insert_evict", |b| {
        let cache = LruPixelCache::new(4 * TILE_BYTES);
        b.iter(|| {
            let (id, pin) = cache.insert_and_pin(vec![0u8; TILE_BYTES]);
            drop(pin);
            black_box(id);
        });
    });
}

criterion_group!(benches, bench_pin_release, bench_insert_under_pressure);
criterion_main!(benches);
