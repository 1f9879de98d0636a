// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pin-gated pixel caching under a byte budget.
//!
//! Simulates decoding tiles into a bounded pixel cache: pinned tiles survive
//! eviction no matter the budget pressure, unpinned tiles age out least
//! recently used first.
//!
//! Run:
//! - `cargo run -p canopy_demos --example pixel_budget`

use canopy_pixel_cache::LruPixelCache;

const TILE_BYTES: usize = 64 * 64 * 4;

fn main() {
    // Room for roughly six tiles.
    let cache = LruPixelCache::new(6 * TILE_BYTES);

    // "Decode" ten tiles; each is released as soon as it is drawn.
    let mut ids = Vec::new();
    for tile in 0..10u8 {
        let (id, pixels) = cache.insert_and_pin(vec![tile; TILE_BYTES]);
        ids.push(id);
        drop(pixels);
    }
    println!(
        "after decoding 10 tiles: {} cached, {} of {} bytes in use",
        cache.len(),
        cache.used_bytes(),
        cache.budget()
    );

    // The oldest tiles were evicted; recent tiles re-pin without a decode.
    let hits = ids.iter().filter(|&&id| cache.pin(id).is_some()).count();
    println!("{hits} of 10 tiles still cached");

    // A pinned tile survives even a budget collapse.
    let keep = cache.pin(*ids.last().expect("ten tiles were decoded"));
    cache.set_budget(0);
    println!(
        "budget dropped to zero: {} bytes still resident (pinned)",
        cache.used_bytes()
    );
    drop(keep);
    println!("pin released: {} bytes resident", cache.used_bytes());
}
