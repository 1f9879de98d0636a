// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy pixel cache: a budgeted LRU cache for decoded pixel buffers.
//!
//! Decoding images is expensive and the results are large, so hosts keep a
//! bounded pool of decoded pixels and age out the least recently used buffers
//! when the pool runs over budget. The one wrinkle is that a buffer being
//! drawn from must not disappear mid-draw: callers *pin* a buffer while they
//! use it, and eviction only ever removes buffers with zero outstanding pins.
//!
//! All cache mutations (insert, pin, release, evict, budget changes) are
//! serialized behind a single mutex, so the cache is freely shareable across
//! threads.
//!
//! ```rust
//! use canopy_pixel_cache::LruPixelCache;
//!
//! let cache = LruPixelCache::new(1024);
//! let (id, pixels) = cache.insert_and_pin(vec![0u8; 400]);
//! assert_eq!(pixels.len(), 400);
//! drop(pixels); // releases the pin
//!
//! // Re-pin later; `None` would mean the buffer has been evicted.
//! let again = cache.pin(id).unwrap();
//! assert_eq!(again.len(), 400);
//! ```

mod cache;

pub use cache::{CacheStatus, LruPixelCache, PixelId, Pinned};
