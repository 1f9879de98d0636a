// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy R-tree: a bounding-box hierarchy for 2D hit testing and culling.
//!
//! The tree maps opaque handles to axis-aligned bounding boxes and answers
//! rectangle/point queries with the intersecting handles. It is a building
//! block for scene-graph culling, hit testing, and clip acceleration; the
//! caller owns whatever the handles refer to and the tree never looks inside
//! them.
//!
//! - [`RTree::insert`] places one entry at a time with least-enlargement
//!   descent and quadratic node splits.
//! - [`RTree::stage`] + [`RTree::commit`] batch entries and bulk-load them
//!   bottom-up, producing near-full nodes and tight boxes. Sorting before the
//!   bulk load is configurable: see [`Config::sort_bulk_load`].
//! - [`RTree::search`] / [`RTree::query_rect`] / [`RTree::query_point`]
//!   report every intersecting entry; a miss is an empty result, not an
//!   error.
//! - [`RTree::clear`] empties the tree for reuse without touching its
//!   configuration.
//!
//! Fill bounds are fixed at construction and validated there: see
//! [`Config`] and [`ConfigError`].
//!
//! # Example
//!
//! ```rust
//! use canopy_rtree::{Aabb, RTree};
//!
//! let mut tree: RTree<i32, u32> = RTree::new(5, 16)?;
//! tree.insert(1, Aabb::new(0, 0, 10, 10));
//! tree.insert(2, Aabb::new(40, 40, 60, 60));
//!
//! let hits: Vec<u32> = tree.query_rect(Aabb::new(5, 5, 20, 20)).collect();
//! assert_eq!(hits, vec![1]);
//! assert_eq!(tree.query_point(50, 50).count(), 1);
//! # Ok::<(), canopy_rtree::ConfigError>(())
//! ```
//!
//! # Threading
//!
//! The tree has no interior synchronization. Wrap it in a lock to share it:
//! one writer during `insert`/`commit`, any number of readers during
//! queries.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod bulk;
mod config;
mod tree;
mod types;
pub(crate) mod util;

pub use config::{Config, ConfigError};
pub use tree::{RTree, RTreeF32, RTreeF64, RTreeI32, RTreeI64};
pub use types::{Aabb, Scalar, ScalarAcc};
