// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bottom-up bulk packing for [`commit`][crate::RTree::commit].

use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt::Debug;

use crate::config::Config;
use crate::tree::{Children, Node, NodeIdx};
use crate::types::{Aabb, Scalar};
use crate::util::isqrt_ceil;

/// Pack `entries` into a fresh tree, appending nodes to `arena`.
///
/// With [`Config::sort_bulk_load`] the entries are arranged
/// sort-tile-recursive: ordered by x-centroid, cut into roughly square
/// vertical slices (shaped by [`Config::grid_aspect`]), and each slice
/// ordered by y-centroid before leaves are cut. The same arrangement repeats
/// per interior level. Without the flag everything packs in arrival order.
///
/// Groups are cut to even sizes rather than greedily filling, so trailing
/// nodes never fall below the minimum fill.
pub(crate) fn pack<T: Scalar, H: Copy + Eq + Debug>(
    arena: &mut Vec<Node<T, H>>,
    entries: &mut [(H, Aabb<T>)],
    config: &Config,
) -> Option<NodeIdx> {
    if entries.is_empty() {
        return None;
    }

    // Leaf level.
    let mut level: Vec<NodeIdx> = Vec::with_capacity(entries.len().div_ceil(config.max_children));
    if config.sort_bulk_load {
        entries.sort_unstable_by(|a, b| cmp_scalar(a.1.center_x(), b.1.center_x()));
        let mut start = 0;
        for slice_len in even_parts(entries.len(), slice_count(entries.len(), config)) {
            let slice = &mut entries[start..start + slice_len];
            start += slice_len;
            slice.sort_unstable_by(|a, b| cmp_scalar(a.1.center_y(), b.1.center_y()));
            push_leaves(arena, slice, config, &mut level);
        }
    } else {
        push_leaves(arena, entries, config, &mut level);
    }

    // Interior levels, until a single root remains.
    while level.len() > 1 {
        let mut next: Vec<NodeIdx> = Vec::with_capacity(level.len().div_ceil(config.max_children));
        if config.sort_bulk_load {
            level.sort_unstable_by(|a, b| {
                cmp_scalar(arena[a.get()].bbox.center_x(), arena[b.get()].bbox.center_x())
            });
            let mut start = 0;
            for slice_len in even_parts(level.len(), slice_count(level.len(), config)) {
                let slice = &mut level[start..start + slice_len];
                start += slice_len;
                slice.sort_unstable_by(|a, b| {
                    cmp_scalar(arena[a.get()].bbox.center_y(), arena[b.get()].bbox.center_y())
                });
            }
        }
        let mut start = 0;
        for group_len in group_sizes(level.len(), config.max_children) {
            let group = &level[start..start + group_len];
            start += group_len;
            let mut bbox = arena[group[0].get()].bbox;
            for &kid in &group[1..] {
                bbox = bbox.union(arena[kid.get()].bbox);
            }
            let idx = NodeIdx::new(arena.len());
            arena.push(Node {
                bbox,
                children: Children::Nodes(group.to_vec()),
            });
            next.push(idx);
        }
        level = next;
    }
    level.first().copied()
}

/// Cut a run of entries into leaves of even size.
fn push_leaves<T: Scalar, H: Copy + Eq + Debug>(
    arena: &mut Vec<Node<T, H>>,
    entries: &[(H, Aabb<T>)],
    config: &Config,
    level: &mut Vec<NodeIdx>,
) {
    let mut start = 0;
    for leaf_len in group_sizes(entries.len(), config.max_children) {
        let chunk = &entries[start..start + leaf_len];
        start += leaf_len;
        let mut bbox = chunk[0].1;
        for &(_, bb) in &chunk[1..] {
            bbox = bbox.union(bb);
        }
        let idx = NodeIdx::new(arena.len());
        arena.push(Node {
            bbox,
            children: Children::Items(chunk.to_vec()),
        });
        level.push(idx);
    }
}

fn cmp_scalar<T: PartialOrd>(a: T, b: T) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Number of vertical slices for a level of `n` units.
///
/// Aims for `grid_aspect` times as many columns as rows of groups, and caps
/// the count so every slice holds at least `min_children` units.
fn slice_count(n: usize, config: &Config) -> usize {
    let groups = n.div_ceil(config.max_children);
    let by_aspect = isqrt_ceil(groups.saturating_mul(config.grid_aspect));
    let fill_cap = (n / config.min_children).max(1);
    by_aspect.clamp(1, fill_cap)
}

/// Sizes of `parts` contiguous runs covering `n` units, as even as possible.
fn even_parts(n: usize, parts: usize) -> impl Iterator<Item = usize> {
    let base = n / parts;
    let extra = n % parts;
    (0..parts).map(move |i| if i < extra { base + 1 } else { base })
}

/// Sizes of the minimal number of groups of at most `cap`, evenly filled.
///
/// Even filling keeps every group at `floor(cap / 2)` or more once `n > cap`,
/// which is what lets packed nodes honor the minimum fill.
fn group_sizes(n: usize, cap: usize) -> impl Iterator<Item = usize> {
    even_parts(n, n.div_ceil(cap))
}
