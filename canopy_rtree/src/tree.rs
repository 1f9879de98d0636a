// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The R-tree: immediate insertion, staged bulk loading, and queries.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;

use smallvec::SmallVec;

use crate::bulk;
use crate::config::{Config, ConfigError};
use crate::types::{Aabb, Scalar};

/// A bounding-box R-tree over opaque handles.
///
/// The tree stores `(handle, box)` pairs and answers rectangle and point
/// queries with the set of intersecting handles. Handles are uninterpreted
/// tokens: the tree stores and returns them but never looks inside, so a
/// handle is typically an index or id into caller-owned storage.
///
/// Entries can be added two ways:
///
/// - [`insert`][Self::insert] places an entry immediately, descending by
///   least bounding-box enlargement and splitting overfull nodes with the
///   quadratic heuristic.
/// - [`stage`][Self::stage] queues an entry; a later [`commit`][Self::commit]
///   packs everything staged (together with any entries already in the tree)
///   bottom-up into a tree with near-ideal occupancy. Staged entries are not
///   queryable until committed.
///
/// Result order within a query is deterministic for a given tree state but
/// otherwise unspecified; callers needing a canonical order should sort.
///
/// ```
/// use canopy_rtree::{Aabb, Config, RTree};
///
/// let mut tree: RTree<i32, u32> = RTree::with_config(Config::new(5, 16))?;
/// for i in 0..100 {
///     tree.stage(i, Aabb::from_xywh(i as i32 % 10 * 20, i as i32 / 10 * 20, 15, 15));
/// }
/// tree.commit();
///
/// let mut hits = Vec::new();
/// let n = tree.search(Aabb::new(0, 0, 30, 30), &mut hits);
/// assert_eq!(n, hits.len());
/// assert!(hits.contains(&0));
/// # Ok::<(), canopy_rtree::ConfigError>(())
/// ```
pub struct RTree<T: Scalar, H: Copy + Eq + Debug> {
    config: Config,
    arena: Vec<Node<T, H>>,
    root: Option<NodeIdx>,
    pending: Vec<(H, Aabb<T>)>,
    len: usize,
}

/// Arena-allocated tree node.
#[derive(Clone, Debug)]
pub(crate) struct Node<T, H> {
    pub(crate) bbox: Aabb<T>,
    pub(crate) children: Children<T, H>,
}

#[derive(Clone, Debug)]
pub(crate) enum Children<T, H> {
    /// Leaf entries, stored inline.
    Items(Vec<(H, Aabb<T>)>),
    /// Interior children, as arena indices.
    Nodes(Vec<NodeIdx>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct NodeIdx(usize);

impl NodeIdx {
    pub(crate) const fn new(i: usize) -> Self {
        Self(i)
    }

    pub(crate) const fn get(self) -> usize {
        self.0
    }
}

impl<T: Scalar, H: Copy + Eq + Debug> Default for RTree<T, H> {
    fn default() -> Self {
        // The default config satisfies its own fill constraints.
        Self {
            config: Config::default(),
            arena: Vec::new(),
            root: None,
            pending: Vec::new(),
            len: 0,
        }
    }
}

impl<T: Scalar, H: Copy + Eq + Debug> RTree<T, H> {
    /// Create an empty tree with the given fill bounds and default tuning.
    ///
    /// Fails with a [`ConfigError`] when the bounds violate the fill
    /// constraints (`min_children >= 1`, `max_children >= 2 * min_children`).
    pub fn new(min_children: usize, max_children: usize) -> Result<Self, ConfigError> {
        Self::with_config(Config::new(min_children, max_children))
    }

    /// Create an empty tree from a full [`Config`].
    pub fn with_config(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            arena: Vec::new(),
            root: None,
            pending: Vec::new(),
            len: 0,
        })
    }

    /// The configuration the tree was built with.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Number of committed entries (staged entries are not counted).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no committed entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of staged entries awaiting [`commit`][Self::commit].
    pub fn staged_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of levels, counting leaves; `0` for an empty tree.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut cursor = self.root;
        while let Some(idx) = cursor {
            height += 1;
            cursor = match &self.arena[idx.get()].children {
                Children::Items(_) => None,
                Children::Nodes(kids) => kids.first().copied(),
            };
        }
        height
    }

    /// Bounding box of all committed entries, if any.
    pub fn bounds(&self) -> Option<Aabb<T>> {
        self.root.map(|idx| self.arena[idx.get()].bbox)
    }

    /// Insert an entry immediately.
    ///
    /// Descends to the leaf whose bounding box needs the least area
    /// enlargement (ties broken by smaller resulting area), splitting
    /// overfull nodes on the way back up; a root split grows the tree by one
    /// level. The entry is queryable as soon as this returns.
    pub fn insert(&mut self, handle: H, aabb: Aabb<T>) {
        debug_assert!(aabb.is_sorted(), "insert requires a sorted box");
        match self.root {
            None => {
                let idx = NodeIdx::new(self.arena.len());
                self.arena.push(Node {
                    bbox: aabb,
                    children: Children::Items(vec![(handle, aabb)]),
                });
                self.root = Some(idx);
            }
            Some(root) => {
                if let Some(sibling) = self.insert_at(root, handle, aabb) {
                    let bbox = self.arena[root.get()]
                        .bbox
                        .union(self.arena[sibling.get()].bbox);
                    let new_root = NodeIdx::new(self.arena.len());
                    self.arena.push(Node {
                        bbox,
                        children: Children::Nodes(vec![root, sibling]),
                    });
                    self.root = Some(new_root);
                }
            }
        }
        self.len += 1;
    }

    /// Queue an entry for the next [`commit`][Self::commit].
    ///
    /// Staged entries are invisible to queries until committed.
    pub fn stage(&mut self, handle: H, aabb: Aabb<T>) {
        debug_assert!(aabb.is_sorted(), "stage requires a sorted box");
        self.pending.push((handle, aabb));
    }

    /// Fold all staged entries into the tree.
    ///
    /// A no-op when nothing is staged. Otherwise the staged entries and every
    /// committed entry are packed bottom-up into a fresh tree: with
    /// [`Config::sort_bulk_load`] the entries are ordered for spatial
    /// locality first (sort-tile-recursive), producing tight boxes and
    /// near-full nodes; without it they pack in arrival order, which builds
    /// faster but overlaps more. The live tree is replaced only once the
    /// rebuild is complete.
    pub fn commit(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let mut entries: Vec<(H, Aabb<T>)> = Vec::with_capacity(self.len + self.pending.len());
        for node in &self.arena {
            if let Children::Items(items) = &node.children {
                entries.extend_from_slice(items);
            }
        }
        entries.append(&mut self.pending);

        let mut arena = Vec::new();
        let root = bulk::pack(&mut arena, &mut entries, &self.config);
        self.len = entries.len();
        self.arena = arena;
        self.root = root;
    }

    /// Remove all entries, committed and staged, keeping the configuration.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
        self.pending.clear();
        self.len = 0;
    }

    /// Call `f` with the handle of every committed entry intersecting `query`.
    pub fn visit_rect<F: FnMut(H)>(&self, query: Aabb<T>, mut f: F) {
        debug_assert!(query.is_sorted(), "query requires a sorted box");
        let Some(root) = self.root else {
            return;
        };
        let mut stack: SmallVec<[NodeIdx; 32]> = SmallVec::new();
        stack.push(root);
        while let Some(idx) = stack.pop() {
            let node = &self.arena[idx.get()];
            if !node.bbox.intersects(&query) {
                continue;
            }
            match &node.children {
                Children::Items(items) => {
                    for &(handle, bbox) in items {
                        if bbox.intersects(&query) {
                            f(handle);
                        }
                    }
                }
                Children::Nodes(kids) => stack.extend(kids.iter().copied()),
            }
        }
    }

    /// Append every handle intersecting `query` to `out`; returns how many
    /// were appended. `out` is not cleared first.
    pub fn search(&self, query: Aabb<T>, out: &mut Vec<H>) -> usize {
        let start = out.len();
        self.visit_rect(query, |handle| out.push(handle));
        out.len() - start
    }

    /// Query for handles whose box intersects `query`.
    pub fn query_rect(&self, query: Aabb<T>) -> impl Iterator<Item = H> + '_ {
        let mut out = Vec::new();
        self.visit_rect(query, |handle| out.push(handle));
        out.into_iter()
    }

    /// Call `f` with the handle of every committed entry containing the point.
    pub fn visit_point<F: FnMut(H)>(&self, x: T, y: T, f: F) {
        self.visit_rect(Aabb::new(x, y, x, y), f);
    }

    /// Query for handles whose box contains the point (edges inclusive).
    pub fn query_point(&self, x: T, y: T) -> impl Iterator<Item = H> + '_ {
        let mut out = Vec::new();
        self.visit_point(x, y, |handle| out.push(handle));
        out.into_iter()
    }

    /// Insert below `node`; returns the index of a newly split-off sibling
    /// when `node` overflowed.
    fn insert_at(&mut self, node: NodeIdx, handle: H, aabb: Aabb<T>) -> Option<NodeIdx> {
        let i = node.get();
        self.arena[i].bbox = self.arena[i].bbox.union(aabb);

        let is_leaf = matches!(self.arena[i].children, Children::Items(_));
        if is_leaf {
            {
                let Children::Items(items) = &mut self.arena[i].children else {
                    unreachable!()
                };
                items.push((handle, aabb));
                if items.len() <= self.config.max_children {
                    return None;
                }
            }
            let items = match core::mem::replace(
                &mut self.arena[i].children,
                Children::Items(Vec::new()),
            ) {
                Children::Items(items) => items,
                Children::Nodes(_) => unreachable!(),
            };
            let (left, left_bbox, right, right_bbox) =
                quadratic_split(items, self.config.min_children, |entry: &(H, Aabb<T>)| {
                    entry.1
                });
            self.arena[i].children = Children::Items(left);
            self.arena[i].bbox = left_bbox;
            let sibling = NodeIdx::new(self.arena.len());
            self.arena.push(Node {
                bbox: right_bbox,
                children: Children::Items(right),
            });
            Some(sibling)
        } else {
            let chosen = {
                let Children::Nodes(kids) = &self.arena[i].children else {
                    unreachable!()
                };
                let mut best_pos = 0;
                let mut best: Option<(T::Acc, T::Acc)> = None;
                for (pos, &child) in kids.iter().enumerate() {
                    let child_bbox = self.arena[child.get()].bbox;
                    let grown = child_bbox.union(aabb);
                    let enlargement = grown.area() - child_bbox.area();
                    let resulting = grown.area();
                    let better = match best {
                        None => true,
                        Some((best_enlargement, best_resulting)) => {
                            if enlargement < best_enlargement {
                                true
                            } else if best_enlargement < enlargement {
                                false
                            } else {
                                resulting < best_resulting
                            }
                        }
                    };
                    if better {
                        best = Some((enlargement, resulting));
                        best_pos = pos;
                    }
                }
                kids[best_pos]
            };

            let sibling = self.insert_at(chosen, handle, aabb)?;
            {
                let Children::Nodes(kids) = &mut self.arena[i].children else {
                    unreachable!()
                };
                kids.push(sibling);
                if kids.len() <= self.config.max_children {
                    return None;
                }
            }
            let kids = match core::mem::replace(
                &mut self.arena[i].children,
                Children::Nodes(Vec::new()),
            ) {
                Children::Nodes(kids) => kids,
                Children::Items(_) => unreachable!(),
            };
            let (left, left_bbox, right, right_bbox) = {
                let arena = &self.arena;
                quadratic_split(kids, self.config.min_children, |idx: &NodeIdx| {
                    arena[idx.get()].bbox
                })
            };
            self.arena[i].children = Children::Nodes(left);
            self.arena[i].bbox = left_bbox;
            let sibling = NodeIdx::new(self.arena.len());
            self.arena.push(Node {
                bbox: right_bbox,
                children: Children::Nodes(right),
            });
            Some(sibling)
        }
    }
}

impl<T: Scalar, H: Copy + Eq + Debug> Debug for RTree<T, H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RTree")
            .field("min_children", &self.config.min_children)
            .field("max_children", &self.config.max_children)
            .field("len", &self.len)
            .field("staged", &self.pending.len())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

/// Split an overflowing child list in two with the quadratic heuristic.
///
/// Seeds are the pair of entries that would waste the most area if kept in
/// one node; the rest go to whichever group needs less enlargement (ties:
/// smaller area, then fewer members), except that a group short of
/// `min_children` takes everything once nothing can be spared.
fn quadratic_split<T, I, F>(
    mut items: Vec<I>,
    min_children: usize,
    bbox_of: F,
) -> (Vec<I>, Aabb<T>, Vec<I>, Aabb<T>)
where
    T: Scalar,
    F: Fn(&I) -> Aabb<T>,
{
    debug_assert!(items.len() >= 2, "split requires an overflowing node");
    let mut seed_a = 0;
    let mut seed_b = 1;
    let mut worst: Option<T::Acc> = None;
    for a in 0..items.len() {
        for b in (a + 1)..items.len() {
            let box_a = bbox_of(&items[a]);
            let box_b = bbox_of(&items[b]);
            let waste = box_a.union(box_b).area() - box_a.area() - box_b.area();
            if worst.is_none_or(|w| waste > w) {
                worst = Some(waste);
                seed_a = a;
                seed_b = b;
            }
        }
    }

    // seed_b > seed_a, so removing it first leaves seed_a in place.
    let item_b = items.swap_remove(seed_b);
    let item_a = items.swap_remove(seed_a);
    let mut left_bbox = bbox_of(&item_a);
    let mut right_bbox = bbox_of(&item_b);
    let mut left = vec![item_a];
    let mut right = vec![item_b];

    while let Some(item) = items.pop() {
        let up_for_grabs = items.len() + 1;
        if left.len() + up_for_grabs <= min_children {
            left_bbox = left_bbox.union(bbox_of(&item));
            left.push(item);
            continue;
        }
        if right.len() + up_for_grabs <= min_children {
            right_bbox = right_bbox.union(bbox_of(&item));
            right.push(item);
            continue;
        }

        let bb = bbox_of(&item);
        let left_grown = left_bbox.union(bb);
        let right_grown = right_bbox.union(bb);
        let grow_left = left_grown.area() - left_bbox.area();
        let grow_right = right_grown.area() - right_bbox.area();
        let to_left = if grow_left < grow_right {
            true
        } else if grow_right < grow_left {
            false
        } else if left_bbox.area() < right_bbox.area() {
            true
        } else if right_bbox.area() < left_bbox.area() {
            false
        } else {
            left.len() <= right.len()
        };
        if to_left {
            left_bbox = left_grown;
            left.push(item);
        } else {
            right_bbox = right_grown;
            right.push(item);
        }
    }
    (left, left_bbox, right, right_bbox)
}

/// Convenience aliases matching the coordinate types the tree is used with.
/// R-tree with i32 coordinates and i64 metrics.
pub type RTreeI32<H> = RTree<i32, H>;

/// R-tree with i64 coordinates and i128 metrics.
pub type RTreeI64<H> = RTree<i64, H>;

/// R-tree with f32 coordinates and f64 metrics.
pub type RTreeF32<H> = RTree<f32, H>;

/// R-tree with f64 coordinates and f64 metrics.
pub type RTreeF64<H> = RTree<f64, H>;

#[cfg(test)]
impl<T: Scalar, H: Copy + Eq + Debug> RTree<T, H> {
    /// Assert the structural invariants: exact bounding boxes, fill bounds,
    /// and uniform leaf depth.
    pub(crate) fn check_invariants(&self) {
        if let Some(root) = self.root {
            let height = self.height();
            let counted = self.check_node(root, true, height);
            assert_eq!(counted, self.len, "len matches the entries reachable");
        } else {
            assert_eq!(self.len, 0, "empty tree has no entries");
        }
    }

    fn check_node(&self, idx: NodeIdx, is_root: bool, levels_below: usize) -> usize {
        let node = &self.arena[idx.get()];
        match &node.children {
            Children::Items(items) => {
                assert_eq!(levels_below, 1, "all leaves sit at the same depth");
                assert!(!items.is_empty(), "leaf holds at least one entry");
                if !is_root {
                    assert!(
                        items.len() >= self.config.min_children,
                        "non-root leaf meets the minimum fill"
                    );
                }
                assert!(
                    items.len() <= self.config.max_children,
                    "leaf within branching factor"
                );
                let mut bbox = items[0].1;
                for &(_, bb) in &items[1..] {
                    bbox = bbox.union(bb);
                }
                assert_eq!(node.bbox, bbox, "leaf bbox is the exact union");
                items.len()
            }
            Children::Nodes(kids) => {
                assert!(!kids.is_empty(), "interior node has children");
                if !is_root {
                    assert!(
                        kids.len() >= self.config.min_children,
                        "non-root node meets the minimum fill"
                    );
                } else {
                    assert!(kids.len() >= 2, "interior root has at least two children");
                }
                assert!(
                    kids.len() <= self.config.max_children,
                    "node within branching factor"
                );
                let mut bbox = self.arena[kids[0].get()].bbox;
                let mut count = 0;
                for &kid in kids {
                    bbox = bbox.union(self.arena[kid.get()].bbox);
                    count += self.check_node(kid, false, levels_below - 1);
                }
                assert_eq!(node.bbox, bbox, "node bbox is the exact union");
                count
            }
        }
    }
}
