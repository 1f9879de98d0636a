// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The cache proper: slot storage, recency list, and pin accounting.

use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;

/// Identifier of a cached pixel buffer.
///
/// Ids are unique over the lifetime of a cache and are never reused, so a
/// stale id after eviction simply fails to pin.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PixelId(u64);

/// Whether a cached buffer currently has outstanding pins.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    /// At least one [`Pinned`] guard is alive; the buffer cannot be evicted.
    Pinned,
    /// No outstanding pins; the buffer is eligible for eviction.
    Unpinned,
}

/// Budgeted LRU cache of pixel buffers.
///
/// The budget bounds the total bytes of cached pixels. Exceeding it triggers
/// eviction from the least recently used end, skipping pinned buffers; a
/// cache whose pinned buffers alone exceed the budget stays over budget
/// until pins are released.
pub struct LruPixelCache {
    inner: Mutex<Inner>,
}

/// RAII pin on a cached buffer.
///
/// Derefs to the pixel bytes. The pin is released when the guard drops;
/// releasing the last pin makes the buffer evictable again and, if the cache
/// is over budget, triggers a purge pass.
pub struct Pinned<'a> {
    cache: &'a LruPixelCache,
    id: PixelId,
    data: Arc<[u8]>,
}

struct Inner {
    budget: usize,
    used: usize,
    next_id: u64,
    /// id -> slot in `slots`.
    map: HashMap<u64, usize>,
    slots: Vec<Option<Entry>>,
    free: Vec<usize>,
    /// Most recently used.
    head: Option<usize>,
    /// Least recently used.
    tail: Option<usize>,
}

struct Entry {
    id: u64,
    data: Arc<[u8]>,
    pins: u32,
    /// Toward `head`.
    prev: Option<usize>,
    /// Toward `tail`.
    next: Option<usize>,
}

impl LruPixelCache {
    /// Create a cache bounded to `budget` bytes of pixel data.
    pub fn new(budget: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                budget,
                used: 0,
                next_id: 1,
                map: HashMap::new(),
                slots: Vec::new(),
                free: Vec::new(),
                head: None,
                tail: None,
            }),
        }
    }

    /// The current byte budget.
    pub fn budget(&self) -> usize {
        self.inner.lock().budget
    }

    /// Total bytes of cached pixel data, pinned and unpinned.
    pub fn used_bytes(&self) -> usize {
        self.inner.lock().used
    }

    /// Number of cached buffers.
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    /// Whether the cache holds no buffers.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().map.is_empty()
    }

    /// Change the budget, evicting unpinned buffers as needed to fit.
    pub fn set_budget(&self, budget: usize) {
        let mut inner = self.inner.lock();
        log::trace!(
            "pixel cache budget {} -> {} bytes ({} in use)",
            inner.budget,
            budget,
            inner.used
        );
        inner.budget = budget;
        inner.purge_to(budget);
    }

    /// Add a buffer and pin it at the most-recently-used position.
    ///
    /// The insert may push the cache over budget; unpinned buffers are
    /// evicted to compensate, but the new buffer itself is pinned and stays.
    pub fn insert_and_pin(&self, pixels: Vec<u8>) -> (PixelId, Pinned<'_>) {
        let data: Arc<[u8]> = Arc::from(pixels);
        let bytes = data.len();
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        let entry = Entry {
            id,
            data: Arc::clone(&data),
            pins: 1,
            prev: None,
            next: None,
        };
        let slot = match inner.free.pop() {
            Some(slot) => {
                inner.slots[slot] = Some(entry);
                slot
            }
            None => {
                inner.slots.push(Some(entry));
                inner.slots.len() - 1
            }
        };
        inner.map.insert(id, slot);
        inner.push_front(slot);
        inner.used += bytes;
        let limit = inner.budget;
        inner.purge_to(limit);

        (
            PixelId(id),
            Pinned {
                cache: self,
                id: PixelId(id),
                data,
            },
        )
    }

    /// Pin an existing buffer, refreshing its recency.
    ///
    /// Returns `None` once the buffer has been evicted or removed.
    pub fn pin(&self, id: PixelId) -> Option<Pinned<'_>> {
        let mut inner = self.inner.lock();
        let slot = *inner.map.get(&id.0)?;
        inner.unlink(slot);
        inner.push_front(slot);
        let entry = inner.entry_mut(slot);
        entry.pins += 1;
        let data = Arc::clone(&entry.data);
        Some(Pinned {
            cache: self,
            id,
            data,
        })
    }

    /// Drop a buffer the caller knows it will not ask for again.
    ///
    /// Refused (returns `false`) while the buffer is pinned; eviction and
    /// removal both gate on pins.
    pub fn remove(&self, id: PixelId) -> bool {
        let mut inner = self.inner.lock();
        let Some(&slot) = inner.map.get(&id.0) else {
            return false;
        };
        if inner.entry(slot).pins > 0 {
            return false;
        }
        inner.evict(slot);
        true
    }

    /// The pin state of a buffer, or `None` if it is no longer cached.
    pub fn cache_status(&self, id: PixelId) -> Option<CacheStatus> {
        let inner = self.inner.lock();
        let &slot = inner.map.get(&id.0)?;
        Some(if inner.entry(slot).pins > 0 {
            CacheStatus::Pinned
        } else {
            CacheStatus::Unpinned
        })
    }

    fn release(&self, id: PixelId) {
        let mut inner = self.inner.lock();
        let Some(&slot) = inner.map.get(&id.0) else {
            return;
        };
        let pins = {
            let entry = inner.entry_mut(slot);
            debug_assert!(entry.pins > 0, "release without an outstanding pin");
            entry.pins -= 1;
            entry.pins
        };
        if pins == 0 && inner.used > inner.budget {
            let limit = inner.budget;
            inner.purge_to(limit);
        }
    }
}

impl Inner {
    fn entry(&self, slot: usize) -> &Entry {
        self.slots[slot]
            .as_ref()
            .expect("cache invariant violated: list references vacant slot")
    }

    fn entry_mut(&mut self, slot: usize) -> &mut Entry {
        self.slots[slot]
            .as_mut()
            .expect("cache invariant violated: list references vacant slot")
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = {
            let entry = self.entry(slot);
            (entry.prev, entry.next)
        };
        match prev {
            Some(p) => self.entry_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.entry_mut(n).prev = prev,
            None => self.tail = prev,
        }
        let entry = self.entry_mut(slot);
        entry.prev = None;
        entry.next = None;
    }

    fn push_front(&mut self, slot: usize) {
        let old_head = self.head;
        {
            let entry = self.entry_mut(slot);
            entry.prev = None;
            entry.next = old_head;
        }
        if let Some(h) = old_head {
            self.entry_mut(h).prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }

    /// Evict unpinned buffers, least recently used first, until `used` is at
    /// or below `limit` or nothing more is evictable.
    fn purge_to(&mut self, limit: usize) {
        let mut cursor = self.tail;
        while self.used > limit {
            let Some(slot) = cursor else {
                break;
            };
            let (prev, pins) = {
                let entry = self.entry(slot);
                (entry.prev, entry.pins)
            };
            if pins == 0 {
                self.evict(slot);
            }
            cursor = prev;
        }
    }

    fn evict(&mut self, slot: usize) {
        self.unlink(slot);
        let entry = self.slots[slot]
            .take()
            .expect("cache invariant violated: evicting vacant slot");
        debug_assert_eq!(entry.pins, 0, "evicting a pinned buffer");
        self.map.remove(&entry.id);
        self.used -= entry.data.len();
        self.free.push(slot);
        log::debug!(
            "evicted {} byte buffer (id {}), {} of {} bytes in use",
            entry.data.len(),
            entry.id,
            self.used,
            self.budget
        );
    }
}

impl Deref for Pinned<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl Pinned<'_> {
    /// The id of the pinned buffer, for re-pinning later.
    pub fn id(&self) -> PixelId {
        self.id
    }
}

impl Drop for Pinned<'_> {
    fn drop(&mut self) {
        self.cache.release(self.id);
    }
}

impl Debug for Pinned<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pinned")
            .field("id", &self.id)
            .field("bytes", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl Debug for LruPixelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("LruPixelCache")
            .field("budget", &inner.budget)
            .field("used", &inner.used)
            .field("buffers", &inner.map.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheStatus, LruPixelCache};
    use std::sync::Arc;

    #[test]
    fn pin_release_and_repin() {
        let cache = LruPixelCache::new(1000);
        let (id, pixels) = cache.insert_and_pin(vec![7u8; 100]);
        assert_eq!(&pixels[..3], &[7, 7, 7]);
        assert_eq!(cache.cache_status(id), Some(CacheStatus::Pinned));
        drop(pixels);
        assert_eq!(cache.cache_status(id), Some(CacheStatus::Unpinned));

        let again = cache.pin(id).unwrap();
        assert_eq!(again.len(), 100);
        assert_eq!(again.id(), id);
    }

    #[test]
    fn unpinned_lru_entries_age_out() {
        let cache = LruPixelCache::new(250);
        let (a, pin_a) = cache.insert_and_pin(vec![0u8; 100]);
        drop(pin_a);
        let (b, pin_b) = cache.insert_and_pin(vec![0u8; 100]);
        drop(pin_b);
        // A third buffer pushes past the budget; `a` is the oldest unpinned.
        let (c, pin_c) = cache.insert_and_pin(vec![0u8; 100]);
        drop(pin_c);

        assert!(cache.pin(a).is_none(), "oldest buffer was evicted");
        assert!(cache.pin(b).is_some());
        assert!(cache.pin(c).is_some());
        assert!(cache.used_bytes() <= 250);
    }

    #[test]
    fn pinning_refreshes_recency() {
        let cache = LruPixelCache::new(250);
        let (a, pin_a) = cache.insert_and_pin(vec![0u8; 100]);
        drop(pin_a);
        let (b, pin_b) = cache.insert_and_pin(vec![0u8; 100]);
        drop(pin_b);

        // Touch `a`, then overflow: now `b` is the least recently used.
        drop(cache.pin(a).unwrap());
        let (_c, pin_c) = cache.insert_and_pin(vec![0u8; 100]);
        drop(pin_c);

        assert!(cache.pin(a).is_some());
        assert!(cache.pin(b).is_none());
    }

    #[test]
    fn pinned_buffers_survive_over_budget() {
        let cache = LruPixelCache::new(100);
        let (id, pixels) = cache.insert_and_pin(vec![0u8; 400]);
        // Way over budget, but the only buffer is pinned.
        assert_eq!(cache.used_bytes(), 400);
        assert_eq!(cache.cache_status(id), Some(CacheStatus::Pinned));

        // Releasing the pin lets the purge run.
        drop(pixels);
        assert_eq!(cache.used_bytes(), 0);
        assert!(cache.pin(id).is_none());
    }

    #[test]
    fn set_budget_purges_unpinned_only() {
        let cache = LruPixelCache::new(1000);
        let (a, pin_a) = cache.insert_and_pin(vec![0u8; 300]);
        drop(pin_a);
        let (_b, pin_b) = cache.insert_and_pin(vec![0u8; 300]);

        cache.set_budget(100);
        assert!(cache.pin(a).is_none(), "unpinned buffer purged");
        assert_eq!(cache.used_bytes(), 300, "pinned buffer kept");
        drop(pin_b);
        assert_eq!(cache.used_bytes(), 0);
    }

    #[test]
    fn remove_is_refused_while_pinned() {
        let cache = LruPixelCache::new(1000);
        let (id, pixels) = cache.insert_and_pin(vec![0u8; 50]);
        assert!(!cache.remove(id));
        drop(pixels);
        assert!(cache.remove(id));
        assert!(!cache.remove(id), "already gone");
        assert_eq!(cache.cache_status(id), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn slots_are_reused_and_ids_are_not() {
        let cache = LruPixelCache::new(10_000);
        let (a, pin) = cache.insert_and_pin(vec![0u8; 10]);
        drop(pin);
        assert!(cache.remove(a));
        let (b, pin) = cache.insert_and_pin(vec![0u8; 10]);
        drop(pin);
        assert_ne!(a, b);
        assert!(cache.pin(a).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn shared_across_threads() {
        let cache = Arc::new(LruPixelCache::new(4096));
        let (id, pin) = cache.insert_and_pin(vec![42u8; 512]);
        drop(pin);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let cache = Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    if let Some(pixels) = cache.pin(id) {
                        assert_eq!(pixels[0], 42);
                    }
                    let (_own, pin) = cache.insert_and_pin(vec![1u8; 64]);
                    drop(pin);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.used_bytes() <= 4096);
    }
}
