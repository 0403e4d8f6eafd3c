// SPDX-License-Identifier: Apache-2.0
//! Sized-value cache with least-recently-used eviction.

use std::collections::BTreeMap;
use std::hash::Hash;

use rustc_hash::FxHashMap;

/// Callback invoked with the key and bytes of a dirty entry before it is
/// dropped (evicted, removed, or cleared), so callers can flush writes.
pub type EvictFn<K> = Box<dyn FnMut(&K, &[u8])>;

#[derive(Debug)]
struct Slot {
    value: Box<[u8]>,
    stamp: u64,
    dirty: bool,
}

/// A fixed-capacity key → bytes cache evicting the least recently used
/// entry.
///
/// Recency is tracked with a monotonically increasing access stamp indexed
/// in a secondary ordered map; both `get` and `upsert` refresh it. Entries
/// marked dirty are handed to the pre-destroy callback (when one is
/// configured) before they disappear.
pub struct LruCache<K: Eq + Hash + Clone> {
    capacity: usize,
    slots: FxHashMap<K, Slot>,
    order: BTreeMap<u64, K>,
    clock: u64,
    before_destroy: Option<EvictFn<K>>,
}

impl<K: Eq + Hash + Clone> LruCache<K> {
    /// Create a cache holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity >= 2);
        Self {
            capacity,
            slots: FxHashMap::default(),
            order: BTreeMap::new(),
            clock: 0,
            before_destroy: None,
        }
    }

    /// Create a cache with a pre-destroy callback for dirty entries.
    #[must_use]
    pub fn with_before_destroy(capacity: usize, callback: EvictFn<K>) -> Self {
        let mut this = Self::new(capacity);
        this.before_destroy = Some(callback);
        this
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Look up `key`, refreshing its recency.
    pub fn get(&mut self, key: &K) -> Option<&[u8]> {
        self.clock += 1;
        let clock = self.clock;
        let slot = self.slots.get_mut(key)?;
        self.order.remove(&slot.stamp);
        slot.stamp = clock;
        self.order.insert(clock, key.clone());
        Some(&slot.value)
    }

    /// Insert or update `key`, refreshing its recency.
    ///
    /// Returns whether the cached bytes changed (a repeat write of identical
    /// bytes reports `false`). Inserting into a full cache evicts the least
    /// recently used entry first.
    pub fn upsert(&mut self, key: &K, value: &[u8], dirty: bool) -> bool {
        self.clock += 1;
        let clock = self.clock;
        if let Some(slot) = self.slots.get_mut(key) {
            self.order.remove(&slot.stamp);
            slot.stamp = clock;
            self.order.insert(clock, key.clone());
            slot.dirty |= dirty;
            if slot.value.as_ref() == value {
                return false;
            }
            slot.value = value.to_vec().into_boxed_slice();
            return true;
        }

        if self.slots.len() == self.capacity {
            self.evict_lru();
        }
        self.slots.insert(
            key.clone(),
            Slot {
                value: value.to_vec().into_boxed_slice(),
                stamp: clock,
                dirty,
            },
        );
        self.order.insert(clock, key.clone());
        true
    }

    /// Drop `key`, flushing it first when dirty.
    pub fn remove(&mut self, key: &K) {
        if let Some(slot) = self.slots.remove(key) {
            self.order.remove(&slot.stamp);
            if slot.dirty {
                if let Some(callback) = self.before_destroy.as_mut() {
                    callback(key, &slot.value);
                }
            }
        }
    }

    /// Drop every entry, flushing dirty ones in eviction order.
    pub fn clear(&mut self) {
        let stamps: Vec<u64> = self.order.keys().copied().collect();
        for stamp in stamps {
            if let Some(key) = self.order.remove(&stamp) {
                if let Some(slot) = self.slots.remove(&key) {
                    if slot.dirty {
                        if let Some(callback) = self.before_destroy.as_mut() {
                            callback(&key, &slot.value);
                        }
                    }
                }
            }
        }
    }

    fn evict_lru(&mut self) {
        if let Some((&stamp, _)) = self.order.iter().next() {
            if let Some(key) = self.order.remove(&stamp) {
                if let Some(slot) = self.slots.remove(&key) {
                    if slot.dirty {
                        if let Some(callback) = self.before_destroy.as_mut() {
                            callback(&key, &slot.value);
                        }
                    }
                }
            }
        }
    }
}

impl<K: Eq + Hash + Clone> Drop for LruCache<K> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K: Eq + Hash + Clone + std::fmt::Debug> std::fmt::Debug for LruCache<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity)
            .field("len", &self.slots.len())
            .finish_non_exhaustive()
    }
}
