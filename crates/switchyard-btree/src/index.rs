// SPDX-License-Identifier: Apache-2.0
//! Secondary indexes: domain key → record id.

use std::path::Path;

use switchyard_store::{Record, RecordId, StoreError, Varchar};

use crate::node::{index_order, leaf_order};
use crate::tree::BpTree;

/// A secondary index mapping a domain key to the stable identifiers of the
/// records carrying it.
///
/// Duplicate keys are first-class: `find_many` returns every id under a key
/// in ascending id order. The tree orders (key, id) pairs, so removal needs
/// both the key and the id.
#[derive(Debug)]
pub struct Index<K, const M: usize, const L: usize>
where
    K: Record + Copy + Default + Ord,
{
    tree: BpTree<K, RecordId, M, L>,
}

impl<K, const M: usize, const L: usize> Index<K, M, L>
where
    K: Record + Copy + Default + Ord,
{
    /// Open (or create) the index file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            tree: BpTree::<K, RecordId, M, L>::open(path)?,
        })
    }

    /// Add `id` under `key`.
    pub fn insert(&mut self, key: K, id: RecordId) -> Result<(), StoreError> {
        self.tree.insert(key, id)
    }

    /// Drop the `(key, id)` pairing.
    pub fn remove(&mut self, key: K, id: RecordId) -> Result<(), StoreError> {
        self.tree.remove(key, id)
    }

    /// The least id stored under `key`, if any.
    pub fn find_one(&mut self, key: &K) -> Result<Option<RecordId>, StoreError> {
        self.tree.find_one(key)
    }

    /// Every id stored under `key`, ascending.
    pub fn find_many(&mut self, key: &K) -> Result<Vec<RecordId>, StoreError> {
        self.tree.find_many(key)
    }

    /// True when the index holds no pairings at all.
    pub fn is_empty(&mut self) -> Result<bool, StoreError> {
        self.tree.is_empty()
    }

    /// Drop every pairing and reset the file.
    pub fn truncate(&mut self) -> Result<(), StoreError> {
        self.tree.truncate()
    }

    /// Drop the page cache.
    pub fn clear_cache(&mut self) {
        self.tree.clear_cache();
    }
}

const HASH_ENTRY: usize = 8 + 4;
const HASH_M: usize = index_order(HASH_ENTRY);
const HASH_L: usize = leaf_order(HASH_ENTRY);

/// String-keyed index specialization.
///
/// Keys are bounded strings ([`Varchar`]); the tree stores their stable
/// 64-bit content hash instead of the text, trading dictionary order for
/// length-independent comparisons. Hash collisions map distinct strings to
/// the same bucket, so callers that cannot tolerate false positives
/// re-check the loaded record against the original key.
#[derive(Debug)]
pub struct StrIndex {
    tree: BpTree<u64, RecordId, HASH_M, HASH_L>,
}

impl StrIndex {
    /// Open (or create) the index file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            tree: BpTree::<u64, RecordId, HASH_M, HASH_L>::open(path)?,
        })
    }

    /// Add `id` under the hash of `key`.
    pub fn insert<const CAP: usize>(
        &mut self,
        key: &Varchar<CAP>,
        id: RecordId,
    ) -> Result<(), StoreError> {
        self.tree.insert(key.hash(), id)
    }

    /// Drop the pairing of `key`'s hash and `id`.
    pub fn remove<const CAP: usize>(
        &mut self,
        key: &Varchar<CAP>,
        id: RecordId,
    ) -> Result<(), StoreError> {
        self.tree.remove(key.hash(), id)
    }

    /// The least id stored under `key`'s hash, if any.
    pub fn find_one<const CAP: usize>(
        &mut self,
        key: &Varchar<CAP>,
    ) -> Result<Option<RecordId>, StoreError> {
        self.tree.find_one(&key.hash())
    }

    /// Every id stored under `key`'s hash, ascending.
    pub fn find_many<const CAP: usize>(
        &mut self,
        key: &Varchar<CAP>,
    ) -> Result<Vec<RecordId>, StoreError> {
        self.tree.find_many(&key.hash())
    }

    /// True when the index holds no pairings at all.
    pub fn is_empty(&mut self) -> Result<bool, StoreError> {
        self.tree.is_empty()
    }

    /// Drop every pairing and reset the file.
    pub fn truncate(&mut self) -> Result<(), StoreError> {
        self.tree.truncate()
    }

    /// Drop the page cache.
    pub fn clear_cache(&mut self) {
        self.tree.clear_cache();
    }
}
