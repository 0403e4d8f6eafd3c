// SPDX-License-Identifier: Apache-2.0
//! The duplicate-key B+ tree.

use std::marker::PhantomData;
use std::path::Path;

use switchyard_store::{ChunkFile, Record, StoreError, DEFAULT_CHUNK_SIZE};

use crate::node::{Entry, IndexNode, LeafNode, Node, NodeId, NIL, ROOT};

/// A B+ tree mapping `(K, V)` pairs, one tree per file.
///
/// `M` is the index-node capacity (`2k`) and `L` the leaf capacity (`2l`);
/// pick them with [`crate::index_order`] / [`crate::leaf_order`] so a full
/// node fits one chunk, or with small literals in tests to force deep trees.
///
/// Keys may repeat; exact `(key, value)` pairs must not (callers keep them
/// unique). `find_many` returns the values of one key in ascending value
/// order; `scan_all` walks the leaf chain in `(key, value)` order.
#[derive(Debug)]
pub struct BpTree<K, V, const M: usize, const L: usize>
where
    K: switchyard_store::Record + Copy + Default + Ord,
    V: switchyard_store::Record + Copy + Default + Ord,
{
    file: ChunkFile<()>,
    _marker: PhantomData<(K, V)>,
}

impl<K, V, const M: usize, const L: usize> BpTree<K, V, M, L>
where
    K: switchyard_store::Record + Copy + Default + Ord,
    V: switchyard_store::Record + Copy + Default + Ord,
{
    /// Open (or create) the tree file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        debug_assert!(M >= 4 && M % 2 == 0, "index order must be an even >= 4");
        debug_assert!(L >= 4 && L % 2 == 0, "leaf order must be an even >= 4");
        let chunk_size = Node::<K, V, M, L>::BYTES.max(1).div_ceil(DEFAULT_CHUNK_SIZE)
            * DEFAULT_CHUNK_SIZE;
        let file = ChunkFile::open(path, chunk_size, |file| {
            let id = file.push_record(&Node::<K, V, M, L>::new_root())?;
            debug_assert_eq!(id, ROOT);
            Ok(())
        })?;
        Ok(Self {
            file,
            _marker: PhantomData,
        })
    }

    /// Insert the pair `(key, value)`.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), StoreError> {
        let entry = Entry { key, value };
        let mut root = self.load(ROOT)?;
        self.insert_into(&mut root, entry)?;
        if root.should_split() {
            self.split_root(&mut root)?;
        }
        self.write(ROOT, &root)
    }

    /// Remove the pair `(key, value)`. The pair must be present.
    pub fn remove(&mut self, key: K, value: V) -> Result<(), StoreError> {
        let entry = Entry { key, value };
        let mut root = self.load(ROOT)?;
        self.remove_from(&mut root, entry)?;
        if root.should_merge() {
            self.collapse_root(&mut root)?;
        }
        self.write(ROOT, &root)
    }

    /// Find some value stored under `key` (the least one, when several).
    pub fn find_one(&mut self, key: &K) -> Result<Option<V>, StoreError> {
        let root = self.load(ROOT)?;
        self.find_one_in(&root, key)
    }

    /// Find every value stored under `key`, ascending.
    pub fn find_many(&mut self, key: &K) -> Result<Vec<V>, StoreError> {
        let root = self.load(ROOT)?;
        let mut out = Vec::new();
        self.find_many_in(&root, key, &mut out)?;
        Ok(out)
    }

    /// Walk the leaf chain left to right, returning every pair in order.
    pub fn scan_all(&mut self) -> Result<Vec<(K, V)>, StoreError> {
        let mut node = self.load(ROOT)?;
        let mut leaf = loop {
            match node {
                Node::Index(ix) => {
                    let Some(first) = ix.children.first().copied() else {
                        return Ok(Vec::new());
                    };
                    node = self.load(first)?;
                }
                Node::Leaf(leaf) => break leaf,
            }
        };
        let mut out = Vec::new();
        loop {
            out.extend(leaf.entries.iter().map(|e| (e.key, e.value)));
            if leaf.next == NIL {
                return Ok(out);
            }
            leaf = self.load_leaf(leaf.next)?;
        }
    }

    /// True when the tree holds no entries.
    pub fn is_empty(&mut self) -> Result<bool, StoreError> {
        Ok(self.load(ROOT)?.len() == 0)
    }

    /// Drop every entry and reset the file.
    pub fn truncate(&mut self) -> Result<(), StoreError> {
        self.file.truncate()?;
        let id = self.file.push_record(&Node::<K, V, M, L>::new_root())?;
        debug_assert_eq!(id, ROOT);
        Ok(())
    }

    /// Drop the page cache.
    pub fn clear_cache(&mut self) {
        self.file.clear_cache();
    }

    // ── node I/O ────────────────────────────────────────────────────

    fn load(&mut self, id: NodeId) -> Result<Node<K, V, M, L>, StoreError> {
        self.file.get_record(id)
    }

    fn load_leaf(&mut self, id: NodeId) -> Result<LeafNode<K, V, L>, StoreError> {
        match self.load(id)? {
            Node::Leaf(leaf) => Ok(leaf),
            Node::Index(_) => Err(StoreError::Corrupt("expected a leaf node")),
        }
    }

    fn write(&mut self, id: NodeId, node: &Node<K, V, M, L>) -> Result<(), StoreError> {
        self.file.set_record(id, node)
    }

    fn alloc(&mut self, node: &Node<K, V, M, L>) -> Result<NodeId, StoreError> {
        self.file.push_record(node)
    }

    fn free(&mut self, id: NodeId) -> Result<(), StoreError> {
        self.file.remove(id)
    }

    // ── descent helpers ─────────────────────────────────────────────

    /// Child position whose subtree should contain `entry`: the rightmost
    /// split at or before it (clamped to the first child).
    fn locate(splits: &switchyard_store::InlineSet<Entry<K, V>, M>, entry: &Entry<K, V>) -> usize {
        let upper = splits.as_slice().partition_point(|s| s <= entry);
        upper.saturating_sub(1)
    }

    /// First child that could contain `key`, plus the follow-up child to
    /// probe when the routing key equals `key` exactly (duplicate keys can
    /// straddle the boundary).
    fn key_children(node: &IndexNode<K, V, M>, key: &K) -> (usize, Option<usize>) {
        let at_or_above = node.splits.as_slice().partition_point(|s| s.key < *key);
        let follow_up = (at_or_above < node.splits.len() && node.splits[at_or_above].key == *key)
            .then_some(at_or_above);
        (at_or_above.saturating_sub(1), follow_up)
    }

    // ── insert ──────────────────────────────────────────────────────

    fn insert_into(
        &mut self,
        node: &mut Node<K, V, M, L>,
        entry: Entry<K, V>,
    ) -> Result<(), StoreError> {
        let ix = match node {
            Node::Leaf(leaf) => return leaf.entries.insert(entry),
            Node::Index(ix) => ix,
        };

        // First entry ever: the root grows its first leaf child.
        if ix.children.is_empty() {
            debug_assert!(ix.root && ix.leaf_children);
            let mut leaf = LeafNode {
                prev: NIL,
                next: NIL,
                entries: switchyard_store::InlineSet::new(),
            };
            leaf.entries.insert(entry)?;
            let id = self.alloc(&Node::Leaf(leaf))?;
            ix.children.push(id)?;
            ix.splits.insert(entry)?;
            return Ok(());
        }

        let at = Self::locate(&ix.splits, &entry);
        if entry < ix.splits[at] {
            // The new entry becomes the minimum of the subtree.
            ix.splits.replace(at, entry)?;
        }
        let child_id = ix.children[at];
        let mut child = self.load(child_id)?;
        self.insert_into(&mut child, entry)?;
        let min = child
            .min_entry()
            .ok_or(StoreError::Corrupt("child emptied by insert"))?;
        ix.splits.replace(at, min)?;
        if child.should_split() {
            self.split_child(&mut child, child_id, ix, at)?;
        }
        self.write(child_id, &child)
    }

    fn split_child(
        &mut self,
        child: &mut Node<K, V, M, L>,
        child_id: NodeId,
        parent: &mut IndexNode<K, V, M>,
        at: usize,
    ) -> Result<(), StoreError> {
        let (right, right_min) = match child {
            Node::Index(ix) => {
                debug_assert!(!ix.root);
                let right = IndexNode {
                    root: false,
                    leaf_children: ix.leaf_children,
                    children: ix.children.split_upper(),
                    splits: ix.splits.split_upper(),
                };
                let min = right
                    .splits
                    .first()
                    .copied()
                    .ok_or(StoreError::Corrupt("split produced an empty node"))?;
                (Node::Index(right), min)
            }
            Node::Leaf(leaf) => {
                let right = LeafNode {
                    prev: child_id,
                    next: leaf.next,
                    entries: leaf.entries.split_upper(),
                };
                let min = right
                    .entries
                    .first()
                    .copied()
                    .ok_or(StoreError::Corrupt("split produced an empty node"))?;
                (Node::Leaf(right), min)
            }
        };
        let right_id = self.alloc(&right)?;
        if let (Node::Leaf(leaf), Node::Leaf(right_leaf)) = (&mut *child, &right) {
            // Stitch the chain: child <-> right <-> old successor.
            if right_leaf.next != NIL {
                let mut successor = self.load_leaf(right_leaf.next)?;
                successor.prev = right_id;
                self.write(right_leaf.next, &Node::Leaf(successor))?;
            }
            leaf.next = right_id;
        }
        parent.children.insert(at + 1, right_id)?;
        parent.splits.insert(right_min)
    }

    /// Root split: move both halves into fresh children so the root keeps
    /// chunk 0.
    fn split_root(&mut self, root: &mut Node<K, V, M, L>) -> Result<(), StoreError> {
        let ix = match root {
            Node::Index(ix) => ix,
            Node::Leaf(_) => return Err(StoreError::Corrupt("root must be an index node")),
        };
        let right_children = ix.children.split_upper();
        let right_splits = ix.splits.split_upper();
        let left = IndexNode {
            root: false,
            leaf_children: ix.leaf_children,
            children: ix.children,
            splits: ix.splits,
        };
        let right = IndexNode {
            root: false,
            leaf_children: ix.leaf_children,
            children: right_children,
            splits: right_splits,
        };
        let left_min = left
            .splits
            .first()
            .copied()
            .ok_or(StoreError::Corrupt("split produced an empty node"))?;
        let right_min = right
            .splits
            .first()
            .copied()
            .ok_or(StoreError::Corrupt("split produced an empty node"))?;
        let left_id = self.alloc(&Node::Index(left))?;
        let right_id = self.alloc(&Node::Index(right))?;
        ix.leaf_children = false;
        ix.children.clear();
        ix.children.push(left_id)?;
        ix.children.push(right_id)?;
        ix.splits.clear();
        ix.splits.insert(left_min)?;
        ix.splits.insert(right_min)
    }

    // ── remove ──────────────────────────────────────────────────────

    fn remove_from(
        &mut self,
        node: &mut Node<K, V, M, L>,
        entry: Entry<K, V>,
    ) -> Result<(), StoreError> {
        let ix = match node {
            Node::Leaf(leaf) => return leaf.entries.remove(&entry),
            Node::Index(ix) => ix,
        };
        let at = Self::locate(&ix.splits, &entry);
        let child_id = ix.children[at];
        let mut child = self.load(child_id)?;
        self.remove_from(&mut child, entry)?;
        if child.len() == 0 {
            // Only the root's single leaf child may drain completely.
            debug_assert!(ix.root && matches!(child, Node::Leaf(_)));
            self.free(child_id)?;
            ix.children.clear();
            ix.splits.clear();
            return Ok(());
        }
        let min = child
            .min_entry()
            .ok_or(StoreError::Corrupt("child emptied by remove"))?;
        ix.splits.replace(at, min)?;
        if child.should_merge() {
            self.merge_child(&mut child, child_id, ix, at)?;
        }
        self.write(child_id, &child)
    }

    /// Rebalance an under-full child against a sibling: redistribute one
    /// element when the sibling can spare it, otherwise merge the sibling
    /// into the child and drop it from the parent.
    fn merge_child(
        &mut self,
        child: &mut Node<K, V, M, L>,
        child_id: NodeId,
        parent: &mut IndexNode<K, V, M>,
        at: usize,
    ) -> Result<(), StoreError> {
        let has_prev = at != 0;
        let has_next = at != parent.children.len() - 1;

        if !has_next {
            if !has_prev {
                // The only child of the root; nothing to rebalance against.
                debug_assert!(matches!(child, Node::Leaf(_)));
                return Ok(());
            }
            let prev_id = parent.children[at - 1];
            let mut prev = self.load(prev_id)?;
            if prev.len() > prev.half_limit() {
                // Borrow the greatest element of the left sibling.
                match (&mut *child, &mut prev) {
                    (Node::Leaf(leaf), Node::Leaf(prev_leaf)) => {
                        leaf.entries.insert(prev_leaf.entries.pop()?)?;
                    }
                    (Node::Index(ix), Node::Index(prev_ix)) => {
                        ix.children.unshift(prev_ix.children.pop()?)?;
                        ix.splits.insert(prev_ix.splits.pop()?)?;
                    }
                    _ => return Err(StoreError::Corrupt("sibling node kind mismatch")),
                }
                self.write(prev_id, &prev)?;
                let min = child
                    .min_entry()
                    .ok_or(StoreError::Corrupt("redistribution emptied a node"))?;
                return parent.splits.replace(at, min);
            }

            // Merge the left sibling into the child.
            match (&mut *child, &mut prev) {
                (Node::Leaf(leaf), Node::Leaf(prev_leaf)) => {
                    leaf.entries.absorb_front(&mut prev_leaf.entries)?;
                    if prev_leaf.prev != NIL {
                        let mut before = self.load_leaf(prev_leaf.prev)?;
                        before.next = child_id;
                        self.write(prev_leaf.prev, &Node::Leaf(before))?;
                    }
                    leaf.prev = prev_leaf.prev;
                }
                (Node::Index(ix), Node::Index(prev_ix)) => {
                    ix.children.absorb_front(&mut prev_ix.children)?;
                    ix.splits.absorb_front(&mut prev_ix.splits)?;
                }
                _ => return Err(StoreError::Corrupt("sibling node kind mismatch")),
            }
            let min = child
                .min_entry()
                .ok_or(StoreError::Corrupt("merge emptied a node"))?;
            parent.splits.replace(at, min)?;
            parent.children.remove_at(at - 1)?;
            parent.splits.remove_at(at - 1)?;
            return self.free(prev_id);
        }

        let next_id = parent.children[at + 1];
        let mut next = self.load(next_id)?;
        if next.len() > next.half_limit() {
            // Borrow the least element of the right sibling.
            match (&mut *child, &mut next) {
                (Node::Leaf(leaf), Node::Leaf(next_leaf)) => {
                    leaf.entries.insert(next_leaf.entries.shift()?)?;
                }
                (Node::Index(ix), Node::Index(next_ix)) => {
                    ix.children.push(next_ix.children.shift()?)?;
                    ix.splits.insert(next_ix.splits.shift()?)?;
                }
                _ => return Err(StoreError::Corrupt("sibling node kind mismatch")),
            }
            self.write(next_id, &next)?;
            let min = next
                .min_entry()
                .ok_or(StoreError::Corrupt("redistribution emptied a node"))?;
            return parent.splits.replace(at + 1, min);
        }

        // Merge the right sibling into the child.
        match (&mut *child, &mut next) {
            (Node::Leaf(leaf), Node::Leaf(next_leaf)) => {
                leaf.entries.absorb_back(&mut next_leaf.entries)?;
                if next_leaf.next != NIL {
                    let mut after = self.load_leaf(next_leaf.next)?;
                    after.prev = child_id;
                    self.write(next_leaf.next, &Node::Leaf(after))?;
                }
                leaf.next = next_leaf.next;
            }
            (Node::Index(ix), Node::Index(next_ix)) => {
                ix.children.absorb_back(&mut next_ix.children)?;
                ix.splits.absorb_back(&mut next_ix.splits)?;
            }
            _ => return Err(StoreError::Corrupt("sibling node kind mismatch")),
        }
        parent.children.remove_at(at + 1)?;
        parent.splits.remove_at(at + 1)?;
        self.free(next_id)
    }

    /// Root collapse: a root left with a single index child copies that
    /// child into chunk 0 and frees it. A single leaf child stays.
    fn collapse_root(&mut self, root: &mut Node<K, V, M, L>) -> Result<(), StoreError> {
        let ix = match root {
            Node::Index(ix) => ix,
            Node::Leaf(_) => return Err(StoreError::Corrupt("root must be an index node")),
        };
        if ix.children.len() != 1 || ix.leaf_children {
            return Ok(());
        }
        let child_id = ix.children[0];
        match self.load(child_id)? {
            Node::Index(child) => {
                ix.leaf_children = child.leaf_children;
                ix.children = child.children;
                ix.splits = child.splits;
            }
            Node::Leaf(_) => return Err(StoreError::Corrupt("leaf-flag mismatch on collapse")),
        }
        self.free(child_id)
    }

    // ── find ────────────────────────────────────────────────────────

    fn find_one_in(&mut self, node: &Node<K, V, M, L>, key: &K) -> Result<Option<V>, StoreError> {
        match node {
            Node::Leaf(leaf) => {
                let at = leaf.entries.as_slice().partition_point(|e| e.key < *key);
                Ok(leaf
                    .entries
                    .get(at)
                    .filter(|e| e.key == *key)
                    .map(|e| e.value))
            }
            Node::Index(ix) => {
                if ix.children.is_empty() {
                    return Ok(None);
                }
                let (first, follow_up) = Self::key_children(ix, key);
                let car = self.load(ix.children[first])?;
                if let Some(found) = self.find_one_in(&car, key)? {
                    return Ok(Some(found));
                }
                match follow_up {
                    Some(second) if second != first => {
                        let cdr = self.load(ix.children[second])?;
                        self.find_one_in(&cdr, key)
                    }
                    _ => Ok(None),
                }
            }
        }
    }

    fn find_many_in(
        &mut self,
        node: &Node<K, V, M, L>,
        key: &K,
        out: &mut Vec<V>,
    ) -> Result<(), StoreError> {
        match node {
            Node::Leaf(leaf) => {
                let at = leaf.entries.as_slice().partition_point(|e| e.key < *key);
                if leaf.entries.get(at).is_none_or(|e| e.key != *key) {
                    return Ok(());
                }
                self.collect_from(leaf, at, key, out)
            }
            Node::Index(ix) => {
                if ix.children.is_empty() {
                    return Ok(());
                }
                let (first, follow_up) = Self::key_children(ix, key);
                let car = self.load(ix.children[first])?;
                self.find_many_in(&car, key, out)?;
                if out.is_empty() {
                    if let Some(second) = follow_up {
                        if second != first {
                            let cdr = self.load(ix.children[second])?;
                            self.find_many_in(&cdr, key, out)?;
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// Collect every contiguous entry with `key` starting at `from`,
    /// following the leaf chain as needed.
    fn collect_from(
        &mut self,
        leaf: &LeafNode<K, V, L>,
        from: usize,
        key: &K,
        out: &mut Vec<V>,
    ) -> Result<(), StoreError> {
        let mut current = *leaf;
        let mut at = from;
        loop {
            while at < current.entries.len() && current.entries[at].key == *key {
                out.push(current.entries[at].value);
                at += 1;
            }
            if at < current.entries.len() || current.next == NIL {
                return Ok(());
            }
            current = self.load_leaf(current.next)?;
            at = 0;
        }
    }

    // ── diagnostics ─────────────────────────────────────────────────

    /// Walk the whole tree checking structural invariants: routing keys
    /// equal subtree minima, nodes respect their occupancy bounds, the leaf
    /// chain is consistent and globally sorted.
    ///
    /// Test support; linear in the size of the tree.
    #[doc(hidden)]
    pub fn validate(&mut self) -> Result<(), StoreError> {
        let root = self.load(ROOT)?;
        let ix = match &root {
            Node::Index(ix) => ix,
            Node::Leaf(_) => return Err(StoreError::Corrupt("root must be an index node")),
        };
        if !ix.root {
            return Err(StoreError::Corrupt("root tag missing on chunk 0"));
        }
        if ix.children.is_empty() {
            return Ok(());
        }
        let mut leaves = Vec::new();
        self.check_node(&root, true, &mut leaves)?;
        // Leaf chain must link exactly the leaves in left-to-right order.
        let mut previous: NodeId = NIL;
        let mut last_entry: Option<Entry<K, V>> = None;
        for (i, (id, leaf)) in leaves.iter().enumerate() {
            if leaf.prev != previous {
                return Err(StoreError::Corrupt("leaf chain prev mismatch"));
            }
            let expected_next = leaves.get(i + 1).map_or(NIL, |(next_id, _)| *next_id);
            if leaf.next != expected_next {
                return Err(StoreError::Corrupt("leaf chain next mismatch"));
            }
            for entry in &leaf.entries {
                if last_entry.is_some_and(|last| last >= *entry) {
                    return Err(StoreError::Corrupt("leaf chain out of order"));
                }
                last_entry = Some(*entry);
            }
            previous = *id;
        }
        Ok(())
    }

    fn check_node(
        &mut self,
        node: &Node<K, V, M, L>,
        under_limit_ok: bool,
        leaves: &mut Vec<(NodeId, LeafNode<K, V, L>)>,
    ) -> Result<(), StoreError> {
        if !under_limit_ok && node.should_merge() {
            return Err(StoreError::Corrupt("node under half-limit"));
        }
        if node.len() > node.capacity() {
            return Err(StoreError::Corrupt("node over capacity"));
        }
        if let Node::Index(ix) = node {
            if ix.children.len() != ix.splits.len() {
                return Err(StoreError::Corrupt("children/splits length mismatch"));
            }
            // The root's sole leaf child is the one node allowed below its
            // half-limit (there is no sibling to rebalance against).
            let only_child_ok = ix.root && ix.children.len() == 1 && ix.leaf_children;
            for at in 0..ix.children.len() {
                let child_id = ix.children[at];
                let child = self.load(child_id)?;
                if matches!(child, Node::Leaf(_)) != ix.leaf_children {
                    return Err(StoreError::Corrupt("leaf flag mismatch"));
                }
                let min = child
                    .min_entry()
                    .ok_or(StoreError::Corrupt("empty non-root node"))?;
                if min != ix.splits[at] {
                    return Err(StoreError::Corrupt("split differs from subtree minimum"));
                }
                if let Node::Leaf(leaf) = &child {
                    leaves.push((child_id, *leaf));
                }
                self.check_node(&child, only_child_ok, leaves)?;
            }
        }
        Ok(())
    }
}
