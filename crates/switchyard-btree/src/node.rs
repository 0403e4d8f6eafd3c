// SPDX-License-Identifier: Apache-2.0
//! Node layout and order arithmetic for the B+ tree.

use switchyard_store::codec::{ByteReader, ByteWriter, CodecError, Record};
use switchyard_store::{ChunkId, InlineSet, InlineVec, DEFAULT_CHUNK_SIZE};

/// Chunk identifier of a node. The root always occupies chunk 0, so 0
/// doubles as "none" in the leaf chain.
pub(crate) type NodeId = ChunkId;

/// Absent neighbour in the leaf chain.
pub(crate) const NIL: NodeId = 0;

/// Chunk id of the root node, established by the file initializer.
pub(crate) const ROOT: NodeId = 0;

// On-disk node header footprints. The index header carries the tag, the
// root/leaf flags and one shared length; the leaf header carries the tag,
// both chain pointers and a length.
const INDEX_HEADER: usize = 1 + 1 + 4;
const LEAF_HEADER: usize = 1 + 4 + 4 + 4;

const TAG_ROOT: u8 = 0;
const TAG_INTERNAL: u8 = 1;
const TAG_LEAF: u8 = 2;

/// Index-node capacity (`2k`) for an entry of `entry_bytes` so that a full
/// node, its child pointers and its header fit one default chunk.
///
/// The result is even and leaves a little slack, mirroring the half-limit
/// derivation of the original layout. Callers evaluate this in a const
/// context at the type-alias site.
#[must_use]
pub const fn index_order(entry_bytes: usize) -> usize {
    let fit = (DEFAULT_CHUNK_SIZE - INDEX_HEADER) / (4 + entry_bytes);
    (fit / 2 - 1) * 2
}

/// Leaf-node capacity (`2l`) for an entry of `entry_bytes`; see
/// [`index_order`].
#[must_use]
pub const fn leaf_order(entry_bytes: usize) -> usize {
    let fit = (DEFAULT_CHUNK_SIZE - LEAF_HEADER) / entry_bytes;
    (fit / 2 - 1) * 2
}

/// The pair the tree actually stores and orders by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Entry<K, V> {
    pub key: K,
    pub value: V,
}

impl<K: Record, V: Record> Record for Entry<K, V> {
    const BYTES: usize = K::BYTES + V::BYTES;

    fn store(&self, out: &mut ByteWriter<'_>) {
        self.key.store(out);
        self.value.store(out);
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            key: K::load(input)?,
            value: V::load(input)?,
        })
    }
}

/// Routing node: child pointers plus the minimum entry of each subtree.
///
/// `splits[i]` equals the least entry stored under `children[i]`; both
/// arrays always have the same length. `leaf_children` records whether the
/// children are leaves, because children are referenced only by id.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexNode<K, V, const M: usize> {
    pub root: bool,
    pub leaf_children: bool,
    pub children: InlineVec<NodeId, M>,
    pub splits: InlineSet<Entry<K, V>, M>,
}

/// Leaf node: sorted entries plus the doubly-linked leaf chain.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LeafNode<K, V, const L: usize> {
    pub prev: NodeId,
    pub next: NodeId,
    pub entries: InlineSet<Entry<K, V>, L>,
}

/// A B+ tree node as stored in one chunk.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Node<K, V, const M: usize, const L: usize> {
    Index(IndexNode<K, V, M>),
    Leaf(LeafNode<K, V, L>),
}

impl<K, V, const M: usize, const L: usize> Node<K, V, M, L>
where
    K: Record + Copy + Default + Ord,
    V: Record + Copy + Default + Ord,
{
    /// Fresh empty root, as written by the file initializer.
    pub fn new_root() -> Self {
        Self::Index(IndexNode {
            root: true,
            leaf_children: true,
            children: InlineVec::new(),
            splits: InlineSet::new(),
        })
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Index(node) => node.children.len(),
            Self::Leaf(node) => node.entries.len(),
        }
    }

    pub fn half_limit(&self) -> usize {
        match self {
            Self::Index(_) => M / 2,
            Self::Leaf(_) => L / 2,
        }
    }

    pub fn capacity(&self) -> usize {
        match self {
            Self::Index(_) => M,
            Self::Leaf(_) => L,
        }
    }

    /// A node at capacity must split before it is written back.
    pub fn should_split(&self) -> bool {
        self.len() == self.capacity()
    }

    /// A node under its half-limit must redistribute or merge.
    pub fn should_merge(&self) -> bool {
        self.len() < self.half_limit()
    }

    /// Least entry in this subtree (first split or first leaf entry).
    pub fn min_entry(&self) -> Option<Entry<K, V>> {
        match self {
            Self::Index(node) => node.splits.first().copied(),
            Self::Leaf(node) => node.entries.first().copied(),
        }
    }
}

impl<K, V, const M: usize, const L: usize> Record for Node<K, V, M, L>
where
    K: Record + Copy + Default + Ord,
    V: Record + Copy + Default + Ord,
{
    const BYTES: usize = {
        let index = INDEX_HEADER + M * 4 + M * Entry::<K, V>::BYTES;
        let leaf = LEAF_HEADER + L * Entry::<K, V>::BYTES;
        if index > leaf {
            index
        } else {
            leaf
        }
    };

    fn store(&self, out: &mut ByteWriter<'_>) {
        let end = out.pos() + Self::BYTES;
        match self {
            Self::Index(node) => {
                out.put_u8(if node.root { TAG_ROOT } else { TAG_INTERNAL });
                out.put_bool(node.leaf_children);
                out.put_u32(node.children.len() as u32);
                for child in &node.children {
                    out.put_u32(*child);
                }
                for split in &node.splits {
                    split.store(out);
                }
            }
            Self::Leaf(node) => {
                out.put_u8(TAG_LEAF);
                out.put_u32(node.prev);
                out.put_u32(node.next);
                out.put_u32(node.entries.len() as u32);
                for entry in &node.entries {
                    entry.store(out);
                }
            }
        }
        out.zero_until(end);
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let end = input.pos() + Self::BYTES;
        let tag = input.u8()?;
        let node = match tag {
            TAG_ROOT | TAG_INTERNAL => {
                let leaf_children = input.bool()?;
                let len = input.u32()? as usize;
                if len > M {
                    return Err(CodecError::LengthTooLarge);
                }
                let mut children = InlineVec::new();
                for _ in 0..len {
                    children
                        .push(input.u32()?)
                        .map_err(|_| CodecError::LengthTooLarge)?;
                }
                let mut splits = InlineSet::new();
                for _ in 0..len {
                    splits
                        .insert(Entry::load(input)?)
                        .map_err(|_| CodecError::LengthTooLarge)?;
                }
                Self::Index(IndexNode {
                    root: tag == TAG_ROOT,
                    leaf_children,
                    children,
                    splits,
                })
            }
            TAG_LEAF => {
                let prev = input.u32()?;
                let next = input.u32()?;
                let len = input.u32()? as usize;
                if len > L {
                    return Err(CodecError::LengthTooLarge);
                }
                let mut entries = InlineSet::new();
                for _ in 0..len {
                    entries
                        .insert(Entry::load(input)?)
                        .map_err(|_| CodecError::LengthTooLarge)?;
                }
                Self::Leaf(LeafNode {
                    prev,
                    next,
                    entries,
                })
            }
            _ => return Err(CodecError::InvalidEnum),
        };
        input.skip_until(end)?;
        Ok(node)
    }
}
