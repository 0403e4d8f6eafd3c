// SPDX-License-Identifier: Apache-2.0
//! Duplicate-key B+ tree over the switchyard chunk store.
//!
//! The tree stores `(key, value)` pairs as its ordering unit, which pushes
//! duplicate-key handling out of the node layer entirely: entries are unique
//! pairs, sorted lexicographically, and a key-only probe simply orders below
//! every pair carrying that key. Descent still has to branch where a routing
//! key equals the probe, because equal keys may straddle subtrees.
//!
//! [`Index`] and [`StrIndex`] wrap the tree into the secondary-index shape
//! the domain layer uses: domain key → stable record id, with a hashing
//! specialization for bounded strings.

mod index;
mod node;
mod tree;

pub use index::{Index, StrIndex};
pub use node::{index_order, leaf_order};
pub use tree::BpTree;
