// SPDX-License-Identifier: Apache-2.0
//! Chunked paged file storage for switchyard.
//!
//! The store divides a backing file into fixed-size chunks addressed by a
//! stable numeric [`ChunkId`]. Released chunks are chained into a freelist
//! rooted in a per-file metadata slot, so identifiers are reused without
//! compaction. A write-through page cache sits in front of every file; all
//! higher layers (record tables, the B+ tree, indexes) read and write
//! exclusively through it.
//!
//! # Layers
//!
//! - [`codec`]: the fixed-footprint [`Record`] byte codec every persisted
//!   value implements.
//! - [`ChunkFile`]: raw chunk I/O, freelist allocation, the metadata slot.
//! - [`Table`] / [`Managed`]: typed rows with a save/update/destroy
//!   lifecycle over a chunk file.
//! - [`InlineVec`] / [`InlineSet`] / [`Varchar`]: fixed-capacity containers
//!   that pack into a single chunk.
//! - [`LruCache`]: a standalone sized-value cache with least-recently-used
//!   eviction, for callers that need bounded memory.
//!
//! # Determinism invariant
//!
//! Encoding is canonical: storing the same value always produces the same
//! bytes (unused container slots are zero-filled). The chunk layer relies on
//! this for its dirty-check short-circuit, which compares the cached bytes
//! of a chunk against the incoming write and skips the file write when they
//! are identical.

pub mod codec;

mod chunk;
mod lru;
mod set;
mod table;
mod varchar;
mod vec;

pub use chunk::{ChunkFile, ChunkId, DEFAULT_CHUNK_SIZE};
pub use codec::{ByteReader, ByteWriter, CodecError, Record};
pub use lru::LruCache;
pub use set::InlineSet;
pub use table::{chunk_size_for, Managed, RecordId, Table};
pub use varchar::Varchar;
pub use vec::InlineVec;

use std::path::PathBuf;

/// Errors emitted by the storage layer.
///
/// I/O and decode failures indicate a damaged or inaccessible backing file
/// and are fatal at the command boundary. Lifecycle and bounds variants are
/// programming-contract violations surfaced as recoverable errors so that
/// library callers never panic.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying file could not be opened, read, or written.
    #[error("i/o failure on {}: {source}", path.display())]
    Io {
        /// The backing file that failed.
        path: PathBuf,
        /// The operating-system error.
        source: std::io::Error,
    },
    /// A persisted value failed to decode.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// A fixed-capacity container was asked to hold more than its capacity.
    #[error("container capacity exceeded")]
    Overflow,
    /// An element was requested from an empty container.
    #[error("container underflow")]
    Underflow,
    /// A container access was outside the live range.
    #[error("index out of bounds")]
    OutOfBounds,
    /// The requested element is not present.
    #[error("element not found")]
    NotFound,
    /// `save` was called on a record that already has an identifier.
    #[error("record already saved")]
    AlreadySaved,
    /// `update` or `destroy` was called on a record that was never saved.
    #[error("record not saved")]
    NotSaved,
    /// Persistent state violated an internal invariant.
    #[error("storage invariant violated: {0}")]
    Corrupt(&'static str),
}
