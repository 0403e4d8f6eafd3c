// SPDX-License-Identifier: Apache-2.0
//! Typed record tables with a save/update/destroy lifecycle.

use std::ops::{Deref, DerefMut};
use std::path::Path;

use crate::chunk::{ChunkFile, ChunkId, DEFAULT_CHUNK_SIZE};
use crate::codec::Record;
use crate::StoreError;

/// Stable numeric identifier of a saved record (its chunk id).
pub type RecordId = ChunkId;

/// Smallest multiple of [`DEFAULT_CHUNK_SIZE`] that holds `record_bytes`.
///
/// Most records fit the default chunk; oversized ones (the train record,
/// with its hundred inline stops) get a proportionally larger chunk so a
/// record never straddles two chunks.
#[must_use]
pub const fn chunk_size_for(record_bytes: usize) -> usize {
    let chunks = record_bytes.div_ceil(DEFAULT_CHUNK_SIZE);
    if chunks == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunks * DEFAULT_CHUNK_SIZE
    }
}

/// One file of fixed-size records of type `T`, with user metadata `M`.
///
/// The table hands out stable [`RecordId`]s on save and reuses them through
/// the chunk freelist after destroy. All mutation goes through a
/// [`Managed`] wrapper, which enforces the record lifecycle.
#[derive(Debug)]
pub struct Table<T: Record, M: Record + Default + Clone = ()> {
    file: ChunkFile<M>,
    _row: std::marker::PhantomData<T>,
}

impl<T: Record, M: Record + Default + Clone> Table<T, M> {
    /// Open (or create) the table file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let file = ChunkFile::open(path, chunk_size_for(T::BYTES), |_| Ok(()))?;
        Ok(Self {
            file,
            _row: std::marker::PhantomData,
        })
    }

    /// Load the record stored at `id`.
    pub fn get(&mut self, id: RecordId) -> Result<Managed<T>, StoreError> {
        let value = self.file.get_record(id)?;
        Ok(Managed {
            id: Some(id),
            value,
        })
    }

    /// Read the user metadata payload.
    pub fn meta(&mut self) -> Result<M, StoreError> {
        self.file.meta()
    }

    /// Replace the user metadata payload.
    pub fn set_meta(&mut self, meta: &M) -> Result<(), StoreError> {
        self.file.set_meta(meta)
    }

    /// Drop all rows and metadata; identifiers restart at zero.
    pub fn truncate(&mut self) -> Result<(), StoreError> {
        self.file.truncate()
    }

    /// Drop the page cache.
    pub fn clear_cache(&mut self) {
        self.file.clear_cache();
    }
}

/// An in-memory record plus its storage identity.
///
/// A fresh value has no identifier; `save` assigns one (exactly once),
/// `update` rewrites the same chunk, and `destroy` releases the chunk and
/// clears the identifier again.
#[derive(Debug, Clone)]
pub struct Managed<T> {
    id: Option<RecordId>,
    value: T,
}

impl<T: Record> Managed<T> {
    /// Wrap a fresh, unsaved value.
    #[must_use]
    pub fn fresh(value: T) -> Self {
        Self { id: None, value }
    }

    /// The record's identifier, once saved.
    #[must_use]
    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    /// The record's identifier when the caller knows it is saved.
    ///
    /// Fails with [`StoreError::NotSaved`] otherwise.
    pub fn saved_id(&self) -> Result<RecordId, StoreError> {
        self.id.ok_or(StoreError::NotSaved)
    }

    /// Store a fresh record, assigning its identifier.
    pub fn save<M: Record + Default + Clone>(
        &mut self,
        table: &mut Table<T, M>,
    ) -> Result<RecordId, StoreError> {
        if self.id.is_some() {
            return Err(StoreError::AlreadySaved);
        }
        let id = table.file.push_record(&self.value)?;
        self.id = Some(id);
        Ok(id)
    }

    /// Rewrite a previously saved record in place.
    pub fn update<M: Record + Default + Clone>(
        &self,
        table: &mut Table<T, M>,
    ) -> Result<(), StoreError> {
        let id = self.saved_id()?;
        table.file.set_record(id, &self.value)
    }

    /// Release the record's chunk and clear its identifier.
    pub fn destroy<M: Record + Default + Clone>(
        &mut self,
        table: &mut Table<T, M>,
    ) -> Result<(), StoreError> {
        let id = self.saved_id()?;
        table.file.remove(id)?;
        self.id = None;
        Ok(())
    }
}

impl<T> Deref for Managed<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Managed<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_rounds_up() {
        assert_eq!(chunk_size_for(0), DEFAULT_CHUNK_SIZE);
        assert_eq!(chunk_size_for(100), DEFAULT_CHUNK_SIZE);
        assert_eq!(chunk_size_for(4096), DEFAULT_CHUNK_SIZE);
        assert_eq!(chunk_size_for(4097), 2 * DEFAULT_CHUNK_SIZE);
    }
}
