// SPDX-License-Identifier: Apache-2.0
//! Chunked file I/O with a freelist allocator and a write-through page cache.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::codec::{self, ByteReader, ByteWriter, Record};
use crate::StoreError;

/// Default chunk size in bytes. Tables with oversized records round up to
/// the next multiple of this.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Stable identifier of a chunk within one file.
///
/// Identifiers start at zero and name the chunk at byte offset
/// `(id + 1) * chunk_size`; the first `chunk_size` bytes of the file hold
/// the metadata slot, which is not addressable by id.
pub type ChunkId = u32;

/// On-disk file header: freelist root plus a caller-owned payload.
///
/// `next` is the head of the freelist of released chunks when `has_next` is
/// set; otherwise it is the next never-allocated identifier, so the file
/// grows at the end once the freelist is exhausted.
#[derive(Debug, Clone, Copy)]
struct FileMeta<M> {
    next: ChunkId,
    has_next: bool,
    user: M,
}

impl<M: Record> Record for FileMeta<M> {
    const BYTES: usize = 4 + 1 + M::BYTES;

    fn store(&self, out: &mut ByteWriter<'_>) {
        out.put_u32(self.next);
        out.put_bool(self.has_next);
        self.user.store(out);
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, codec::CodecError> {
        Ok(Self {
            next: input.u32()?,
            has_next: input.bool()?,
            user: M::load(input)?,
        })
    }
}

/// Freelist link written over the first bytes of a released chunk.
#[derive(Debug, Clone, Copy)]
struct FreeLink {
    next: ChunkId,
    has_next: bool,
}

impl Record for FreeLink {
    const BYTES: usize = 5;

    fn store(&self, out: &mut ByteWriter<'_>) {
        out.put_u32(self.next);
        out.put_bool(self.has_next);
    }

    fn load(input: &mut ByteReader<'_>) -> Result<Self, codec::CodecError> {
        Ok(Self {
            next: input.u32()?,
            has_next: input.bool()?,
        })
    }
}

/// A chunked file with manual reclamation.
///
/// All reads and writes pass through a per-file, unbounded, write-through
/// page cache. Because writes go straight to the file, the cache never holds
/// dirty data; it exists to absorb repeated reads and to power the
/// dirty-check short-circuit on [`ChunkFile::set`].
#[derive(Debug)]
pub struct ChunkFile<M: Record + Default> {
    file: File,
    path: PathBuf,
    chunk_size: usize,
    cache: FxHashMap<ChunkId, Box<[u8]>>,
    _meta: PhantomData<M>,
}

impl<M: Record + Default> ChunkFile<M> {
    /// Open `path`, creating it when absent.
    ///
    /// On creation a fresh metadata record is written and `init` runs so the
    /// owner can establish its base layout (the B+ tree writes its root node
    /// here). `init` is not called for pre-existing files.
    pub fn open<F>(path: &Path, chunk_size: usize, init: F) -> Result<Self, StoreError>
    where
        F: FnOnce(&mut Self) -> Result<(), StoreError>,
    {
        debug_assert!(chunk_size >= FileMeta::<M>::BYTES);
        debug_assert!(chunk_size >= FreeLink::BYTES);
        let fresh = !path.exists();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let mut this = Self {
            file,
            path: path.to_path_buf(),
            chunk_size,
            cache: FxHashMap::default(),
            _meta: PhantomData,
        };
        if fresh {
            this.write_meta(&FileMeta {
                next: 0,
                has_next: false,
                user: M::default(),
            })?;
            init(&mut this)?;
        }
        Ok(this)
    }

    /// Chunk size this file was opened with.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Copy `buf.len()` bytes of chunk `id` into `buf`.
    pub fn get(&mut self, id: ChunkId, buf: &mut [u8]) -> Result<(), StoreError> {
        if let Some(cached) = self.cache.get(&id) {
            if cached.len() == buf.len() {
                buf.copy_from_slice(cached);
                return Ok(());
            }
        }
        let offset = self.offset(id);
        self.read_at(offset, buf)?;
        self.cache.insert(id, buf.to_vec().into_boxed_slice());
        Ok(())
    }

    /// Write `buf` to chunk `id`.
    ///
    /// When the cache already holds identical bytes for `id` the physical
    /// write is skipped entirely (dirty-check short-circuit).
    pub fn set(&mut self, id: ChunkId, buf: &[u8]) -> Result<(), StoreError> {
        if let Some(cached) = self.cache.get(&id) {
            if cached.as_ref() == buf {
                return Ok(());
            }
        }
        self.cache.insert(id, buf.to_vec().into_boxed_slice());
        let offset = self.offset(id);
        self.write_at(offset, buf)
    }

    /// Allocate a chunk (freelist head first, then grow-at-end) and write
    /// `buf` to it. Returns the new chunk's identifier.
    pub fn push(&mut self, buf: &[u8]) -> Result<ChunkId, StoreError> {
        let mut meta = self.read_meta()?;
        let id = meta.next;
        if meta.has_next {
            let link: FreeLink = self.get_record(id)?;
            meta.next = link.next;
            meta.has_next = link.has_next;
        } else {
            meta.next += 1;
        }
        self.write_meta(&meta)?;
        self.set(id, buf)?;
        Ok(id)
    }

    /// Release chunk `id` onto the freelist.
    ///
    /// The chunk's first bytes are overwritten with the previous freelist
    /// head; the file's user metadata payload is preserved. Any cache entry
    /// for `id` is dropped.
    pub fn remove(&mut self, id: ChunkId) -> Result<(), StoreError> {
        let mut meta = self.read_meta()?;
        self.cache.remove(&id);
        let link = FreeLink {
            next: meta.next,
            has_next: meta.has_next,
        };
        let offset = self.offset(id);
        self.write_at(offset, &codec::encode(&link))?;
        meta.next = id;
        meta.has_next = true;
        self.write_meta(&meta)
    }

    /// Read chunk `id` as a typed record.
    pub fn get_record<T: Record>(&mut self, id: ChunkId) -> Result<T, StoreError> {
        debug_assert!(T::BYTES <= self.chunk_size);
        let mut buf = vec![0_u8; T::BYTES];
        self.get(id, &mut buf)?;
        Ok(codec::decode(&buf)?)
    }

    /// Write a typed record to chunk `id`.
    pub fn set_record<T: Record>(&mut self, id: ChunkId, value: &T) -> Result<(), StoreError> {
        debug_assert!(T::BYTES <= self.chunk_size);
        self.set(id, &codec::encode(value))
    }

    /// Allocate a chunk for a typed record.
    pub fn push_record<T: Record>(&mut self, value: &T) -> Result<ChunkId, StoreError> {
        debug_assert!(T::BYTES <= self.chunk_size);
        self.push(&codec::encode(value))
    }

    /// Read the caller-owned metadata payload.
    pub fn meta(&mut self) -> Result<M, StoreError> {
        Ok(self.read_meta()?.user)
    }

    /// Replace the caller-owned metadata payload.
    pub fn set_meta(&mut self, user: &M) -> Result<(), StoreError>
    where
        M: Clone,
    {
        let mut meta = self.read_meta()?;
        meta.user = user.clone();
        self.write_meta(&meta)
    }

    /// Drop every cached chunk.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Reset the file to an empty state: fresh metadata, empty freelist,
    /// next allocation at id 0. The cache is dropped.
    pub fn truncate(&mut self) -> Result<(), StoreError> {
        self.cache.clear();
        self.file.set_len(0).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.write_meta(&FileMeta {
            next: 0,
            has_next: false,
            user: M::default(),
        })
    }

    fn offset(&self, id: ChunkId) -> u64 {
        (u64::from(id) + 1) * self.chunk_size as u64
    }

    fn read_meta(&mut self) -> Result<FileMeta<M>, StoreError> {
        let mut buf = vec![0_u8; FileMeta::<M>::BYTES];
        self.read_at(0, &mut buf)?;
        Ok(codec::decode(&buf)?)
    }

    fn write_meta(&mut self, meta: &FileMeta<M>) -> Result<(), StoreError> {
        self.write_at(0, &codec::encode(meta))
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), StoreError> {
        let path = &self.path;
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.read_exact(buf))
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), StoreError> {
        let path = &self.path;
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.write_all(buf))
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })
    }
}
