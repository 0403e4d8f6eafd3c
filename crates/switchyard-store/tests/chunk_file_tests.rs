// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]

use switchyard_store::{ChunkFile, DEFAULT_CHUNK_SIZE};
use tempfile::TempDir;

fn open(dir: &TempDir, name: &str) -> ChunkFile<i64> {
    ChunkFile::open(&dir.path().join(name), DEFAULT_CHUNK_SIZE, |_| Ok(())).unwrap()
}

#[test]
fn push_assigns_sequential_ids() {
    let dir = TempDir::new().unwrap();
    let mut file = open(&dir, "seq");
    for expected in 0..5_u32 {
        let id = file.push(&[expected as u8; 16]).unwrap();
        assert_eq!(id, expected);
    }
}

#[test]
fn get_returns_what_set_wrote() {
    let dir = TempDir::new().unwrap();
    let mut file = open(&dir, "rw");
    let id = file.push(&[1_u8; 32]).unwrap();
    file.set(id, &[9_u8; 32]).unwrap();
    let mut buf = [0_u8; 32];
    file.get(id, &mut buf).unwrap();
    assert_eq!(buf, [9_u8; 32]);

    // Bypass the cache and confirm the write actually hit the file.
    file.clear_cache();
    let mut buf = [0_u8; 32];
    file.get(id, &mut buf).unwrap();
    assert_eq!(buf, [9_u8; 32]);
}

#[test]
fn freelist_reuses_released_ids_lifo() {
    let dir = TempDir::new().unwrap();
    let mut file = open(&dir, "freelist");
    for i in 0..4_u8 {
        file.push(&[i; 8]).unwrap();
    }
    file.remove(1).unwrap();
    file.remove(3).unwrap();
    // Most recently released first, then the earlier one, then growth.
    assert_eq!(file.push(&[9; 8]).unwrap(), 3);
    assert_eq!(file.push(&[9; 8]).unwrap(), 1);
    assert_eq!(file.push(&[9; 8]).unwrap(), 4);
}

#[test]
fn remove_preserves_user_metadata() {
    let dir = TempDir::new().unwrap();
    let mut file = open(&dir, "meta");
    let id = file.push(&[7; 8]).unwrap();
    file.set_meta(&42).unwrap();
    file.remove(id).unwrap();
    assert_eq!(file.meta().unwrap(), 42);
    // Reallocation drains the freelist without clobbering it either.
    file.push(&[8; 8]).unwrap();
    assert_eq!(file.meta().unwrap(), 42);
}

#[test]
fn metadata_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("persist");
    {
        let mut file: ChunkFile<i64> =
            ChunkFile::open(&path, DEFAULT_CHUNK_SIZE, |_| Ok(())).unwrap();
        file.push(&[3; 8]).unwrap();
        file.set_meta(&-5).unwrap();
    }
    let mut file: ChunkFile<i64> = ChunkFile::open(&path, DEFAULT_CHUNK_SIZE, |_| Ok(())).unwrap();
    assert_eq!(file.meta().unwrap(), -5);
    let mut buf = [0_u8; 8];
    file.get(0, &mut buf).unwrap();
    assert_eq!(buf, [3; 8]);
}

#[test]
fn initializer_runs_only_on_creation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("init");
    let mut ran = false;
    let _file: ChunkFile<()> = ChunkFile::open(&path, DEFAULT_CHUNK_SIZE, |_| {
        ran = true;
        Ok(())
    })
    .unwrap();
    assert!(ran);

    let mut ran_again = false;
    let _file: ChunkFile<()> = ChunkFile::open(&path, DEFAULT_CHUNK_SIZE, |_| {
        ran_again = true;
        Ok(())
    })
    .unwrap();
    assert!(!ran_again);
}

#[test]
fn truncate_restarts_allocation_at_zero() {
    let dir = TempDir::new().unwrap();
    let mut file = open(&dir, "trunc");
    for i in 0..3_u8 {
        file.push(&[i; 8]).unwrap();
    }
    file.set_meta(&7).unwrap();
    file.truncate().unwrap();
    assert_eq!(file.meta().unwrap(), 0);
    assert_eq!(file.push(&[1; 8]).unwrap(), 0);
}
