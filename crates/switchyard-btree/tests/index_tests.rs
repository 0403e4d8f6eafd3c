// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]

use switchyard_btree::{index_order, leaf_order, Index, StrIndex};
use switchyard_store::Varchar;
use tempfile::TempDir;

const M: usize = index_order(12);
const L: usize = leaf_order(12);
type U64Index = Index<u64, M, L>;

#[test]
fn insert_then_find_one_id() {
    let dir = TempDir::new().unwrap();
    let mut ix: U64Index = Index::open(&dir.path().join("ix")).unwrap();
    assert!(ix.is_empty().unwrap());
    ix.insert(7, 70).unwrap();
    ix.insert(8, 80).unwrap();
    assert_eq!(ix.find_one(&7).unwrap(), Some(70));
    assert_eq!(ix.find_one(&9).unwrap(), None);
    assert!(!ix.is_empty().unwrap());
}

#[test]
fn find_many_returns_ids_ascending() {
    let dir = TempDir::new().unwrap();
    let mut ix: U64Index = Index::open(&dir.path().join("ix")).unwrap();
    for id in [30, 10, 20] {
        ix.insert(5, id).unwrap();
    }
    assert_eq!(ix.find_many(&5).unwrap(), vec![10, 20, 30]);
    ix.remove(5, 20).unwrap();
    assert_eq!(ix.find_many(&5).unwrap(), vec![10, 30]);
}

#[test]
fn str_index_hashes_transparently() {
    let dir = TempDir::new().unwrap();
    let mut ix = StrIndex::open(&dir.path().join("names")).unwrap();
    let alice: Varchar<20> = Varchar::new("alice").unwrap();
    let bob: Varchar<20> = Varchar::new("bob").unwrap();
    ix.insert(&alice, 1).unwrap();
    ix.insert(&bob, 2).unwrap();
    assert_eq!(ix.find_one(&alice).unwrap(), Some(1));
    assert_eq!(ix.find_one(&bob).unwrap(), Some(2));
    ix.remove(&alice, 1).unwrap();
    assert_eq!(ix.find_one(&alice).unwrap(), None);
    assert_eq!(ix.find_one(&bob).unwrap(), Some(2));
}

#[test]
fn str_index_supports_duplicate_keys() {
    let dir = TempDir::new().unwrap();
    let mut ix = StrIndex::open(&dir.path().join("stops")).unwrap();
    let station: Varchar<30> = Varchar::new("union-depot").unwrap();
    for id in [12, 3, 7] {
        ix.insert(&station, id).unwrap();
    }
    assert_eq!(ix.find_many(&station).unwrap(), vec![3, 7, 12]);
}

#[test]
fn truncate_resets_the_index() {
    let dir = TempDir::new().unwrap();
    let mut ix = StrIndex::open(&dir.path().join("names")).unwrap();
    let key: Varchar<20> = Varchar::new("root").unwrap();
    ix.insert(&key, 0).unwrap();
    ix.truncate().unwrap();
    assert!(ix.is_empty().unwrap());
    assert_eq!(ix.find_one(&key).unwrap(), None);
}
