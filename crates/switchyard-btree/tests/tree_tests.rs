// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]

use switchyard_btree::{index_order, leaf_order, BpTree};
use tempfile::TempDir;

// Production-sized orders for a (u64, u32) entry.
const M: usize = index_order(12);
const L: usize = leaf_order(12);

type Tree = BpTree<u64, u32, M, L>;
type TinyTree = BpTree<u64, u32, 4, 4>;

fn open(dir: &TempDir, name: &str) -> Tree {
    BpTree::open(&dir.path().join(name)).unwrap()
}

#[test]
fn empty_tree_finds_nothing() {
    let dir = TempDir::new().unwrap();
    let mut tree = open(&dir, "t");
    assert!(tree.is_empty().unwrap());
    assert_eq!(tree.find_one(&1).unwrap(), None);
    assert!(tree.find_many(&1).unwrap().is_empty());
    assert!(tree.scan_all().unwrap().is_empty());
}

#[test]
fn insert_then_find_one() {
    let dir = TempDir::new().unwrap();
    let mut tree = open(&dir, "t");
    tree.insert(10, 100).unwrap();
    tree.insert(20, 200).unwrap();
    assert_eq!(tree.find_one(&10).unwrap(), Some(100));
    assert_eq!(tree.find_one(&20).unwrap(), Some(200));
    assert_eq!(tree.find_one(&15).unwrap(), None);
    assert!(!tree.is_empty().unwrap());
}

#[test]
fn duplicate_keys_come_back_in_value_order() {
    let dir = TempDir::new().unwrap();
    let mut tree = open(&dir, "t");
    for value in [5_u32, 1, 9, 3, 7] {
        tree.insert(42, value).unwrap();
    }
    tree.insert(41, 1000).unwrap();
    tree.insert(43, 0).unwrap();
    assert_eq!(tree.find_many(&42).unwrap(), vec![1, 3, 5, 7, 9]);
    assert_eq!(tree.find_one(&42).unwrap(), Some(1));
}

#[test]
fn scan_all_is_globally_sorted() {
    let dir = TempDir::new().unwrap();
    let mut tree = open(&dir, "t");
    for i in (0..500_u32).rev() {
        tree.insert(u64::from(i % 7), i).unwrap();
    }
    let all = tree.scan_all().unwrap();
    assert_eq!(all.len(), 500);
    assert!(all.windows(2).all(|w| w[0] < w[1]));
    tree.validate().unwrap();
}

#[test]
fn modulus_stress_returns_the_expected_group() {
    // 10 000 pairs (i mod 97, i); every group must come back complete and
    // ascending, through many node splits.
    let dir = TempDir::new().unwrap();
    let mut tree = open(&dir, "t");
    for i in 0..10_000_u32 {
        tree.insert(u64::from(i % 97), i).unwrap();
    }
    let expected: Vec<u32> = (0..10_000).filter(|i| i % 97 == 42).collect();
    assert_eq!(tree.find_many(&42).unwrap(), expected);
    tree.validate().unwrap();
}

#[test]
fn remove_unwinds_to_an_identical_chain() {
    let dir = TempDir::new().unwrap();
    let mut tree: TinyTree = BpTree::open(&dir.path().join("tiny")).unwrap();
    for i in 0..64_u32 {
        tree.insert(u64::from(i), i).unwrap();
    }
    let baseline = tree.scan_all().unwrap();
    for round in 0..1000_u32 {
        tree.insert(17, 1_000_000 + round).unwrap();
        tree.remove(17, 1_000_000 + round).unwrap();
    }
    assert_eq!(tree.scan_all().unwrap(), baseline);
    tree.validate().unwrap();
}

#[test]
fn remove_everything_leaves_an_empty_tree() {
    let dir = TempDir::new().unwrap();
    let mut tree: TinyTree = BpTree::open(&dir.path().join("tiny")).unwrap();
    for i in 0..128_u32 {
        tree.insert(u64::from(i / 3), i).unwrap();
    }
    for i in 0..128_u32 {
        tree.remove(u64::from(i / 3), i).unwrap();
        tree.validate().unwrap();
    }
    assert!(tree.is_empty().unwrap());
    assert!(tree.scan_all().unwrap().is_empty());
    // The tree is usable again afterwards.
    tree.insert(1, 1).unwrap();
    assert_eq!(tree.find_one(&1).unwrap(), Some(1));
}

#[test]
fn contents_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("persist");
    {
        let mut tree: Tree = BpTree::open(&path).unwrap();
        for i in 0..300_u32 {
            tree.insert(u64::from(i), i * 2).unwrap();
        }
    }
    let mut tree: Tree = BpTree::open(&path).unwrap();
    assert_eq!(tree.find_one(&250).unwrap(), Some(500));
    assert_eq!(tree.scan_all().unwrap().len(), 300);
    tree.validate().unwrap();
}

#[test]
fn truncate_empties_the_tree() {
    let dir = TempDir::new().unwrap();
    let mut tree = open(&dir, "t");
    for i in 0..100_u32 {
        tree.insert(u64::from(i), i).unwrap();
    }
    tree.truncate().unwrap();
    assert!(tree.is_empty().unwrap());
    tree.insert(5, 5).unwrap();
    assert_eq!(tree.find_one(&5).unwrap(), Some(5));
}
