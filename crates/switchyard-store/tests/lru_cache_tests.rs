// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]

use std::cell::RefCell;
use std::rc::Rc;

use switchyard_store::LruCache;

#[test]
fn evicts_least_recently_used_first() {
    let mut cache: LruCache<u32> = LruCache::new(2);
    cache.upsert(&1, b"one", false);
    cache.upsert(&2, b"two", false);
    // Touch 1 so that 2 becomes the eviction candidate.
    assert_eq!(cache.get(&1), Some(b"one".as_slice()));
    cache.upsert(&3, b"three", false);
    assert_eq!(cache.get(&2), None);
    assert_eq!(cache.get(&1), Some(b"one".as_slice()));
    assert_eq!(cache.get(&3), Some(b"three".as_slice()));
}

#[test]
fn upsert_reports_whether_bytes_changed() {
    let mut cache: LruCache<u32> = LruCache::new(4);
    assert!(cache.upsert(&1, b"a", false));
    assert!(!cache.upsert(&1, b"a", false));
    assert!(cache.upsert(&1, b"b", false));
    assert_eq!(cache.len(), 1);
}

#[test]
fn dirty_entries_are_flushed_on_eviction() {
    let flushed: Rc<RefCell<Vec<(u32, Vec<u8>)>>> = Rc::default();
    let sink = Rc::clone(&flushed);
    let mut cache: LruCache<u32> = LruCache::with_before_destroy(
        2,
        Box::new(move |key, value| {
            sink.borrow_mut().push((*key, value.to_vec()));
        }),
    );
    cache.upsert(&1, b"dirty", true);
    cache.upsert(&2, b"clean", false);
    cache.upsert(&3, b"next", false);
    assert_eq!(flushed.borrow().as_slice(), &[(1, b"dirty".to_vec())]);
    // The clean entry (2) is now the LRU; evicting it must not flush.
    cache.upsert(&4, b"more", false);
    assert_eq!(flushed.borrow().len(), 1);
}

#[test]
fn remove_flushes_only_dirty_entries() {
    let flushed: Rc<RefCell<Vec<u32>>> = Rc::default();
    let sink = Rc::clone(&flushed);
    let mut cache: LruCache<u32> = LruCache::with_before_destroy(
        4,
        Box::new(move |key, _| {
            sink.borrow_mut().push(*key);
        }),
    );
    cache.upsert(&1, b"a", true);
    cache.upsert(&2, b"b", false);
    cache.remove(&1);
    cache.remove(&2);
    cache.remove(&99);
    assert_eq!(flushed.borrow().as_slice(), &[1]);
    assert!(cache.is_empty());
}

#[test]
fn drop_flushes_remaining_dirty_entries() {
    let flushed: Rc<RefCell<Vec<u32>>> = Rc::default();
    let sink = Rc::clone(&flushed);
    {
        let mut cache: LruCache<u32> = LruCache::with_before_destroy(
            4,
            Box::new(move |key, _| {
                sink.borrow_mut().push(*key);
            }),
        );
        cache.upsert(&7, b"x", true);
        cache.upsert(&8, b"y", true);
    }
    let mut seen = flushed.borrow().clone();
    seen.sort_unstable();
    assert_eq!(seen, vec![7, 8]);
}
