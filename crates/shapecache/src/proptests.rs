use std::collections::VecDeque;

use proptest::prelude::*;

use crate::entry::CacheEntry;
use crate::hash_table::{probe_sequence, HashElement, LruHashTable};

#[derive(Debug, Clone)]
enum Op {
    Insert(Vec<u32>),
    Find(Vec<u32>),
}

fn key() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0x61u32..0x65, 1..4)
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => key().prop_map(Op::Insert),
        1 => key().prop_map(Op::Find),
    ]
}

fn entry(code_points: &[u32]) -> CacheEntry {
    CacheEntry::new(code_points).unwrap()
}

/// Newest-first reference list with the same eviction rule
fn touch(model: &mut VecDeque<Vec<u32>>, key: &[u32]) -> bool {
    match model.iter().position(|k| k.as_slice() == key) {
        Some(i) => {
            if let Some(k) = model.remove(i) {
                model.push_front(k);
            }
            true
        },
        None => false,
    }
}

// Property: the table evicts exactly what a plain LRU list would
proptest! {
    #[test]
    fn prop_matches_reference_lru(ops in prop::collection::vec(op(), 0..200)) {
        let mut table = LruHashTable::try_new(7).unwrap();
        let full = table.full_threshold();
        let mut model: VecDeque<Vec<u32>> = VecDeque::new();

        for op in ops {
            match op {
                Op::Insert(k) => {
                    table.insert(entry(&k));
                    if !touch(&mut model, &k) {
                        model.push_front(k);
                        if model.len() > full {
                            model.pop_back();
                        }
                    }
                },
                Op::Find(k) => {
                    let found = table.find(&entry(&k)).is_some();
                    prop_assert_eq!(found, touch(&mut model, &k));
                },
            }

            let recent: Vec<Vec<u32>> = table.iter_recent().map(|e| e.key().to_vec()).collect();
            prop_assert_eq!(recent, model.iter().cloned().collect::<Vec<_>>());
        }
    }
}

// Property: the same key inserted twice is stored once
proptest! {
    #[test]
    fn prop_insert_idempotent(k in key()) {
        let mut table = LruHashTable::try_new(31).unwrap();
        prop_assert!(!table.insert(entry(&k)).is_existing());
        let again = table.insert(entry(&k));
        prop_assert!(again.is_existing());
        prop_assert_eq!(again.entry().key(), k.as_slice());
        prop_assert_eq!(table.len(), 1);
    }
}

// Property: the live count never passes the full threshold
proptest! {
    #[test]
    fn prop_capacity_bound(size in 3usize..64, keys in prop::collection::vec(key(), 0..300)) {
        let mut table = LruHashTable::try_new(size).unwrap();
        for k in keys {
            let before = table.stats();
            let inserted = !table.insert(entry(&k)).is_existing();
            let after = table.stats();
            prop_assert!(after.live <= after.full_threshold);
            if inserted && before.live == before.full_threshold {
                prop_assert_eq!(after.evictions, before.evictions + 1);
            } else {
                prop_assert_eq!(after.evictions, before.evictions);
            }
        }
    }
}

// Property: keys are equal exactly when their code points are
proptest! {
    #[test]
    fn prop_key_equality_exact(a in key(), b in key()) {
        prop_assert_eq!(entry(&a).key_eq(&entry(&b)), a == b);
    }
}

// Property: a probe walk stays in the table and has exactly `size` steps
proptest! {
    #[test]
    fn prop_probe_walk_bounded(size in 1u16..500, h in any::<u16>(), h1 in any::<u16>()) {
        let walk: Vec<u16> = probe_sequence(h % size, h1 % size, size).collect();
        prop_assert_eq!(walk.len(), size as usize);
        prop_assert!(walk.iter().all(|&o| o < size));
    }
}
