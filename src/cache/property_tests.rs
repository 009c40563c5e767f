//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the entry store's structural invariants.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::{clamp_capacity, EntryStore, MAX_CAPACITY, MIN_CAPACITY};

// == Strategies ==
/// Small key space so sequences revisit keys often
fn key_strategy() -> impl Strategy<Value = u16> {
    0u16..64
}

#[derive(Debug, Clone)]
enum StoreOp {
    Insert(u16),
    Promote(u16),
    EvictLru,
    SetCapacity(usize),
}

fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        4 => key_strategy().prop_map(StoreOp::Insert),
        2 => key_strategy().prop_map(StoreOp::Promote),
        1 => Just(StoreOp::EvictLru),
        1 => (0usize..40).prop_map(StoreOp::SetCapacity),
    ]
}

fn apply(store: &mut EntryStore<u16, u32>, op: &StoreOp, step: u32) {
    match op {
        StoreOp::Insert(key) => {
            store.insert_or_promote(*key, Arc::new(step));
        }
        StoreOp::Promote(key) => {
            store.promote(key);
        }
        StoreOp::EvictLru => {
            store.evict_lru();
        }
        StoreOp::SetCapacity(n) => {
            store.set_capacity(*n);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // For any operation sequence, size never exceeds capacity and the
    // recency order holds each stored key exactly once.
    #[test]
    fn prop_capacity_and_index_agree(
        initial in 0usize..20,
        ops in prop::collection::vec(store_op_strategy(), 1..120)
    ) {
        let mut store = EntryStore::new(initial);

        for (step, op) in ops.iter().enumerate() {
            apply(&mut store, op, step as u32);

            prop_assert!(store.len() <= store.capacity());

            let keys = store.keys();
            prop_assert_eq!(keys.len(), store.len());
            let unique: HashSet<_> = keys.iter().copied().collect();
            prop_assert_eq!(unique.len(), keys.len(), "duplicate key in recency order");
            for key in &keys {
                prop_assert!(store.lookup(key).is_some());
            }
        }
    }

    // Capacity is always inside the supported range after clamping.
    #[test]
    fn prop_clamp_capacity_in_range(requested in 0usize..10_000) {
        let capacity = clamp_capacity(requested);
        prop_assert!((MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity));
        if (MIN_CAPACITY..=MAX_CAPACITY).contains(&requested) {
            prop_assert_eq!(capacity, requested);
        }
    }

    // Shrinking capacity leaves exactly the most recently used entries.
    #[test]
    fn prop_set_capacity_keeps_mru_prefix(
        keys in prop::collection::hash_set(key_strategy(), 3..40),
        new_capacity in MIN_CAPACITY..20
    ) {
        let mut store = EntryStore::new(64);
        for (i, key) in keys.iter().enumerate() {
            store.insert_or_promote(*key, Arc::new(i as u32));
        }
        let before = store.keys();

        store.set_capacity(new_capacity);

        let expected: Vec<u16> = before.into_iter().take(new_capacity).collect();
        prop_assert_eq!(store.keys(), expected);
    }

    // Filling a store to capacity and adding one more distinct key evicts
    // the first key inserted, unless it was read in between.
    #[test]
    fn prop_lru_eviction_order(
        keys in prop::collection::hash_set(key_strategy(), 4..20),
        touch_first in any::<bool>()
    ) {
        let keys: Vec<u16> = keys.into_iter().collect();
        let capacity = keys.len() - 1;
        let (fill, extra) = keys.split_at(capacity);

        let mut store = EntryStore::new(capacity);
        for key in fill {
            store.insert_or_promote(*key, Arc::new(0));
        }
        if touch_first {
            store.promote(&fill[0]);
        }

        let evicted = store.insert_or_promote(extra[0], Arc::new(1)).map(|(k, _)| k);

        if touch_first {
            prop_assert_eq!(evicted, Some(fill[1]));
            prop_assert!(store.contains(&fill[0]));
        } else {
            prop_assert_eq!(evicted, Some(fill[0]));
            prop_assert!(!store.contains(&fill[0]));
        }
        prop_assert_eq!(store.len(), capacity);
    }

    // Re-inserting a present key never changes the length.
    #[test]
    fn prop_reinsert_is_idempotent_in_size(
        keys in prop::collection::vec(key_strategy(), 1..30),
        repeat in 1usize..10
    ) {
        let mut store = EntryStore::new(MAX_CAPACITY);
        for key in &keys {
            store.insert_or_promote(*key, Arc::new(0));
        }
        let len = store.len();

        for i in 0..repeat {
            store.insert_or_promote(keys[0], Arc::new(i as u32));
            prop_assert_eq!(store.len(), len);
        }
        prop_assert_eq!(store.keys()[0], keys[0]);
    }
}
