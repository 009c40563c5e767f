//! Entry Store Module
//!
//! Capacity-bounded key/value storage on top of the recency list.

use std::hash::Hash;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{RecencyList, MAX_CAPACITY, MIN_CAPACITY};

// == Capacity Clamp ==
/// Clamps a requested capacity to the supported range.
///
/// Values outside `[MIN_CAPACITY, MAX_CAPACITY]` are replaced by the minimum.
pub(crate) fn clamp_capacity(requested: usize) -> usize {
    if (MIN_CAPACITY..=MAX_CAPACITY).contains(&requested) {
        requested
    } else {
        MIN_CAPACITY
    }
}

// == Entry Store ==
/// Ordered key/value storage with LRU eviction.
///
/// Not synchronized; see `AccessGuard` for the shared wrapper.
#[derive(Debug)]
pub(crate) struct EntryStore<K, V> {
    /// Entries in recency order
    entries: RecencyList<K, V>,
    /// Maximum number of entries allowed
    capacity: usize,
    /// Entries dropped to honor the capacity bound
    evictions: u64,
}

impl<K, V> EntryStore<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates a new store. `capacity` is clamped.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RecencyList::new(),
            capacity: clamp_capacity(capacity),
            evictions: 0,
        }
    }

    // == Insert Or Promote ==
    /// Stores `value` under `key` at the most recently used position.
    ///
    /// An existing key has its value replaced without changing the length.
    /// A new key arriving at capacity first evicts the least recently used
    /// entry, which is returned.
    pub fn insert_or_promote(&mut self, key: K, value: Arc<V>) -> Option<(K, Arc<V>)> {
        let evicted = if !self.entries.contains(&key) && self.entries.len() >= self.capacity {
            self.evict_lru()
        } else {
            None
        };

        self.entries.push_front(key, value);
        evicted
    }

    // == Lookup ==
    /// Returns the stored value without changing recency order.
    pub fn lookup(&self, key: &K) -> Option<&Arc<V>> {
        self.entries.get(key)
    }

    // == Promote ==
    /// Moves an existing key to the most recently used position.
    pub fn promote(&mut self, key: &K) -> bool {
        self.entries.move_to_front(key)
    }

    // == Evict LRU ==
    /// Removes and returns the least recently used entry.
    pub fn evict_lru(&mut self) -> Option<(K, Arc<V>)> {
        let evicted = self.entries.pop_back();
        if evicted.is_some() {
            self.evictions += 1;
        }
        evicted
    }

    // == Set Capacity ==
    /// Clamps and applies a new capacity, evicting from the LRU end as needed.
    ///
    /// Returns the number of entries evicted.
    pub fn set_capacity(&mut self, requested: usize) -> usize {
        self.capacity = clamp_capacity(requested);

        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            if self.evict_lru().is_none() {
                break;
            }
            evicted += 1;
        }

        if evicted > 0 {
            debug!(
                "Capacity set to {}: evicted {} entries",
                self.capacity, evicted
            );
        }
        evicted
    }

    // == Clear ==
    /// Drops every entry. Not counted as eviction.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Returns keys from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        self.entries.keys()
    }
}
