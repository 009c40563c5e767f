//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions and
//! background preload outcomes.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of cache metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Foreground lookups served from the store
    pub hits: u64,
    /// Foreground lookups that had to call the loader
    pub misses: u64,
    /// Entries dropped to honor the capacity bound
    pub evictions: u64,
    /// Background loads inserted into the store
    pub preloads_completed: u64,
    /// Background loads whose loader returned an error
    pub preloads_failed: u64,
    /// Dequeued preloads skipped because the key was already cached
    pub preloads_skipped: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Current capacity bound
    pub capacity: usize,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the foreground hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Counters ==
/// Lock-free counters updated from the foreground and the preload worker.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    preloads_completed: AtomicU64,
    preloads_failed: AtomicU64,
    preloads_skipped: AtomicU64,
}

impl StatsCounters {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preload_completed(&self) {
        self.preloads_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preload_failed(&self) {
        self.preloads_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preload_skipped(&self) {
        self.preloads_skipped.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Combines the counters with store-owned figures into a snapshot.
    pub fn snapshot(&self, evictions: u64, total_entries: usize, capacity: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions,
            preloads_completed: self.preloads_completed.load(Ordering::Relaxed),
            preloads_failed: self.preloads_failed.load(Ordering::Relaxed),
            preloads_skipped: self.preloads_skipped.load(Ordering::Relaxed),
            total_entries,
            capacity,
        }
    }
}
