//! Cache Module
//!
//! Provides a bounded LRU cache with background preloading.

mod accessor;
mod guard;
mod handle;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use accessor::{PreloadCache, DEFAULT_IN_FLIGHT_TIMEOUT};
pub use handle::Handle;
pub use stats::CacheStats;

pub(crate) use accessor::CacheShared;
pub(crate) use guard::AccessGuard;
pub(crate) use lru::RecencyList;
pub(crate) use stats::StatsCounters;
pub(crate) use store::EntryStore;
#[cfg(test)]
pub(crate) use store::clamp_capacity;

// == Public Constants ==
/// Smallest capacity a cache accepts
pub const MIN_CAPACITY: usize = 3;

/// Largest capacity a cache accepts
pub const MAX_CAPACITY: usize = 4096;
