//! Preload Cache Module
//!
//! Foreground API: synchronous `get` backed by the entry store, with misses
//! loaded inline and hinted keys loaded ahead of time by the preload worker.

use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::cache::{AccessGuard, CacheStats, Handle, StatsCounters};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::loader::Loader;
use crate::tasks::{spawn_preload_worker, PreloadQueue};

/// Default bound on how long `get` waits for the worker to finish its key.
pub const DEFAULT_IN_FLIGHT_TIMEOUT: Duration = Duration::from_secs(10);

// == Shared State ==
/// State reachable from both foreground callers and the preload worker.
pub(crate) struct CacheShared<K, V> {
    pub(crate) store: AccessGuard<K, V>,
    pub(crate) preload: PreloadQueue<K>,
    pub(crate) loader: Box<dyn Loader<K, V>>,
    pub(crate) stats: StatsCounters,
}

// == Preload Cache ==
/// Bounded LRU cache with a background preloading worker.
///
/// Exactly one worker thread runs for the lifetime of the cache. Dropping the
/// cache stops the worker and waits for any load it has in progress.
///
/// # Example
/// ```
/// use preload_cache::PreloadCache;
///
/// let cache = PreloadCache::new(8, |page: &u32| -> anyhow::Result<String> {
///     Ok(format!("page {}", page))
/// })
/// .unwrap();
///
/// let page = cache.get_with_prefetch(&1, &2).unwrap();
/// assert_eq!(&*page, "page 1");
/// ```
pub struct PreloadCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    shared: Arc<CacheShared<K, V>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    in_flight_timeout: Duration,
}

impl<K, V> PreloadCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache holding at most `capacity` entries and starts its
    /// preload worker.
    ///
    /// `capacity` is clamped to `[MIN_CAPACITY, MAX_CAPACITY]`; out-of-range
    /// values fall back to the minimum.
    pub fn new<L>(capacity: usize, loader: L) -> Result<Self>
    where
        L: Loader<K, V>,
    {
        Self::with_in_flight_timeout(capacity, DEFAULT_IN_FLIGHT_TIMEOUT, loader)
    }

    /// Creates a cache from loaded configuration.
    pub fn from_config<L>(config: &Config, loader: L) -> Result<Self>
    where
        L: Loader<K, V>,
    {
        Self::with_in_flight_timeout(config.capacity, config.in_flight_timeout(), loader)
    }

    /// Creates a cache with an explicit bound on the in-flight wait in `get`.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries, clamped to
    ///   `[MIN_CAPACITY, MAX_CAPACITY]` (out-of-range values use the minimum)
    /// * `in_flight_timeout` - How long `get` waits for the preload worker to
    ///   finish the same key before loading it directly
    /// * `loader` - Produces a value for a key; shared by `get` and the worker
    ///
    /// # Returns
    /// The cache with its preload worker running, or
    /// `CacheError::WorkerSpawn` if the thread could not be started.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use preload_cache::PreloadCache;
    ///
    /// let cache = PreloadCache::with_in_flight_timeout(
    ///     4,
    ///     Duration::from_millis(500),
    ///     |key: &String| -> anyhow::Result<usize> { Ok(key.len()) },
    /// )
    /// .unwrap();
    /// assert_eq!(cache.capacity(), 4);
    /// ```
    pub fn with_in_flight_timeout<L>(
        capacity: usize,
        in_flight_timeout: Duration,
        loader: L,
    ) -> Result<Self>
    where
        L: Loader<K, V>,
    {
        let shared = Arc::new(CacheShared {
            store: AccessGuard::new(capacity),
            preload: PreloadQueue::new(),
            loader: Box::new(loader),
            stats: StatsCounters::default(),
        });

        let worker = spawn_preload_worker(Arc::clone(&shared))?;
        info!(
            "Preload cache initialized: capacity={}, in_flight_timeout={}ms",
            shared.store.read().capacity(),
            in_flight_timeout.as_millis()
        );

        Ok(Self {
            shared,
            worker: Mutex::new(Some(worker)),
            in_flight_timeout,
        })
    }

    // == Get ==
    /// Returns a handle to the value for `key`, loading it on a miss.
    ///
    /// # Steps
    /// 1. If the preload worker is loading this exact key, wait for it to
    ///    finish, bounded by the in-flight timeout. On timeout, continue.
    /// 2. On a hit, promote the entry and return a handle to it.
    /// 3. On a miss, call the loader on this thread with no cache lock held,
    ///    store the result and return a handle to it.
    ///
    /// # Arguments
    /// * `key` - The key to fetch
    ///
    /// # Returns
    /// A `Handle` that keeps the value alive even if the cache later evicts
    /// or replaces it, or `CacheError::Load` if the loader failed.
    ///
    /// # Example
    /// ```
    /// use preload_cache::PreloadCache;
    ///
    /// let cache = PreloadCache::new(3, |n: &u64| -> anyhow::Result<u64> { Ok(n * n) }).unwrap();
    /// assert_eq!(*cache.get(&9).unwrap(), 81);
    /// assert!(cache.contains(&9));
    /// ```
    pub fn get(&self, key: &K) -> Result<Handle<V>> {
        if !self
            .shared
            .preload
            .wait_while_in_flight(key, self.in_flight_timeout)
        {
            warn!(
                "Timed out after {}ms waiting on preload of {:?}, loading directly",
                self.in_flight_timeout.as_millis(),
                key
            );
        }

        let hit = self.shared.store.read().lookup(key).cloned();
        if let Some(value) = hit {
            self.shared.store.write().promote(key);
            self.shared.stats.record_hit();
            return Ok(Handle::new(value));
        }

        self.shared.stats.record_miss();
        debug!("Cache miss for {:?}, loading synchronously", key);

        let value = self
            .shared
            .loader
            .load(key)
            .map(Arc::new)
            .map_err(|cause| CacheError::load(key, cause))?;

        self.shared
            .store
            .write()
            .insert_or_promote(key.clone(), Arc::clone(&value));
        Ok(Handle::new(value))
    }

    // == Get With Prefetch ==
    /// Like `get`, but first asks the worker to preload `next_key`.
    ///
    /// The prefetch is skipped when `next_key` equals `key`.
    pub fn get_with_prefetch(&self, key: &K, next_key: &K) -> Result<Handle<V>> {
        if next_key != key {
            self.request_preload(next_key.clone());
        }
        self.get(key)
    }

    // == Request Preload ==
    /// Queues `key` for background loading.
    ///
    /// Does nothing if the key is already cached, already queued, or being
    /// loaded by the worker. Returns true if the key was queued.
    pub fn request_preload(&self, key: K) -> bool {
        if self.shared.store.read().contains(&key) {
            return false;
        }
        let queued = self.shared.preload.enqueue(key);
        if queued {
            debug!("Preload queued, {} pending", self.shared.preload.pending_len());
        }
        queued
    }

    // == Request Preload Batch ==
    /// Queues several keys with the same rules as `request_preload`, waking
    /// the worker once. Returns how many keys were queued.
    pub fn request_preload_batch<I>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
    {
        let uncached: Vec<K> = {
            let store = self.shared.store.read();
            keys.into_iter().filter(|key| !store.contains(key)).collect()
        };
        let queued = self.shared.preload.enqueue_batch(uncached);
        debug!("Preload batch queued {} keys", queued);
        queued
    }

    // == Put ==
    /// Stores a value directly, bypassing the loader.
    pub fn put(&self, key: K, value: V) {
        self.shared
            .store
            .write()
            .insert_or_promote(key, Arc::new(value));
    }

    pub fn contains(&self, key: &K) -> bool {
        self.shared.store.read().contains(key)
    }

    /// Returns the number of cached entries.
    pub fn size(&self) -> usize {
        self.shared.store.read().len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.store.read().capacity()
    }

    // == Set Capacity ==
    /// Changes the capacity, evicting least recently used entries right away
    /// if the cache is over the new bound. Returns the number evicted.
    pub fn set_capacity(&self, capacity: usize) -> usize {
        self.shared.store.write().set_capacity(capacity)
    }

    /// Drops every cached entry. Outstanding handles stay valid.
    pub fn clear(&self) {
        self.shared.store.write().clear();
        debug!("Cache cleared");
    }

    /// Returns cached keys from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        self.shared.store.read().keys()
    }

    /// Returns the number of keys queued for preload but not yet started.
    pub fn pending_preloads(&self) -> usize {
        self.shared.preload.pending_len()
    }

    // == Wait For Preload Idle ==
    /// Blocks until no preload is queued or in progress.
    pub fn wait_for_preload_idle(&self) {
        self.shared.preload.wait_until_idle(None);
    }

    /// Bounded variant of `wait_for_preload_idle`. Returns false on timeout.
    pub fn wait_for_preload_idle_timeout(&self, timeout: Duration) -> bool {
        self.shared.preload.wait_until_idle(Some(timeout))
    }

    // == Stats ==
    /// Returns a snapshot of cache metrics.
    pub fn stats(&self) -> CacheStats {
        let store = self.shared.store.read();
        self.shared
            .stats
            .snapshot(store.evictions(), store.len(), store.capacity())
    }

    // == Shutdown ==
    /// Stops the preload worker and waits for its current load to finish.
    ///
    /// Queued keys are discarded. Later preload requests are ignored while
    /// `get` keeps working synchronously. Calling this more than once is a
    /// no-op.
    pub fn shutdown(&self) {
        let worker = match self.worker.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(worker) = worker else {
            return;
        };

        self.shared.preload.stop();
        if worker.join().is_err() {
            error!("Preload worker panicked");
        } else {
            info!("Preload worker shut down");
        }
    }
}

impl<K, V> Drop for PreloadCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<K, V> fmt::Debug for PreloadCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreloadCache")
            .field("size", &self.size())
            .field("capacity", &self.capacity())
            .field("pending_preloads", &self.pending_preloads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_cache(capacity: usize) -> (PreloadCache<u32, String>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = PreloadCache::new(capacity, move |key: &u32| -> anyhow::Result<String> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(format!("value_{}", key))
        })
        .unwrap();
        (cache, calls)
    }

    #[test]
    fn test_get_miss_then_hit() {
        let (cache, calls) = counting_cache(4);

        assert_eq!(&*cache.get(&1).unwrap(), "value_1");
        assert_eq!(&*cache.get(&1).unwrap(), "value_1");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_get_load_error_propagates() {
        let cache = PreloadCache::new(4, |key: &u32| -> anyhow::Result<String> {
            anyhow::bail!("cannot decode {}", key)
        })
        .unwrap();

        let err = cache.get(&9).unwrap_err();
        assert!(matches!(err, CacheError::Load { .. }));
        assert!(err.to_string().contains("cannot decode 9"));
        assert!(!cache.contains(&9));
    }

    #[test]
    fn test_put_bypasses_loader() {
        let (cache, calls) = counting_cache(4);

        cache.put(5, "direct".to_string());

        assert_eq!(&*cache.get(&5).unwrap(), "direct");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_get_promotes_entry() {
        let (cache, _) = counting_cache(3);
        for key in 1..=3 {
            cache.put(key, key.to_string());
        }

        cache.get(&1).unwrap();
        assert_eq!(cache.keys(), vec![1, 3, 2]);
    }

    #[test]
    fn test_prefetch_same_key_not_queued() {
        let (cache, calls) = counting_cache(4);

        cache.get_with_prefetch(&2, &2).unwrap();
        cache.wait_for_preload_idle();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().preloads_completed, 0);
    }

    #[test]
    fn test_request_preload_skips_cached() {
        let (cache, _) = counting_cache(4);
        cache.put(1, "one".to_string());

        assert!(!cache.request_preload(1));
        assert_eq!(cache.request_preload_batch(vec![1, 2, 3]), 2);
        cache.wait_for_preload_idle();

        assert!(cache.contains(&2));
        assert!(cache.contains(&3));
    }

    #[test]
    fn test_set_capacity_and_clear() {
        let (cache, _) = counting_cache(8);
        for key in 0..8 {
            cache.put(key, key.to_string());
        }

        assert_eq!(cache.set_capacity(5), 3);
        assert_eq!(cache.size(), 5);
        assert_eq!(cache.capacity(), 5);

        cache.clear();
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (cache, calls) = counting_cache(4);

        cache.shutdown();
        cache.shutdown();

        assert!(!cache.request_preload(1));
        assert_eq!(&*cache.get(&1).unwrap(), "value_1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_debug_output() {
        let (cache, _) = counting_cache(4);
        cache.put(1, "one".to_string());
        let rendered = format!("{:?}", cache);
        assert!(rendered.contains("size: 1"));
        assert!(rendered.contains("capacity: 4"));
    }
}
