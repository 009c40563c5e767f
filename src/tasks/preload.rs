//! Preload Task
//!
//! Single background worker that drains a de-duplicated FIFO queue of keys,
//! calls the loader off the foreground path and stores the results.
//!
//! The queue has its own lock. The worker always releases it before touching
//! the entry store, so the two lock domains are never held together.

use std::collections::{HashSet, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::CacheShared;

/// Name given to the background preload thread.
pub const WORKER_THREAD_NAME: &str = "preload-worker";

fn poisoned() -> ! {
    panic!("preload queue lock poisoned; scheduler state may be broken")
}

// == Queue State ==
#[derive(Debug)]
struct QueueState<K> {
    /// Keys waiting for the worker, oldest first
    queue: VecDeque<K>,
    /// Mirror of `queue` for O(1) duplicate checks
    pending: HashSet<K>,
    /// Key the worker is loading right now
    in_flight: Option<K>,
    stopping: bool,
}

impl<K> QueueState<K>
where
    K: Eq + Hash + Clone,
{
    fn push(&mut self, key: K) -> bool {
        if self.stopping || self.pending.contains(&key) || self.in_flight.as_ref() == Some(&key) {
            return false;
        }
        self.pending.insert(key.clone());
        self.queue.push_back(key);
        true
    }

    fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.in_flight.is_none()
    }
}

// == Preload Queue ==
/// Work queue shared by foreground callers and the preload worker.
///
/// `work_ready` wakes the worker when keys arrive or shutdown begins.
/// `progress` wakes foreground waiters whenever the in-flight slot clears.
#[derive(Debug)]
pub(crate) struct PreloadQueue<K> {
    state: Mutex<QueueState<K>>,
    work_ready: Condvar,
    progress: Condvar,
}

impl<K> PreloadQueue<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                pending: HashSet::new(),
                in_flight: None,
                stopping: false,
            }),
            work_ready: Condvar::new(),
            progress: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<K>> {
        self.state.lock().unwrap_or_else(|_| poisoned())
    }

    // == Enqueue ==
    /// Queues a key unless it is pending, in flight, or shutdown has begun.
    ///
    /// Returns true if the key was queued.
    pub fn enqueue(&self, key: K) -> bool {
        let queued = self.lock().push(key);
        if queued {
            self.work_ready.notify_one();
        }
        queued
    }

    // == Enqueue Batch ==
    /// Queues each key with the same rules as `enqueue`, waking the worker once.
    pub fn enqueue_batch<I>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
    {
        let mut queued = 0;
        {
            let mut state = self.lock();
            for key in keys {
                if state.push(key) {
                    queued += 1;
                }
            }
        }
        if queued > 0 {
            self.work_ready.notify_one();
        }
        queued
    }

    // == Next Job ==
    /// Blocks until a key is available and marks it in flight.
    ///
    /// Returns None once shutdown has been requested.
    pub fn next_job(&self) -> Option<K> {
        let mut state = self.lock();
        loop {
            if state.stopping {
                return None;
            }
            if let Some(key) = state.queue.pop_front() {
                state.pending.remove(&key);
                state.in_flight = Some(key.clone());
                return Some(key);
            }
            state = self.work_ready.wait(state).unwrap_or_else(|_| poisoned());
        }
    }

    // == Finish Job ==
    /// Clears the in-flight slot and wakes any waiters.
    pub fn finish_job(&self) {
        self.lock().in_flight = None;
        self.progress.notify_all();
    }

    // == Wait While In Flight ==
    /// Blocks while `key` is the in-flight key, up to `timeout`.
    ///
    /// Returns false if the wait timed out with the key still in flight.
    pub fn wait_while_in_flight(&self, key: &K, timeout: Duration) -> bool {
        let state = self.lock();
        let (_state, result) = self
            .progress
            .wait_timeout_while(state, timeout, |s| s.in_flight.as_ref() == Some(key))
            .unwrap_or_else(|_| poisoned());
        !result.timed_out()
    }

    // == Wait Until Idle ==
    /// Blocks until the queue is empty and nothing is in flight.
    ///
    /// With a timeout, returns false if that bound elapsed first.
    pub fn wait_until_idle(&self, timeout: Option<Duration>) -> bool {
        let state = self.lock();
        match timeout {
            Some(timeout) => {
                let (_state, result) = self
                    .progress
                    .wait_timeout_while(state, timeout, |s| !s.is_idle())
                    .unwrap_or_else(|_| poisoned());
                !result.timed_out()
            }
            None => {
                let _state = self
                    .progress
                    .wait_while(state, |s| !s.is_idle())
                    .unwrap_or_else(|_| poisoned());
                true
            }
        }
    }

    // == Stop ==
    /// Requests shutdown, discarding keys that have not started loading.
    pub fn stop(&self) {
        {
            let mut state = self.lock();
            state.stopping = true;
            state.queue.clear();
            state.pending.clear();
        }
        self.work_ready.notify_all();
        self.progress.notify_all();
    }

    pub fn pending_len(&self) -> usize {
        self.lock().queue.len()
    }

    #[cfg(test)]
    pub fn in_flight(&self) -> Option<K> {
        self.lock().in_flight.clone()
    }
}

/// Spawns the background thread that serves preload requests.
///
/// The worker blocks on the queue while idle, loads one key at a time with no
/// cache lock held, and writes each result into the entry store. A loader
/// error or panic is logged and counted; the key is dropped without retry.
///
/// # Arguments
/// * `shared` - State shared with the foreground `PreloadCache`
///
/// # Returns
/// The worker's JoinHandle. The thread runs until `PreloadQueue::stop` is
/// called; join the handle afterwards to wait for a load in progress.
///
/// # Example
/// ```ignore
/// let worker = spawn_preload_worker(Arc::clone(&shared))?;
/// // Later, during shutdown:
/// shared.preload.stop();
/// worker.join().ok();
/// ```
pub(crate) fn spawn_preload_worker<K, V>(
    shared: Arc<CacheShared<K, V>>,
) -> std::io::Result<JoinHandle<()>>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || run_preload_worker(&shared))
}

fn run_preload_worker<K, V>(shared: &CacheShared<K, V>)
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    info!("Preload worker started");

    while let Some(key) = shared.preload.next_job() {
        preload_one(shared, &key);
        shared.preload.finish_job();
    }

    info!("Preload worker stopped");
}

fn preload_one<K, V>(shared: &CacheShared<K, V>, key: &K)
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    // A foreground miss may have loaded it while it sat in the queue
    if shared.store.read().contains(key) {
        shared.stats.record_preload_skipped();
        debug!("Preload skipped, {:?} already cached", key);
        return;
    }

    // A panicking loader must not take the worker down with the key still
    // marked in flight
    let loaded = panic::catch_unwind(AssertUnwindSafe(|| shared.loader.load(key)));

    match loaded {
        Ok(Ok(value)) => {
            shared
                .store
                .write()
                .insert_or_promote(key.clone(), Arc::new(value));
            shared.stats.record_preload_completed();
            debug!("Preloaded {:?}", key);
        }
        Ok(Err(err)) => {
            // Not retried; a later get loads it inline
            shared.stats.record_preload_failed();
            warn!("Preload of {:?} failed: {:#}", key, err);
        }
        Err(payload) => {
            shared.stats.record_preload_failed();
            warn!(
                "Preload of {:?} panicked: {}",
                key,
                panic_message(payload.as_ref())
            );
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
