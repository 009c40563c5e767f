//! Access Guard Module
//!
//! Reader/writer lock around the entry store.

use std::hash::Hash;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::cache::EntryStore;

// == Access Guard ==
/// Shared access to an `EntryStore`.
///
/// Lookups take the read side and may run concurrently. Insert, promote,
/// evict, resize and clear take the write side.
///
/// A poisoned lock means a holder panicked mid-mutation and the recency
/// invariants can no longer be trusted, so acquisition panics instead of
/// recovering the inner state.
#[derive(Debug)]
pub(crate) struct AccessGuard<K, V> {
    store: RwLock<EntryStore<K, V>>,
}

impl<K, V> AccessGuard<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            store: RwLock::new(EntryStore::new(capacity)),
        }
    }

    // == Read ==
    /// Acquires shared access for lookups.
    pub fn read(&self) -> RwLockReadGuard<'_, EntryStore<K, V>> {
        match self.store.read() {
            Ok(guard) => guard,
            Err(_) => panic!("entry store lock poisoned; cache invariants may be broken"),
        }
    }

    // == Write ==
    /// Acquires exclusive access for structural mutation.
    pub fn write(&self) -> RwLockWriteGuard<'_, EntryStore<K, V>> {
        match self.store.write() {
            Ok(guard) => guard,
            Err(_) => panic!("entry store lock poisoned; cache invariants may be broken"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_concurrent_readers() {
        let guard = Arc::new(AccessGuard::new(8));
        guard.write().insert_or_promote(1u32, Arc::new("one"));

        let held = guard.read();
        let other = Arc::clone(&guard);
        let seen = thread::spawn(move || other.read().len()).join().unwrap();

        assert!(held.contains(&1));
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_writers_from_many_threads_respect_capacity() {
        let guard = Arc::new(AccessGuard::new(5));

        let handles: Vec<_> = (0..4u32)
            .map(|t| {
                let guard = Arc::clone(&guard);
                thread::spawn(move || {
                    for i in 0..50u32 {
                        guard.write().insert_or_promote(t * 100 + i, Arc::new(i));
                        assert!(guard.read().len() <= 5);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(guard.read().len(), 5);
    }

    #[test]
    #[should_panic(expected = "poisoned")]
    fn test_poisoned_lock_is_fatal() {
        let guard = Arc::new(AccessGuard::<u32, u32>::new(3));

        let poisoner = Arc::clone(&guard);
        let _ = thread::spawn(move || {
            let _held = poisoner.write();
            panic!("holder panics mid-mutation");
        })
        .join();

        let _held = guard.read();
    }
}
