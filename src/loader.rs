//! Loader Module
//!
//! The seam through which callers supply the expensive `key -> value` step.

/// Produces a value for a key.
///
/// Implementations are expected to be pure and idempotent: the cache may call
/// `load` for the same key from the foreground and the preload worker at
/// overlapping times.
pub trait Loader<K, V>: Send + Sync + 'static {
    /// Loads the value for `key`. May block for as long as it needs.
    fn load(&self, key: &K) -> anyhow::Result<V>;
}

impl<K, V, F> Loader<K, V> for F
where
    F: Fn(&K) -> anyhow::Result<V> + Send + Sync + 'static,
{
    fn load(&self, key: &K) -> anyhow::Result<V> {
        self(key)
    }
}
