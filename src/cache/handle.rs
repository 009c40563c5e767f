//! Scoped Handle Module
//!
//! Consumer-side reference to a cached value.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

// == Handle ==
/// Shared-ownership reference to a cached value.
///
/// The value stays alive and unchanged for as long as the handle does, even
/// after the cache evicts or replaces its own entry for the key.
pub struct Handle<V> {
    value: Arc<V>,
}

impl<V> Handle<V> {
    pub(crate) fn new(value: Arc<V>) -> Self {
        Self { value }
    }

    /// Returns true if both handles point at the same stored value.
    pub fn shares_value(a: &Handle<V>, b: &Handle<V>) -> bool {
        Arc::ptr_eq(&a.value, &b.value)
    }

    /// Unwraps the handle into its shared pointer.
    pub fn into_arc(self) -> Arc<V> {
        self.value
    }
}

impl<V> Deref for Handle<V> {
    type Target = V;

    fn deref(&self) -> &V {
        &self.value
    }
}

impl<V> AsRef<V> for Handle<V> {
    fn as_ref(&self) -> &V {
        &self.value
    }
}

impl<V> Clone for Handle<V> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Handle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&*self.value).finish()
    }
}
