//! Error types for the preload cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the preload cache.
///
/// Only foreground failures surface here. A failed background preload is
/// logged and counted, never returned to a caller.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The loader failed while serving a foreground `get`
    #[error("Failed to load {key}: {cause:#}")]
    Load {
        /// Debug rendering of the requested key
        key: String,
        /// Error reported by the loader
        cause: anyhow::Error,
    },

    /// The background preload thread could not be started
    #[error("Failed to spawn preload worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

impl CacheError {
    // == Load Helper ==
    /// Wraps a loader failure for the given key.
    pub(crate) fn load<K: std::fmt::Debug>(key: &K, cause: anyhow::Error) -> Self {
        CacheError::Load {
            key: format!("{:?}", key),
            cause,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the preload cache.
pub type Result<T> = std::result::Result<T, CacheError>;
