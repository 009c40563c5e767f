//! Preload Cache - A bounded LRU cache with background preloading
//!
//! Hides the latency of an expensive, caller-supplied load step behind a
//! fixed-size cache and a single worker thread that loads hinted keys ahead
//! of use.

pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod tasks;

pub use cache::{CacheStats, Handle, PreloadCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use loader::Loader;
