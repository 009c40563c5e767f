//! Background Tasks Module
//!
//! Contains the background work that runs alongside foreground cache access.
//!
//! # Tasks
//! - Preload: loads queued keys on a dedicated thread and stores the results

mod preload;

pub use preload::WORKER_THREAD_NAME;

pub(crate) use preload::{spawn_preload_worker, PreloadQueue};
