//! Preload Cache demo
//!
//! Steps through the files of a directory in name order the way a viewer
//! steps through images: each file is fetched through the cache while the
//! next one is preloaded in the background.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use preload_cache::{Config, PreloadCache};

/// Entry point for the demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. List the files of the directory given as the first argument
/// 4. Create the cache with file reads as the loader
/// 5. Preload the first few files, then walk the list with prefetch
/// 6. Print cache statistics as JSON
fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "preload_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: capacity={}, in_flight_timeout={}ms, preload_ahead={}",
        config.capacity, config.in_flight_timeout_ms, config.preload_ahead
    );

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: preload_cache <directory>")?;
    let files = list_files(&dir)?;
    info!("Found {} files in {}", files.len(), dir.display());

    let cache = PreloadCache::from_config(&config, |path: &PathBuf| -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading {}", path.display()))
    })?;

    cache.request_preload_batch(files.iter().take(config.preload_ahead).cloned());

    for (i, path) in files.iter().enumerate() {
        let next = files.get(i + 1).unwrap_or(path);
        match cache.get_with_prefetch(path, next) {
            Ok(bytes) => info!("{}: {} bytes", path.display(), bytes.len()),
            Err(err) => warn!("{}", err),
        }
    }

    cache.wait_for_preload_idle();
    let stats = cache.stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}

/// Returns the regular files directly inside `dir`, sorted by name.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
