//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::time::Duration;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold (clamped on use)
    pub capacity: usize,
    /// Upper bound in milliseconds a `get` waits on a key the worker is loading
    pub in_flight_timeout_ms: u64,
    /// Number of upcoming items the demo binary preloads up front
    pub preload_ahead: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 16)
    /// - `IN_FLIGHT_TIMEOUT_MS` - In-flight wait bound in ms (default: 10000)
    /// - `PRELOAD_AHEAD` - Items preloaded by the demo binary (default: 2)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: parse_var("CACHE_CAPACITY").unwrap_or(defaults.capacity),
            in_flight_timeout_ms: parse_var("IN_FLIGHT_TIMEOUT_MS")
                .unwrap_or(defaults.in_flight_timeout_ms),
            preload_ahead: parse_var("PRELOAD_AHEAD").unwrap_or(defaults.preload_ahead),
        }
    }

    /// Returns the in-flight wait bound as a Duration.
    pub fn in_flight_timeout(&self) -> Duration {
        Duration::from_millis(self.in_flight_timeout_ms)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 16,
            in_flight_timeout_ms: 10_000,
            preload_ahead: 2,
        }
    }
}
