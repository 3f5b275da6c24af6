//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::binding::DEFAULT_STATS_INTERVAL;
use crate::cache::{DEFAULT_CAPACITY, DEFAULT_STORAGE_KEY, DEFAULT_TTL};

/// Default interval between expired-entry sweeps.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Cache and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Memory tier size bound
    pub capacity: usize,
    /// TTL for writes that do not name one
    pub default_ttl: Duration,
    /// Interval between expired-entry sweeps
    pub cleanup_interval: Duration,
    /// Interval between statistics refreshes
    pub stats_interval: Duration,
    /// Directory holding the persisted tier; None keeps it in memory
    pub storage_dir: Option<PathBuf>,
    /// Storage key the persisted map is written under
    pub storage_key: String,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Memory tier size bound (default: 100)
    /// - `DEFAULT_TTL` - Default TTL in seconds, 0 = never expire (default: 300)
    /// - `CLEANUP_INTERVAL` - Expired sweep frequency in seconds (default: 300)
    /// - `STATS_INTERVAL` - Stats refresh frequency in seconds (default: 30)
    /// - `STORAGE_DIR` - Persisted tier directory (default: unset, in memory)
    /// - `STORAGE_KEY` - Persisted document name (default: app_cache)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: parse_var("CACHE_CAPACITY").unwrap_or(defaults.capacity),
            default_ttl: parse_var("DEFAULT_TTL")
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_ttl),
            cleanup_interval: parse_var("CLEANUP_INTERVAL")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
            stats_interval: parse_var("STATS_INTERVAL")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.stats_interval),
            storage_dir: env::var("STORAGE_DIR")
                .ok()
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            storage_key: env::var("STORAGE_KEY")
                .ok()
                .filter(|key| !key.is_empty())
                .unwrap_or(defaults.storage_key),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            default_ttl: DEFAULT_TTL,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            stats_interval: DEFAULT_STATS_INTERVAL,
            storage_dir: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            server_port: 3000,
        }
    }
}
