//! Configuration Module
//!
//! Loads client and cache settings from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

const CACHE_FILE_NAME: &str = "responses.json";

/// Client configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL every endpoint is resolved against
    pub base_url: String,
    /// Snapshot file of the persistent cache
    pub cache_path: PathBuf,
    /// TTL in seconds used when a caller asks for caching without one
    pub default_ttl: u64,
    /// Interval in seconds between expired-entry sweeps (0 disables the sweep)
    pub cleanup_interval: u64,
    /// Whole-request timeout in seconds
    pub request_timeout: u64,
    /// Connect timeout in seconds
    pub connect_timeout: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `API_BASE_URL` - Base URL (default: http://127.0.0.1:8080/)
    /// - `CACHE_PATH` - Cache snapshot file (default: XDG cache dir)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `REQUEST_TIMEOUT` - Request timeout in seconds (default: 30)
    /// - `CONNECT_TIMEOUT` - Connect timeout in seconds (default: 10)
    /// - `USER_AGENT` - User-Agent header (default: api_cache/<version>)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("API_BASE_URL").unwrap_or(defaults.base_url),
            cache_path: env::var("CACHE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            default_ttl: parse_var("CACHE_DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            request_timeout: parse_var("REQUEST_TIMEOUT").unwrap_or(defaults.request_timeout),
            connect_timeout: parse_var("CONNECT_TIMEOUT").unwrap_or(defaults.connect_timeout),
            user_agent: env::var("USER_AGENT").unwrap_or(defaults.user_agent),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }
}

fn parse_var(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

/// `~/.cache/api_cache/responses.json` on Linux, or the platform equivalent.
fn default_cache_path() -> PathBuf {
    ProjectDirs::from("", "", "api_cache")
        .map(|dirs| dirs.cache_dir().join(CACHE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from("api_cache.json"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/".to_string(),
            cache_path: default_cache_path(),
            default_ttl: 300,
            cleanup_interval: 60,
            request_timeout: 30,
            connect_timeout: 10,
            user_agent: concat!("api_cache/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
