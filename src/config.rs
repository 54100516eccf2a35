//! Configuration Module
//!
//! Handles loading and managing proxy configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::cache::DEFAULT_CACHE_NAME;

/// Default upstream: the kakeibo Flask server.
pub const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:8080";

/// Default substring marking dynamic endpoints that are never cached.
pub const DEFAULT_BYPASS_PATTERN: &str = "/api/";

/// Proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Base URL of the application server being fronted
    pub upstream_url: String,
    /// Directory holding the persisted named caches
    pub cache_dir: PathBuf,
    /// Name of the current cache; other names are deleted on activate
    pub cache_name: String,
    /// Requests whose URL contains this substring always go to the network
    pub bypass_pattern: String,
    /// Paths seeded into the cache during install
    pub precache_urls: Vec<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - Proxy listen port (default: 3000)
    /// - `UPSTREAM_URL` - Application server base URL (default: http://127.0.0.1:8080)
    /// - `CACHE_DIR` - Cache storage directory (default: .kakeibo-cache)
    /// - `CACHE_NAME` - Current cache name (default: kakeibo-v1)
    /// - `BYPASS_PATTERN` - URL substring exempt from caching (default: /api/)
    /// - `PRECACHE_URLS` - Comma-separated paths seeded on install (default: /)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            upstream_url: non_empty_var("UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            cache_dir: non_empty_var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            cache_name: non_empty_var("CACHE_NAME").unwrap_or(defaults.cache_name),
            bypass_pattern: non_empty_var("BYPASS_PATTERN").unwrap_or(defaults.bypass_pattern),
            precache_urls: non_empty_var("PRECACHE_URLS")
                .map(|v| parse_url_list(&v))
                .unwrap_or(defaults.precache_urls),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            cache_dir: PathBuf::from(".kakeibo-cache"),
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            bypass_pattern: DEFAULT_BYPASS_PATTERN.to_string(),
            precache_urls: vec!["/".to_string()],
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Splits a comma-separated path list, dropping blanks.
fn parse_url_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
