use envconfig::Envconfig;
use std::net::SocketAddr;
use std::time::Duration;

use crate::queue::QueueConfig;
use crate::rate_window::RateWindowConfig;

#[derive(Debug, Envconfig, Clone)]
pub struct Config {
    /// Server bind address
    #[envconfig(from = "BIND_ADDR", default = "127.0.0.1:3000")]
    pub bind_addr: SocketAddr,

    /// Base URL of the commerce backend, without trailing slash
    #[envconfig(from = "UPSTREAM_BASE_URL", default = "http://127.0.0.1:8000/api")]
    pub upstream_base_url: String,

    /// Per-call upstream timeout in milliseconds
    #[envconfig(from = "UPSTREAM_TIMEOUT_MS", default = "10000")]
    pub upstream_timeout_ms: u64,

    /// Executions allowed per key inside one rate window
    #[envconfig(from = "MAX_REQUESTS_PER_SECOND", default = "2")]
    pub max_requests_per_second: usize,

    #[envconfig(from = "RATE_WINDOW_MS", default = "1000")]
    pub rate_window_ms: u64,

    /// Minimum spacing between two executions under the same key
    #[envconfig(from = "MIN_REQUEST_INTERVAL_MS", default = "500")]
    pub min_request_interval_ms: u64,

    /// Added to the computed wait when the window is full
    #[envconfig(from = "RATE_WAIT_MARGIN_MS", default = "100")]
    pub rate_wait_margin_ms: u64,

    /// Pause between successive queued records, regardless of key
    #[envconfig(from = "INTER_REQUEST_PAUSE_MS", default = "100")]
    pub inter_request_pause_ms: u64,

    /// TTL for vendors, products and categories
    #[envconfig(from = "CATALOG_CACHE_TTL_SECS", default = "600")]
    pub catalog_cache_ttl_secs: u64,

    #[envconfig(from = "RATINGS_CACHE_TTL_SECS", default = "300")]
    pub ratings_cache_ttl_secs: u64,

    /// Shared cache backend; in-memory caches when unset
    #[envconfig(from = "REDIS_URL")]
    pub redis_url: Option<String>,

    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            upstream_base_url: "http://127.0.0.1:8000/api".to_string(),
            upstream_timeout_ms: 10_000,
            max_requests_per_second: 2,
            rate_window_ms: 1000,
            min_request_interval_ms: 500,
            rate_wait_margin_ms: 100,
            inter_request_pause_ms: 100,
            catalog_cache_ttl_secs: 600,
            ratings_cache_ttl_secs: 300,
            redis_url: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, envconfig::Error> {
        Config::init_from_env()
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_cache_ttl_secs)
    }

    pub fn ratings_ttl(&self) -> Duration {
        Duration::from_secs(self.ratings_cache_ttl_secs)
    }

    /// Pacing parameters for the request queue
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            rate: RateWindowConfig {
                max_requests_per_window: self.max_requests_per_second,
                window: Duration::from_millis(self.rate_window_ms),
                min_interval: Duration::from_millis(self.min_request_interval_ms),
                safety_margin: Duration::from_millis(self.rate_wait_margin_ms),
            },
            inter_request_pause: Duration::from_millis(self.inter_request_pause_ms),
        }
    }

    /// Redis URL, treating an empty value as unset
    pub fn shared_cache_url(&self) -> Option<&str> {
        self.redis_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_from_empty_environment() {
        let config = Config::init_from_hashmap(&HashMap::new()).unwrap();
        assert_eq!(config.upstream_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_requests_per_second, 2);
        assert_eq!(config.catalog_ttl(), Duration::from_secs(600));
        assert_eq!(config.ratings_ttl(), Duration::from_secs(300));
        assert!(config.shared_cache_url().is_none());
    }

    #[test]
    fn test_queue_config_conversion() {
        let queue = Config::default().queue_config();
        assert_eq!(queue.rate.window, Duration::from_millis(1000));
        assert_eq!(queue.rate.min_interval, Duration::from_millis(500));
        assert_eq!(queue.rate.safety_margin, Duration::from_millis(100));
        assert_eq!(queue.inter_request_pause, Duration::from_millis(100));
    }

    #[test]
    fn test_blank_redis_url_is_unset() {
        let config = Config {
            redis_url: Some("  ".to_string()),
            ..Config::default()
        };
        assert!(config.shared_cache_url().is_none());
    }
}
