use std::sync::Arc;
use tracing::info;

use crate::cache::CacheStores;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::metrics::MetricsCollector;
use crate::queue::RequestQueue;
use crate::redis::RedisClient;
use crate::upstream::UpstreamClient;

/// Shared application state
pub type SharedState = Arc<AppState>;

/// Everything the handlers need, constructed once per process
pub struct AppState {
    pub upstream: UpstreamClient,
    pub queue: RequestQueue,
    pub caches: CacheStores,
    pub redis: Option<RedisClient>,
    pub metrics: MetricsCollector,
}

impl AppState {
    /// Build state from configuration, connecting to Redis when one is configured.
    pub async fn from_config(config: &Config) -> Result<Self> {
        match config.shared_cache_url() {
            Some(url) => {
                let redis = RedisClient::connect(url).await?;
                info!("Using Redis for shared response caches");
                let caches = CacheStores::shared(config, &redis);
                Self::with_caches(config, caches, Some(redis))
            }
            None => {
                info!("Using in-memory response caches");
                Self::in_memory(config)
            }
        }
    }

    /// Process-local caches on the system clock. Must run inside a tokio runtime.
    pub fn in_memory(config: &Config) -> Result<Self> {
        let caches = CacheStores::in_memory(config, Arc::new(SystemClock));
        Self::with_caches(config, caches, None)
    }

    pub fn with_caches(
        config: &Config,
        caches: CacheStores,
        redis: Option<RedisClient>,
    ) -> Result<Self> {
        let upstream = UpstreamClient::new(&config.upstream_base_url, config.upstream_timeout())
            .map_err(|e| ProxyError::Configuration(e.to_string()))?;

        Ok(Self {
            upstream,
            queue: RequestQueue::new(config.queue_config()),
            caches,
            redis,
            metrics: MetricsCollector::new(),
        })
    }
}
