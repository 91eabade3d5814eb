//! Response caches, one per resource family.
//!
//! Handlers only see the [`ResponseCache`] trait; the backing store is either
//! process-local ([`MemoryCache`]) or shared between instances
//! ([`crate::redis::RedisCache`]).

mod key;
mod memory;

pub use key::CacheKey;
pub use memory::MemoryCache;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::Config;
use crate::redis::RedisClient;

#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Cached payload for `key`, if present and younger than the TTL
    async fn get(&self, key: &CacheKey) -> Option<Value>;

    /// Store `data` under `key`, replacing any previous entry
    async fn set(&self, key: &CacheKey, data: Value);

    fn ttl(&self) -> Duration;

    /// Short backend name for health output
    fn backend(&self) -> &'static str;
}

/// The per-family cache instances
#[derive(Clone)]
pub struct CacheStores {
    pub vendors: Arc<dyn ResponseCache>,
    pub products: Arc<dyn ResponseCache>,
    pub categories: Arc<dyn ResponseCache>,
    pub ratings: Arc<dyn ResponseCache>,
}

impl CacheStores {
    /// Process-local caches sharing one clock
    pub fn in_memory(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let catalog = config.catalog_ttl();
        Self {
            vendors: Arc::new(MemoryCache::new(catalog, clock.clone())),
            products: Arc::new(MemoryCache::new(catalog, clock.clone())),
            categories: Arc::new(MemoryCache::new(catalog, clock.clone())),
            ratings: Arc::new(MemoryCache::new(config.ratings_ttl(), clock)),
        }
    }

    /// Caches living in Redis, namespaced per family
    pub fn shared(config: &Config, redis: &RedisClient) -> Self {
        let catalog = config.catalog_ttl();
        Self {
            vendors: Arc::new(redis.family("vendors", catalog)),
            products: Arc::new(redis.family("products", catalog)),
            categories: Arc::new(redis.family("categories", catalog)),
            ratings: Arc::new(redis.family("ratings", config.ratings_ttl())),
        }
    }

    pub fn backend(&self) -> &'static str {
        self.vendors.backend()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;

    #[tokio::test]
    async fn test_families_have_separate_key_spaces() {
        let clock = Arc::new(ManualClock::new(0));
        let stores = CacheStores::in_memory(&Config::default(), clock);

        stores.products.set(&CacheKey::Products, json!([1])).await;
        assert_eq!(stores.products.get(&CacheKey::Products).await, Some(json!([1])));
        assert_eq!(stores.vendors.get(&CacheKey::Products).await, None);
    }

    #[test]
    fn test_family_ttls() {
        let stores = CacheStores::in_memory(&Config::default(), Arc::new(ManualClock::new(0)));
        assert_eq!(stores.categories.ttl(), Duration::from_secs(600));
        assert_eq!(stores.ratings.ttl(), Duration::from_secs(300));
        assert_eq!(stores.backend(), "memory");
    }
}
