//! Redis-backed response cache shared between proxy instances.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{CacheKey, ResponseCache};
use crate::error::ProxyError;

const KEY_PREFIX: &str = "storefront";

/// Connection to the shared cache
#[derive(Clone)]
pub struct RedisClient {
    connection: MultiplexedConnection,
}

impl RedisClient {
    pub async fn connect(redis_url: &str) -> Result<Self, ProxyError> {
        let client = Client::open(redis_url)
            .map_err(|e| ProxyError::Redis(format!("Failed to create Redis client: {}", e)))?;
        let connection = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| ProxyError::Redis(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection })
    }

    pub async fn ping(&self) -> Result<String, ProxyError> {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| ProxyError::Redis(format!("Ping failed: {}", e)))
    }

    /// Cache view for one resource family
    pub fn family(&self, family: &'static str, ttl: Duration) -> RedisCache {
        RedisCache {
            connection: self.connection.clone(),
            family,
            ttl,
        }
    }
}

pub struct RedisCache {
    connection: MultiplexedConnection,
    family: &'static str,
    ttl: Duration,
}

/// Redis key for `key` inside `family`'s namespace
pub fn redis_key(family: &str, key: &CacheKey) -> String {
    format!("{}:{}:{}", KEY_PREFIX, family, key)
}

#[async_trait]
impl ResponseCache for RedisCache {
    async fn get(&self, key: &CacheKey) -> Option<Value> {
        let full_key = redis_key(self.family, key);
        let mut conn = self.connection.clone();

        let raw = match redis::cmd("GET")
            .arg(&full_key)
            .query_async::<_, Option<String>>(&mut conn)
            .await
        {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key = %full_key, error = %e, "Redis GET failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %full_key, error = %e, "Discarding unreadable cache entry");
                None
            }
        }
    }

    async fn set(&self, key: &CacheKey, data: Value) {
        let full_key = redis_key(self.family, key);
        let mut conn = self.connection.clone();
        let seconds = self.ttl.as_secs().max(1);

        let result = redis::cmd("SETEX")
            .arg(&full_key)
            .arg(seconds)
            .arg(data.to_string())
            .query_async::<_, ()>(&mut conn)
            .await;

        match result {
            Ok(()) => debug!(key = %full_key, ttl_secs = seconds, "Stored cache entry"),
            Err(e) => warn!(key = %full_key, error = %e, "Redis SETEX failed"),
        }
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_is_namespaced_by_family() {
        assert_eq!(
            redis_key("ratings", &CacheKey::ratings("42", 3)),
            "storefront:ratings:ratings:42:page:3"
        );
        assert_eq!(redis_key("products", &CacheKey::Products), "storefront:products:products");
    }

    #[test]
    fn test_families_never_collide() {
        let keys = [
            CacheKey::Vendors,
            CacheKey::Products,
            CacheKey::Categories,
            CacheKey::SubCategories,
            CacheKey::category_with_products("7"),
            CacheKey::ratings("7", 1),
        ];
        let families = ["vendors", "products", "categories", "ratings"];

        let rendered: HashSet<String> = families
            .iter()
            .flat_map(|family| keys.iter().map(move |key| redis_key(family, key)))
            .collect();

        assert_eq!(rendered.len(), families.len() * keys.len());
    }
}
