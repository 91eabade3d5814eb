use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::{CacheKey, ResponseCache};
use crate::clock::Clock;

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Value,
    stored_at_ms: u64,
}

/// In-process TTL cache with lazy expiry on read.
///
/// There is no size bound and no sweeper: the key space is limited to the
/// finite set of upstream resources.
pub struct MemoryCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_entry(&self, key: &CacheKey) -> Option<Value> {
        let now = self.clock.now_ms();
        let ttl_ms = self.ttl.as_millis() as u64;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(entry) = entries.get(key) {
            if now.saturating_sub(entry.stored_at_ms) < ttl_ms {
                return Some(entry.data.clone());
            }
            entries.remove(key);
        }
        None
    }

    pub fn set_entry(&self, key: &CacheKey, data: Value) {
        let entry = CacheEntry {
            data,
            stored_at_ms: self.clock.now_ms(),
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), entry);
    }

    /// Entries currently held, including stale ones not yet read
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Option<Value> {
        self.get_entry(key)
    }

    async fn set(&self, key: &CacheKey, data: Value) {
        self.set_entry(key, data)
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
