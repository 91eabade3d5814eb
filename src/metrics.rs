use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceMetrics {
    pub requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub upstream_failures: u64,
    /// Unix seconds when this resource was first counted
    pub since: u64,
}

impl Default for ResourceMetrics {
    fn default() -> Self {
        Self {
            requests: 0,
            cache_hits: 0,
            cache_misses: 0,
            upstream_failures: 0,
            since: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }
}

/// Outcome of a single proxied request, as seen by the metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    CacheHit,
    Fetched,
    UpstreamFailure,
}

#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    resources: Arc<RwLock<HashMap<String, ResourceMetrics>>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, resource: &str, outcome: Outcome) {
        let mut resources = self.resources.write().await;
        let metrics = resources.entry(resource.to_string()).or_default();

        metrics.requests += 1;
        match outcome {
            Outcome::CacheHit => metrics.cache_hits += 1,
            Outcome::Fetched => metrics.cache_misses += 1,
            Outcome::UpstreamFailure => {
                metrics.cache_misses += 1;
                metrics.upstream_failures += 1;
            }
        }
    }

    pub async fn get_resource_metrics(&self, resource: &str) -> Option<ResourceMetrics> {
        let resources = self.resources.read().await;
        resources.get(resource).cloned()
    }

    pub async fn get_all_metrics(&self) -> HashMap<String, ResourceMetrics> {
        let resources = self.resources.read().await;
        resources.clone()
    }

    pub async fn get_global_metrics(&self) -> ResourceMetrics {
        let resources = self.resources.read().await;
        let mut global = ResourceMetrics::default();

        for metrics in resources.values() {
            global.requests += metrics.requests;
            global.cache_hits += metrics.cache_hits;
            global.cache_misses += metrics.cache_misses;
            global.upstream_failures += metrics.upstream_failures;
        }

        global
    }
}
