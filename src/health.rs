use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::{Instant, SystemTime};

use crate::queue::QueueConfig;
use crate::state::AppState;

static START_TIME: LazyLock<SystemTime> = LazyLock::new(SystemTime::now);

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub cache: CacheStatus,
    pub queue: QueueStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheStatus {
    pub backend: String,
    pub status: String,
    pub response_time_ms: u64,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueueStatus {
    pub pending: usize,
    pub processed: u64,
    pub delayed: u64,
    pub pacing: QueueConfig,
}

/// Touch the start time so uptime counts from boot, not from the first probe
pub fn mark_started() {
    LazyLock::force(&START_TIME);
}

pub async fn check_health(state: &AppState) -> HealthStatus {
    let now = SystemTime::now();
    let uptime = now
        .duration_since(*START_TIME)
        .unwrap_or_default()
        .as_secs();

    let cache = check_cache(state).await;
    let overall_status = if cache.status == "healthy" {
        "healthy"
    } else {
        "degraded" // catalog reads still work, just uncached
    };

    HealthStatus {
        status: overall_status.to_string(),
        timestamp: now
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        cache,
        queue: QueueStatus {
            pending: state.queue.pending(),
            processed: state.queue.processed(),
            delayed: state.queue.delayed(),
            pacing: state.queue.config().clone(),
        },
    }
}

async fn check_cache(state: &AppState) -> CacheStatus {
    let start = Instant::now();
    let backend = state.caches.backend().to_string();

    let Some(redis) = state.redis.as_ref() else {
        return CacheStatus {
            backend,
            status: "healthy".to_string(),
            response_time_ms: 0,
            error: None,
        };
    };

    match redis.ping().await {
        Ok(_) => CacheStatus {
            backend,
            status: "healthy".to_string(),
            response_time_ms: start.elapsed().as_millis() as u64,
            error: None,
        },
        Err(e) => CacheStatus {
            backend,
            status: "unavailable".to_string(),
            response_time_ms: start.elapsed().as_millis() as u64,
            error: Some(e.to_string()),
        },
    }
}
