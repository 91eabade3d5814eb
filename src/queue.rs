//! Serializing, rate-paced request queue.
//!
//! Every upstream call goes through a single consumer task, so at most one
//! operation runs at a time process-wide. Per logical key the consumer also
//! enforces the [`RateWindow`] limits before starting an operation.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::rate_window::{RateWindow, RateWindowConfig};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Request queue is no longer running")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub rate: RateWindowConfig,
    #[serde(with = "humantime_serde")]
    pub inter_request_pause: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            rate: RateWindowConfig::default(),
            inter_request_pause: Duration::from_millis(100),
        }
    }
}

type Job = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// A unit of work waiting for its turn
struct QueuedRequest {
    key: String,
    job: Job,
    enqueued_at: Instant,
}

#[derive(Debug, Default)]
struct QueueCounters {
    pending: AtomicUsize,
    processed: AtomicU64,
    delayed: AtomicU64,
}

/// Handle to the request queue. Cheap to clone; all clones feed one consumer.
#[derive(Clone)]
pub struct RequestQueue {
    sender: mpsc::UnboundedSender<QueuedRequest>,
    counters: Arc<QueueCounters>,
    config: Arc<QueueConfig>,
}

impl RequestQueue {
    /// Create the queue and spawn its consumer. Must be called inside a tokio runtime.
    pub fn new(config: QueueConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let counters = Arc::new(QueueCounters::default());
        let config = Arc::new(config);

        tokio::spawn(run_consumer(receiver, config.clone(), counters.clone()));

        Self {
            sender,
            counters,
            config,
        }
    }

    /// Submit `operation` under `key` and wait for its result.
    ///
    /// The operation starts only when the consumer reaches it, after any
    /// pacing delay for `key`. Its error is returned unchanged.
    pub async fn enqueue<T, E, F, Fut>(&self, key: impl Into<String>, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<QueueError> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            Box::pin(async move {
                let result = operation().await;
                // The caller may have gone away; nothing to settle then.
                let _ = tx.send(result);
            })
        });

        let request = QueuedRequest {
            key: key.into(),
            job,
            enqueued_at: Instant::now(),
        };

        self.counters.pending.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(request).is_err() {
            self.counters.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Closed.into());
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(QueueError::Closed.into()),
        }
    }

    /// Records queued or running
    pub fn pending(&self) -> usize {
        self.counters.pending.load(Ordering::SeqCst)
    }

    /// Records settled since startup
    pub fn processed(&self) -> u64 {
        self.counters.processed.load(Ordering::SeqCst)
    }

    /// Records that had to wait for the rate gate
    pub fn delayed(&self) -> u64 {
        self.counters.delayed.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }
}

async fn run_consumer(
    mut receiver: mpsc::UnboundedReceiver<QueuedRequest>,
    config: Arc<QueueConfig>,
    counters: Arc<QueueCounters>,
) {
    let mut window = RateWindow::new(config.rate.clone());

    while let Some(request) = receiver.recv().await {
        let QueuedRequest {
            key,
            job,
            enqueued_at,
        } = request;

        if let Some(wait) = window.wait_time(&key, Instant::now()) {
            debug!(key = %key, wait_ms = wait.as_millis() as u64, "Pacing queued request");
            counters.delayed.fetch_add(1, Ordering::SeqCst);
            sleep(wait).await;
        }
        let started = Instant::now();
        window.record(&key, started);

        debug!(
            key = %key,
            queued_ms = enqueued_at.elapsed().as_millis() as u64,
            in_window = window.recent(&key, started),
            "Executing queued request"
        );

        // Own task so a panicking operation cannot take the consumer down.
        if let Err(e) = tokio::spawn(job()).await {
            warn!(key = %key, error = %e, "Queued operation aborted");
        }

        counters.processed.fetch_add(1, Ordering::SeqCst);
        counters.pending.fetch_sub(1, Ordering::SeqCst);

        sleep(config.inter_request_pause).await;
    }

    debug!("Request queue consumer stopped");
}
