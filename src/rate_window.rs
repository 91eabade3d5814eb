//! Per-key sliding window used to pace upstream calls.
//!
//! Pure bookkeeping: callers pass `now` explicitly, so the gate can be driven
//! by real or paused tokio time alike.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateWindowConfig {
    pub max_requests_per_window: usize,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    #[serde(with = "humantime_serde")]
    pub min_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub safety_margin: Duration,
}

impl Default for RateWindowConfig {
    fn default() -> Self {
        Self {
            max_requests_per_window: 2,
            window: Duration::from_millis(1000),
            min_interval: Duration::from_millis(500),
            safety_margin: Duration::from_millis(100),
        }
    }
}

/// Execution timestamps per logical key.
#[derive(Debug, Default)]
pub struct RateWindow {
    config: RateWindowConfig,
    timestamps: HashMap<String, VecDeque<Instant>>,
}

impl RateWindow {
    pub fn new(config: RateWindowConfig) -> Self {
        Self {
            config,
            timestamps: HashMap::new(),
        }
    }

    /// How long a new execution under `key` must wait, if at all.
    pub fn wait_time(&mut self, key: &str, now: Instant) -> Option<Duration> {
        let window = self.config.window;
        let Some(stamps) = self.timestamps.get_mut(key) else {
            return None;
        };
        prune(stamps, now, window);

        let mut wait = Duration::ZERO;

        if stamps.len() >= self.config.max_requests_per_window {
            if let Some(oldest) = stamps.front() {
                let age = now.saturating_duration_since(*oldest);
                wait = window.saturating_sub(age) + self.config.safety_margin;
            }
        }

        if let Some(latest) = stamps.back() {
            let since = now.saturating_duration_since(*latest);
            if since < self.config.min_interval {
                wait = wait.max(self.config.min_interval - since);
            }
        }

        (!wait.is_zero()).then_some(wait)
    }

    /// Record an execution under `key` at `now`, dropping stale entries first.
    pub fn record(&mut self, key: &str, now: Instant) {
        let window = self.config.window;
        let stamps = self.timestamps.entry(key.to_string()).or_default();
        prune(stamps, now, window);
        stamps.push_back(now);
    }

    /// Executions under `key` still inside the window.
    pub fn recent(&mut self, key: &str, now: Instant) -> usize {
        let window = self.config.window;
        match self.timestamps.get_mut(key) {
            Some(stamps) => {
                prune(stamps, now, window);
                stamps.len()
            }
            None => 0,
        }
    }
}

fn prune(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = stamps.front() {
        if now.saturating_duration_since(*oldest) >= window {
            stamps.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_first_request_proceeds_immediately() {
        let mut gate = RateWindow::new(RateWindowConfig::default());
        assert_eq!(gate.wait_time("products", Instant::now()), None);
    }

    #[test]
    fn test_min_interval_enforced_below_count_threshold() {
        let mut gate = RateWindow::new(RateWindowConfig::default());
        let start = Instant::now();
        gate.record("products", start);

        assert_eq!(gate.wait_time("products", start + ms(100)), Some(ms(400)));
        assert_eq!(gate.wait_time("products", start + ms(500)), None);
    }

    #[test]
    fn test_full_window_waits_for_oldest_plus_margin() {
        let mut gate = RateWindow::new(RateWindowConfig::default());
        let start = Instant::now();
        gate.record("products", start);
        gate.record("products", start + ms(500));

        // oldest leaves the window at 1000ms, plus 100ms margin
        assert_eq!(gate.wait_time("products", start + ms(600)), Some(ms(500)));
    }

    #[test]
    fn test_longer_of_both_rules_wins() {
        let config = RateWindowConfig {
            max_requests_per_window: 2,
            window: ms(1000),
            min_interval: ms(500),
            safety_margin: ms(0),
        };
        let mut gate = RateWindow::new(config);
        let start = Instant::now();
        gate.record("k", start);
        gate.record("k", start + ms(900));

        // window frees at 1000ms but the latest execution was only 50ms ago
        assert_eq!(gate.wait_time("k", start + ms(950)), Some(ms(450)));
    }

    #[test]
    fn test_keys_are_independent() {
        let mut gate = RateWindow::new(RateWindowConfig::default());
        let start = Instant::now();
        gate.record("products", start);
        gate.record("products", start + ms(500));

        assert_eq!(gate.wait_time("vendors", start + ms(600)), None);
        assert_eq!(gate.recent("vendors", start + ms(600)), 0);
    }

    #[test]
    fn test_stale_entries_pruned() {
        let mut gate = RateWindow::new(RateWindowConfig::default());
        let start = Instant::now();
        gate.record("products", start);
        gate.record("products", start + ms(500));

        assert_eq!(gate.recent("products", start + ms(1000)), 1);
        assert_eq!(gate.recent("products", start + ms(1500)), 0);
        assert_eq!(gate.wait_time("products", start + ms(1500)), None);
    }

    #[test]
    fn test_config_serializes_human_durations() {
        let json = serde_json::to_value(RateWindowConfig::default()).unwrap();
        assert_eq!(json["window"], "1s");
        assert_eq!(json["min_interval"], "500ms");
    }
}
