//! Fixed-interval request pacing for the scoring service.
//!
//! The service has no published rate limit; a constant pause before every
//! request keeps it from refusing us. This is a throttle, not a retry policy.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Sleeps a fixed interval before each request and counts what it did.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    total_requests: AtomicU64,
    total_wait_ms: AtomicU64,
}

impl Throttle {
    /// Create a throttle pausing `interval` before each request.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            total_requests: AtomicU64::new(0),
            total_wait_ms: AtomicU64::new(0),
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait out the pacing interval. Returns the duration waited.
    pub async fn pace(&self) -> Duration {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        if self.interval > Duration::ZERO {
            debug!(wait_ms = self.interval.as_millis(), "Pacing request");
            self.total_wait_ms
                .fetch_add(self.interval.as_millis() as u64, Ordering::Relaxed);
            tokio::time::sleep(self.interval).await;
        }

        self.interval
    }

    /// Get statistics.
    pub fn stats(&self) -> ThrottleStats {
        ThrottleStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            total_wait_secs: self.total_wait_ms.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }
}

/// Throttle statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleStats {
    pub total_requests: u64,
    pub total_wait_secs: f64,
}
