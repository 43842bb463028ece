//! Request spacing
//!
//! Enforces a hard minimum interval between outbound requests issued through
//! one client. Callers sharing a limiter serialize through it.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Minimum-interval rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter with an explicit minimum interval
    ///
    /// A zero interval disables spacing.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Create a limiter allowing at most `requests_per_second` requests
    ///
    /// A rate so low that its interval overflows `Duration` saturates to
    /// [`Duration::MAX`].
    ///
    /// # Arguments
    /// * `requests_per_second` - Target rate; `<= 0` (or not finite) disables spacing
    pub fn per_second(requests_per_second: f64) -> Self {
        Self::new(Self::interval_for(requests_per_second).unwrap_or(Duration::MAX))
    }

    /// Spacing implied by `requests_per_second`
    ///
    /// `Some(ZERO)` when limiting is disabled, `None` when the interval is too
    /// large for `Duration`.
    pub fn interval_for(requests_per_second: f64) -> Option<Duration> {
        if requests_per_second > 0.0 && requests_per_second.is_finite() {
            Duration::try_from_secs_f64(1.0 / requests_per_second).ok()
        } else {
            Some(Duration::ZERO)
        }
    }

    /// Create a limiter that never waits
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Minimum spacing between two requests
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Whether this limiter ever waits
    pub fn is_enabled(&self) -> bool {
        !self.min_interval.is_zero()
    }

    /// Wait until the next request may be issued, then record it
    ///
    /// The state lock is held across the sleep, so concurrent callers are
    /// released one at a time, each at least `min_interval` after the last.
    pub async fn wait(&self) {
        let mut last_request = self.last_request.lock().await;

        if let Some(previous) = *last_request {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let remaining = self.min_interval - elapsed;
                debug!(sleep_ms = remaining.as_millis() as u64, "Rate limiting");
                sleep(remaining).await;
            }
        }

        *last_request = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::disabled()
    }
}
