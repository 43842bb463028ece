//! Backoff policies and failure accounting
//!
//! Two independent policies live here:
//! - [`RetryPolicy`]: per-request retries inside the fetcher, uncapped `base * 2^attempt`
//! - [`FailureBackoff`]: the poller's wait after a failed cycle, `min(base * 2^(n-1), cap)`

use std::time::Duration;

/// Default number of attempts per fetch.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Base delay for both policies (1 second, doubled each step).
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Ceiling for the poller's failure backoff.
pub const DEFAULT_FAILURE_BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Default consecutive-failure threshold for the poller.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// `base * 2^exponent`, saturating instead of overflowing
fn exponential(base: Duration, exponent: u32) -> Duration {
    2u32.checked_pow(exponent)
        .and_then(|factor| base.checked_mul(factor))
        .unwrap_or(Duration::MAX)
}

/// Retry configuration shared read-only by every fetch of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per fetch (not retries after the first)
    pub max_retries: u32,
    /// Delay before the second attempt; doubled for each later one
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with the default 1 second base delay
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }

    /// Override the base delay
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay after failed attempt `attempt` (0-based): `base * 2^attempt`, uncapped
    pub fn delay_for(&self, attempt: u32) -> Duration {
        exponential(self.base_delay, attempt)
    }

    /// Whether another attempt follows attempt `attempt` (0-based)
    pub fn has_next_attempt(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

/// Capped backoff applied by the poller between failed cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureBackoff {
    /// Wait after the first failure
    pub base: Duration,
    /// Upper bound on any wait
    pub cap: Duration,
}

impl FailureBackoff {
    /// Wait after `consecutive` failures in a row (1-based)
    pub fn delay_for(&self, consecutive: u32) -> Duration {
        exponential(self.base, consecutive.saturating_sub(1)).min(self.cap)
    }
}

impl Default for FailureBackoff {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_DELAY,
            cap: DEFAULT_FAILURE_BACKOFF_CAP,
        }
    }
}

/// Poller-local run of uninterrupted failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureCounter {
    consecutive: u32,
    threshold: u32,
}

impl FailureCounter {
    /// Create a counter that trips at `threshold` failures in a row
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive: 0,
            threshold,
        }
    }

    /// Current run length
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Configured threshold
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Reset after a successful cycle
    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    /// Count a failed cycle; returns `true` once the threshold is reached
    pub fn record_failure(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        self.is_tripped()
    }

    /// Whether the threshold has been reached
    pub fn is_tripped(&self) -> bool {
        self.consecutive >= self.threshold
    }
}
