//! Continuous single-asset price poller
//!
//! Each cycle fetches one price, stores it, feeds the moving average and
//! reports a [`PriceTick`]. Failures (fetch, parse or storage) back off with
//! [`FailureBackoff`]; the poller stops on its own once
//! `max_consecutive_failures` cycles in a row have failed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::backoff::{FailureBackoff, FailureCounter};
use super::moving_average::MovingAverageTracker;
use super::{PipelineError, PipelineResult};
use crate::config::CrawlerConfig;
use crate::fetcher::DataProvider;
use crate::metrics::{record_poll_failure, record_poll_success};
use crate::shutdown::SharedShutdown;
use crate::storage::Storage;
use crate::{format_usd, Sample};

/// Lifecycle of a [`Poller`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Constructed, not started
    Idle,
    /// Inside `start()`
    Running,
    /// Returned from `start()`; cannot be restarted
    Stopped,
}

/// Poller parameters
#[derive(Debug, Clone, PartialEq)]
pub struct PollerSettings {
    /// Provider-side asset id (e.g., "bitcoin")
    pub asset_id: String,
    /// Display symbol stored with each sample (e.g., "BTC")
    pub symbol: String,
    /// Pause after a successful cycle
    pub poll_interval: Duration,
    /// Failures in a row that stop the poller
    pub max_consecutive_failures: u32,
    /// Moving average window size
    pub moving_average_window: usize,
    /// Wait schedule between failed cycles
    pub failure_backoff: FailureBackoff,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

impl PollerSettings {
    /// Bitcoin poller settings from configuration
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            asset_id: "bitcoin".to_string(),
            symbol: "BTC".to_string(),
            poll_interval: config.poll_interval,
            max_consecutive_failures: config.max_consecutive_failures,
            moving_average_window: config.moving_average_window,
            failure_backoff: FailureBackoff::default(),
        }
    }
}

/// One successful cycle as seen by the reporter
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTick {
    /// The stored sample
    pub sample: Sample,
    /// Window mean, present once the window is full
    pub moving_average: Option<f64>,
    /// Window size, for the `SMA(n)` label
    pub window: usize,
}

impl fmt::Display for PriceTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} → USD: ${}",
            self.sample.timestamp.format("%Y-%m-%dT%H:%M:%S"),
            self.sample.symbol,
            format_usd(self.sample.value)
        )?;
        if let Some(average) = self.moving_average {
            write!(f, " SMA({}): ${}", self.window, format_usd(average))?;
        }
        Ok(())
    }
}

/// Why `start()` returned
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// Shutdown was requested
    Cancelled,
    /// The consecutive-failure threshold was reached
    FailureLimit {
        /// Failures in the final run
        consecutive: u32,
        /// Description of the final failure
        last_error: String,
    },
}

/// Summary returned by [`Poller::start`]
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    /// Why the loop ended
    pub reason: StopReason,
    /// Cycles attempted
    pub cycles: u64,
    /// Cycles that stored a sample
    pub successes: u64,
    /// Cycles that failed
    pub failures: u64,
}

impl PollOutcome {
    /// Turn a failure-limit stop into an error; cancellation is success
    pub fn into_result(self) -> PipelineResult<Self> {
        match &self.reason {
            StopReason::Cancelled => Ok(self),
            StopReason::FailureLimit {
                consecutive,
                last_error,
            } => Err(PipelineError::ConsecutiveFailureLimit {
                consecutive: *consecutive,
                last_error: last_error.clone(),
            }),
        }
    }
}

/// Receives every [`PriceTick`]
pub type Reporter = Box<dyn Fn(&PriceTick) + Send + Sync>;

/// Long-running price poller
pub struct Poller {
    provider: Arc<dyn DataProvider>,
    storage: Arc<dyn Storage>,
    settings: PollerSettings,
    shutdown: SharedShutdown,
    tracker: MovingAverageTracker,
    failures: FailureCounter,
    state: PollerState,
    reporter: Reporter,
}

impl Poller {
    /// Create an idle poller; ticks are logged until [`Poller::with_reporter`] replaces that
    pub fn new(
        provider: Arc<dyn DataProvider>,
        storage: Arc<dyn Storage>,
        settings: PollerSettings,
        shutdown: SharedShutdown,
    ) -> Self {
        Self {
            tracker: MovingAverageTracker::new(settings.moving_average_window),
            failures: FailureCounter::new(settings.max_consecutive_failures),
            provider,
            storage,
            settings,
            shutdown,
            state: PollerState::Idle,
            reporter: Box::new(|tick| info!("{}", tick)),
        }
    }

    /// Replace the tick reporter
    pub fn with_reporter<F>(mut self, reporter: F) -> Self
    where
        F: Fn(&PriceTick) + Send + Sync + 'static,
    {
        self.reporter = Box::new(reporter);
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> PollerState {
        self.state
    }

    /// Moving average over the polled values
    pub fn tracker(&self) -> &MovingAverageTracker {
        &self.tracker
    }

    /// Run until cancelled or until the failure threshold is reached
    ///
    /// The provider is closed before this returns. A stopped poller is not
    /// restarted; calling `start()` again returns an empty cancelled outcome.
    pub async fn start(&mut self) -> PollOutcome {
        let mut outcome = PollOutcome {
            reason: StopReason::Cancelled,
            cycles: 0,
            successes: 0,
            failures: 0,
        };

        if self.state != PollerState::Idle {
            warn!(state = ?self.state, "Poller already started, ignoring start()");
            return outcome;
        }

        self.state = PollerState::Running;
        info!(
            asset = %self.settings.asset_id,
            provider = self.provider.name(),
            storage = self.storage.name(),
            interval_ms = self.settings.poll_interval.as_millis() as u64,
            "Starting price poller"
        );

        loop {
            if self.shutdown.is_shutdown_requested() {
                info!("Shutdown requested, stopping price poller");
                break;
            }

            outcome.cycles += 1;
            match self.poll_once().await {
                Ok(tick) => {
                    outcome.successes += 1;
                    self.failures.record_success();
                    record_poll_success(&tick.sample.symbol, tick.sample.value);
                    (self.reporter)(&tick);

                    self.shutdown.sleep_or_shutdown(self.settings.poll_interval).await;
                }
                Err(err) => {
                    outcome.failures += 1;
                    let tripped = self.failures.record_failure();
                    let consecutive = self.failures.consecutive();
                    record_poll_failure(&self.settings.symbol, consecutive);
                    warn!(
                        consecutive,
                        threshold = self.failures.threshold(),
                        error = %err,
                        "Price poll failed"
                    );

                    if tripped {
                        error!(
                            consecutive,
                            last_error = %err,
                            "Stopping price poller after repeated failures"
                        );
                        outcome.reason = StopReason::FailureLimit {
                            consecutive,
                            last_error: err.to_string(),
                        };
                        break;
                    }

                    let wait = self.settings.failure_backoff.delay_for(consecutive);
                    info!(wait_secs = wait.as_secs_f64(), "Waiting before next poll");
                    self.shutdown.sleep_or_shutdown(wait).await;
                }
            }
        }

        self.provider.close().await;
        self.state = PollerState::Stopped;
        info!(
            cycles = outcome.cycles,
            successes = outcome.successes,
            failures = outcome.failures,
            "Price poller stopped"
        );
        outcome
    }

    /// Fetch, store and aggregate one price
    async fn poll_once(&mut self) -> PipelineResult<PriceTick> {
        let quote = self.provider.get_price(&self.settings.asset_id).await?;
        let sample = Sample::now(&self.settings.symbol, quote.price, self.provider.name());

        self.storage.store_price(&sample).await?;
        self.tracker.add_value(sample.value);
        debug!(symbol = %sample.symbol, price = sample.value, "Polled price");

        let moving_average = if self.tracker.is_ready() {
            self.tracker.average()
        } else {
            None
        };

        Ok(PriceTick {
            sample,
            moving_average,
            window: self.tracker.capacity(),
        })
    }
}
