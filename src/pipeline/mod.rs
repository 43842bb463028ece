//! Polling and crawling orchestration
//!
//! Leaf building blocks ([`rate_limit`], [`backoff`], [`moving_average`]) and
//! the two pipelines built on them: the long-running [`Poller`] and the
//! bounded [`PagedCrawler`].

use crate::fetcher::FetcherError;
use crate::storage::StorageError;

pub mod backoff;
pub mod compare;
pub mod crawler;
pub mod moving_average;
pub mod poller;
pub mod rate_limit;

pub use backoff::{FailureBackoff, FailureCounter, RetryPolicy};
pub use compare::{compare_modes, ComparisonReport, ModeStats};
pub use crawler::{CrawlMode, CrawlReport, PagedCrawler};
pub use moving_average::MovingAverageTracker;
pub use poller::{PollOutcome, PollerSettings, PollerState, Poller, PriceTick, StopReason};
pub use rate_limit::RateLimiter;

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Fetch failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetcherError),

    /// Storage rejected a write
    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),

    /// The poller stopped after too many failures in a row
    #[error("stopped after {consecutive} consecutive failures (last: {last_error})")]
    ConsecutiveFailureLimit {
        /// Failures in the final run
        consecutive: u32,
        /// Description of the final failure
        last_error: String,
    },
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
