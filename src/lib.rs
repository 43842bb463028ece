//! # Crypto Crawler Library
//!
//! A small, resilient market-data pipeline: poll a single price on an
//! interval, crawl ranked listings page by page, and persist everything
//! through a pluggable storage backend.
//!
//! ## Features
//!
//! - **Rate Limiting**: A hard minimum spacing between outbound requests per client
//! - **Retry with Backoff**: Transient failures (5xx, timeouts) are retried with
//!   exponential backoff; client errors (4xx) fail fast
//! - **Moving Average**: Fixed-window mean over the polled values
//! - **Failure Threshold**: The poller stops cleanly after N consecutive failures
//! - **Page-Level Fault Tolerance**: The crawler skips failed pages and writes
//!   one batch at the end
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use crypto_crawler::config::CrawlerConfig;
//! use crypto_crawler::fetcher::coingecko::CoinGeckoProvider;
//! use crypto_crawler::fetcher::RetryingFetcher;
//! use crypto_crawler::pipeline::{Poller, PollerSettings};
//! use crypto_crawler::shutdown::ShutdownCoordinator;
//! use crypto_crawler::storage::memory::MemoryStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CrawlerConfig::default();
//! let fetcher = Arc::new(RetryingFetcher::from_config(&config)?);
//! let provider = Arc::new(CoinGeckoProvider::new(fetcher, &config.coingecko_base_url));
//! let storage = Arc::new(MemoryStorage::new());
//!
//! let mut poller = Poller::new(
//!     provider,
//!     storage,
//!     PollerSettings::from_config(&config),
//!     ShutdownCoordinator::shared(),
//! );
//! let outcome = poller.start().await;
//! println!("stopped after {} cycles", outcome.cycles);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`pipeline`] - Rate limiter, backoff policies, moving average, poller and crawler
//! - [`fetcher`] - HTTP transport, retrying fetcher and data providers
//! - [`storage`] - Storage trait with CSV and in-memory backends
//! - [`config`] - Environment-driven configuration and validation
//! - [`shutdown`] - Cooperative cancellation shared between pipelines
//! - [`metrics`] - Prometheus metrics for requests, retries and pipeline health

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// CLI command implementations
pub mod cli;

/// Configuration loading and validation
pub mod config;

/// HTTP transport, retrying fetcher and data providers
pub mod fetcher;

/// Pipeline metrics
pub mod metrics;

/// Polling and crawling orchestration
pub mod pipeline;

/// Cooperative shutdown coordination
pub mod shutdown;

/// Storage backends
pub mod storage;

/// A single timestamped price measurement produced by one poll cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    /// Display symbol (e.g., "BTC")
    pub symbol: String,
    /// Measured value in USD
    pub value: f64,
    /// When the value was observed
    pub timestamp: DateTime<Utc>,
    /// Provider the value came from (e.g., "coingecko")
    pub source: String,
}

impl Sample {
    /// Create a sample stamped with the current time
    pub fn now(symbol: impl Into<String>, value: f64, source: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            value,
            timestamp: Utc::now(),
            source: source.into(),
        }
    }

    /// Timestamp in the RFC 3339 form used by storage backends
    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// One normalized row of a ranked asset listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingRecord {
    /// Market-cap rank (1-based)
    pub rank: u32,
    /// Asset name (e.g., "Bitcoin")
    pub name: String,
    /// Ticker symbol (e.g., "BTC")
    pub symbol: String,
    /// Price in USD
    pub price: f64,
    /// 24h change in percent, 0.0 when upstream omits it
    #[serde(default)]
    pub change_24h: f64,
    /// Market capitalisation in USD, 0.0 when upstream omits it
    #[serde(default)]
    pub market_cap: f64,
}

impl ListingRecord {
    /// Validate listing record integrity
    pub fn validate(&self) -> Result<(), String> {
        if self.rank == 0 {
            return Err("Rank must be positive".to_string());
        }

        if self.name.trim().is_empty() {
            return Err("Name cannot be empty".to_string());
        }

        if self.symbol.trim().is_empty() {
            return Err("Symbol cannot be empty".to_string());
        }

        if !self.price.is_finite() || self.price < 0.0 {
            return Err(format!("Price must be a non-negative number, got {}", self.price));
        }

        Ok(())
    }
}

/// Current price as reported by a data provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    /// Provider-side asset identifier (e.g., "bitcoin")
    pub symbol: String,
    /// Price in USD
    pub price: f64,
    /// Provider's last update time (Unix seconds), if reported
    pub last_updated: Option<i64>,
}

/// A stored price as returned by [`storage::Storage::recent_prices`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    /// Price in USD
    pub price: f64,
    /// When the price was observed
    pub timestamp: DateTime<Utc>,
}

/// Format a USD amount with thousands separators and two decimals
/// (e.g., `43210.5` → `"43,210.50"`).
pub fn format_usd(amount: f64) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((&formatted, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}
