//! Data fetching: transport, retrying client and providers
//!
//! - [`transport`] - the one-shot GET seam (`reqwest` in production)
//! - [`http`] - [`RetryingFetcher`], the rate-limited retrying client
//! - [`extract`] - payload extraction into [`PriceQuote`] / [`ListingRecord`]
//! - [`coingecko`], [`coinmarketcap`] - [`DataProvider`] implementations

use crate::{ListingRecord, PriceQuote};
use async_trait::async_trait;

pub mod coingecko;
pub mod coinmarketcap;
pub mod endpoints;
pub mod extract;
pub mod http;
pub mod retry_formatter;
pub mod transport;

pub use http::RetryingFetcher;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// 4xx response; the request itself is wrong and is never retried
    #[error("client error {status} for {url}")]
    Client {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Transient failures persisted through every attempt
    #[error("request to {url} failed after {attempts} attempts: {last_error}")]
    ExhaustedRetries {
        /// Requested URL
        url: String,
        /// Attempts made
        attempts: u32,
        /// Status of the last attempt, if it produced a response
        last_status: Option<u16>,
        /// Description of the last failure
        last_error: String,
    },

    /// Response body could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// Payload parsed but lacks a required field
    #[error("missing field: {0}")]
    MissingField(String),

    /// Transport could not be set up
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Transport was already released
    #[error("HTTP client closed")]
    Closed,

    /// Provider does not offer this capability
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Market data source consumed by the pipelines
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Short provider name used as sample source and in logs
    fn name(&self) -> &str;

    /// Fetch the current USD price of `symbol` (provider-side asset id)
    async fn get_price(&self, symbol: &str) -> FetcherResult<PriceQuote>;

    /// Fetch one page of ranked listings from a structured API
    ///
    /// # Arguments
    /// * `page` - 1-based page number
    /// * `per_page` - Records per page
    async fn get_listings(&self, page: u32, per_page: u32) -> FetcherResult<Vec<ListingRecord>>;

    /// Fetch one page of ranked listings by reading the rendered document
    async fn get_listings_document(&self, page: u32) -> FetcherResult<Vec<ListingRecord>> {
        Err(FetcherError::Unsupported(format!(
            "{} does not serve listing documents (page {page})",
            self.name()
        )))
    }

    /// Release the provider's transport
    async fn close(&self) {}
}
