//! CoinMarketCap listing provider
//!
//! Serves the same ranked listing two ways: the structured listing API
//! ([`DataProvider::get_listings`]) and the rendered ranking pages
//! ([`DataProvider::get_listings_document`]).

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::endpoints::{coinmarketcap_document_url, coinmarketcap_listing_url, DocumentSelectors};
use super::extract::PayloadExtractor;
use super::{DataProvider, FetcherError, FetcherResult, RetryingFetcher};
use crate::{ListingRecord, PriceQuote};

/// Ranked listings from CoinMarketCap
pub struct CoinMarketCapProvider {
    fetcher: Arc<RetryingFetcher>,
    base_url: String,
    api_url: String,
    selectors: DocumentSelectors,
}

impl CoinMarketCapProvider {
    /// Create a provider
    ///
    /// # Arguments
    /// * `fetcher` - Shared retrying client
    /// * `base_url` - Site root for document mode
    /// * `api_url` - Listing API endpoint for JSON mode
    pub fn new(fetcher: Arc<RetryingFetcher>, base_url: &str, api_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.to_string(),
            api_url: api_url.to_string(),
            selectors: DocumentSelectors::default(),
        }
    }

    /// Override the ranking table selectors (the site's class names drift)
    pub fn with_selectors(mut self, selectors: DocumentSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    /// Selectors used in document mode
    pub fn selectors(&self) -> &DocumentSelectors {
        &self.selectors
    }
}

#[async_trait]
impl DataProvider for CoinMarketCapProvider {
    fn name(&self) -> &str {
        "coinmarketcap"
    }

    async fn get_price(&self, symbol: &str) -> FetcherResult<PriceQuote> {
        Err(FetcherError::Unsupported(format!(
            "coinmarketcap price lookup for {symbol}"
        )))
    }

    async fn get_listings(&self, page: u32, per_page: u32) -> FetcherResult<Vec<ListingRecord>> {
        let url = coinmarketcap_listing_url(&self.api_url, page, per_page);
        debug!(page, per_page, url = %url, "Fetching listing page");

        let payload: Value = self.fetcher.fetch_json(&url).await?;
        let records = PayloadExtractor::listings_from_json(&payload);
        if records.is_empty() {
            warn!(page, "Listing API returned no usable records");
        }
        Ok(records)
    }

    async fn get_listings_document(&self, page: u32) -> FetcherResult<Vec<ListingRecord>> {
        let url = coinmarketcap_document_url(&self.base_url, page);
        debug!(page, url = %url, "Fetching listing document");

        let html = self.fetcher.fetch_text(&url).await?;
        let records = PayloadExtractor::listings_from_document(&html, &self.selectors)?;
        if records.is_empty() {
            warn!(page, "No listing rows matched the document selectors");
        }
        Ok(records)
    }

    async fn close(&self) {
        self.fetcher.close().await;
    }
}
