//! CoinGecko price provider

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::endpoints::coingecko_price_url;
use super::extract::PayloadExtractor;
use super::{DataProvider, FetcherError, FetcherResult, RetryingFetcher};
use crate::{ListingRecord, PriceQuote};

/// Single-asset USD price from the CoinGecko simple-price API
pub struct CoinGeckoProvider {
    fetcher: Arc<RetryingFetcher>,
    base_url: String,
}

impl CoinGeckoProvider {
    /// Create a provider on `base_url` (e.g., [`super::endpoints::COINGECKO_BASE_URL`])
    pub fn new(fetcher: Arc<RetryingFetcher>, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl DataProvider for CoinGeckoProvider {
    fn name(&self) -> &str {
        "coingecko"
    }

    async fn get_price(&self, symbol: &str) -> FetcherResult<PriceQuote> {
        let url = coingecko_price_url(&self.base_url, symbol);
        debug!(asset = symbol, url = %url, "Fetching CoinGecko price");

        let payload: Value = self.fetcher.fetch_json(&url).await?;
        PayloadExtractor::price_quote(&payload, symbol)
    }

    async fn get_listings(&self, page: u32, _per_page: u32) -> FetcherResult<Vec<ListingRecord>> {
        Err(FetcherError::Unsupported(format!(
            "coingecko does not serve ranked listings (page {page})"
        )))
    }

    async fn close(&self) {
        self.fetcher.close().await;
    }
}
