//! Multi-page listing crawler
//!
//! Walks pages `1..=page_count`, tolerating individual page failures, and
//! hands the accumulated batch to storage in a single write at the end.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info};

use super::{PipelineError, PipelineResult};
use crate::config::CrawlerConfig;
use crate::fetcher::{DataProvider, FetcherResult};
use crate::metrics::{record_crawl_complete, record_page};
use crate::shutdown::SharedShutdown;
use crate::storage::Storage;
use crate::ListingRecord;

/// How listing pages are obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlMode {
    /// Structured JSON listing API
    Api,
    /// Rendered HTML ranking pages
    Document,
}

impl CrawlMode {
    /// Short label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlMode::Api => "api",
            CrawlMode::Document => "html",
        }
    }

    /// Configured pause between pages for this mode
    pub fn default_delay(&self, config: &CrawlerConfig) -> Duration {
        match self {
            CrawlMode::Api => config.json_api_delay,
            CrawlMode::Document => config.html_scraping_delay,
        }
    }
}

impl fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrawlMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "api" | "json" => Ok(CrawlMode::Api),
            "html" | "document" => Ok(CrawlMode::Document),
            other => Err(format!("Invalid crawl mode '{other}'. Valid options: api, html")),
        }
    }
}

/// Result of one crawl run
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlReport {
    /// Mode the run used
    pub mode: CrawlMode,
    /// Every record delivered to storage, in page order
    pub records: Vec<ListingRecord>,
    /// Pages whose fetch or extraction failed
    pub failed_pages: Vec<u32>,
    /// Pages actually attempted (fewer than requested after a shutdown)
    pub pages_attempted: u32,
    /// Wall time of the run, including inter-page delays
    pub elapsed: Duration,
}

impl CrawlReport {
    /// Records per second over the whole run; 0.0 for an instant run
    pub fn records_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.records.len() as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Crawled {} coins via {} in {:.2}s ({} pages, {} failed)",
            self.records.len(),
            self.mode,
            self.elapsed.as_secs_f64(),
            self.pages_attempted,
            self.failed_pages.len()
        )
    }
}

/// Bounded listing crawler
pub struct PagedCrawler {
    provider: Arc<dyn DataProvider>,
    storage: Arc<dyn Storage>,
    mode: CrawlMode,
    inter_page_delay: Duration,
    shutdown: Option<SharedShutdown>,
}

impl PagedCrawler {
    /// Create a crawler
    ///
    /// # Arguments
    /// * `provider` - Listing source
    /// * `storage` - Receives the final batch
    /// * `mode` - API or document pages
    /// * `inter_page_delay` - Pause before every page after the first
    pub fn new(
        provider: Arc<dyn DataProvider>,
        storage: Arc<dyn Storage>,
        mode: CrawlMode,
        inter_page_delay: Duration,
    ) -> Self {
        Self {
            provider,
            storage,
            mode,
            inter_page_delay,
            shutdown: None,
        }
    }

    /// Stop at the next page boundary once shutdown is requested
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Crawl mode
    pub fn mode(&self) -> CrawlMode {
        self.mode
    }

    /// Crawl `page_count` pages and store everything collected
    ///
    /// `per_page` only applies in API mode. Page failures are logged and
    /// skipped; only a failed final write is returned as an error.
    pub async fn run(&self, page_count: u32, per_page: u32) -> PipelineResult<CrawlReport> {
        let started = Instant::now();
        let mut records = Vec::new();
        let mut failed_pages = Vec::new();
        let mut pages_attempted = 0;

        info!(
            mode = %self.mode,
            pages = page_count,
            per_page,
            provider = self.provider.name(),
            "Starting crawl"
        );

        for page in 1..=page_count {
            let paused = page == 1 || self.pause().await;
            if !paused || self.is_cancelled() {
                info!(page, "Shutdown requested, ending crawl early");
                break;
            }

            pages_attempted += 1;
            debug!(page, mode = %self.mode, "Fetching page");
            match self.fetch_page(page, per_page).await {
                Ok(page_records) => {
                    record_page(self.mode.as_str(), true);
                    debug!(page, count = page_records.len(), "Page fetched");
                    records.extend(page_records);
                }
                Err(err) => {
                    record_page(self.mode.as_str(), false);
                    error!(page, error = %err, "Error fetching page, continuing");
                    failed_pages.push(page);
                }
            }
        }

        if let Err(err) = self.storage.store_listings(&records).await {
            error!(
                count = records.len(),
                storage = self.storage.name(),
                error = %err,
                "Failed to store crawl batch"
            );
            return Err(PipelineError::Storage(err));
        }

        let report = CrawlReport {
            mode: self.mode,
            records,
            failed_pages,
            pages_attempted,
            elapsed: started.elapsed(),
        };
        record_crawl_complete(self.mode.as_str(), report.records.len(), report.elapsed);
        info!("{}", report);
        Ok(report)
    }

    async fn fetch_page(&self, page: u32, per_page: u32) -> FetcherResult<Vec<ListingRecord>> {
        match self.mode {
            CrawlMode::Api => self.provider.get_listings(page, per_page).await,
            CrawlMode::Document => self.provider.get_listings_document(page).await,
        }
    }

    /// Inter-page pause; `false` when cut short by shutdown
    async fn pause(&self) -> bool {
        match &self.shutdown {
            Some(shutdown) => shutdown.sleep_or_shutdown(self.inter_page_delay).await,
            None => {
                tokio::time::sleep(self.inter_page_delay).await;
                true
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|s| s.is_shutdown_requested())
    }
}
