//! Document vs. API crawl comparison

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::crawler::{CrawlMode, CrawlReport, PagedCrawler};
use super::PipelineResult;
use crate::config::CrawlerConfig;
use crate::fetcher::DataProvider;
use crate::storage::Storage;

/// Pages crawled per mode
pub const COMPARISON_PAGES: u32 = 2;
/// Records per API page
pub const COMPARISON_PER_PAGE: u32 = 50;
/// Pause between the two runs
pub const COMPARISON_PAUSE: Duration = Duration::from_secs(2);

/// Throughput of one crawl mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeStats {
    /// Records collected
    pub records: usize,
    /// Wall time of the run
    pub duration: Duration,
    /// `records / duration`, 0.0 for an instant run
    pub records_per_second: f64,
}

impl From<&CrawlReport> for ModeStats {
    fn from(report: &CrawlReport) -> Self {
        Self {
            records: report.records.len(),
            duration: report.elapsed,
            records_per_second: report.records_per_second(),
        }
    }
}

/// Side-by-side crawl throughput
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonReport {
    /// HTML document crawl
    pub document: ModeStats,
    /// JSON API crawl
    pub api: ModeStats,
}

impl ComparisonReport {
    /// How many times faster the API crawl was; `None` unless both rates are non-zero
    pub fn speedup(&self) -> Option<f64> {
        if self.document.records_per_second > 0.0 && self.api.records_per_second > 0.0 {
            Some(self.api.records_per_second / self.document.records_per_second)
        } else {
            None
        }
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Performance Comparison:")?;
        for (label, stats) in [("HTML", &self.document), ("JSON", &self.api)] {
            writeln!(
                f,
                "{label} Method: {} records in {:.2}s ({:.2} records/sec)",
                stats.records,
                stats.duration.as_secs_f64(),
                stats.records_per_second
            )?;
        }
        match self.speedup() {
            Some(ratio) => write!(f, "JSON is {ratio:.1}x faster"),
            None => write!(f, "No throughput ratio available"),
        }
    }
}

/// Crawl two document pages, pause, then two 50-record API pages
///
/// Both runs write to `storage`. A failed write ends the comparison.
pub async fn compare_modes(
    provider: Arc<dyn DataProvider>,
    storage: Arc<dyn Storage>,
    config: &CrawlerConfig,
) -> PipelineResult<ComparisonReport> {
    info!("Comparing document and API crawl throughput");

    let document = PagedCrawler::new(
        provider.clone(),
        storage.clone(),
        CrawlMode::Document,
        CrawlMode::Document.default_delay(config),
    )
    .run(COMPARISON_PAGES, COMPARISON_PER_PAGE)
    .await?;

    tokio::time::sleep(COMPARISON_PAUSE).await;

    let api = PagedCrawler::new(
        provider,
        storage,
        CrawlMode::Api,
        CrawlMode::Api.default_delay(config),
    )
    .run(COMPARISON_PAGES, COMPARISON_PER_PAGE)
    .await?;

    let report = ComparisonReport {
        document: ModeStats::from(&document),
        api: ModeStats::from(&api),
    };
    info!(
        html_records = report.document.records,
        json_records = report.api.records,
        speedup = report.speedup().unwrap_or(0.0),
        "Comparison finished"
    );
    Ok(report)
}
