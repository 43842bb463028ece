//! Command-line surface: global options, subcommands and their execution

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::CliError;
use crate::config::CrawlerConfig;
use crate::fetcher::coingecko::CoinGeckoProvider;
use crate::fetcher::coinmarketcap::CoinMarketCapProvider;
use crate::fetcher::{DataProvider, RetryingFetcher};
use crate::pipeline::{
    compare_modes, ComparisonReport, CrawlMode, CrawlReport, PagedCrawler, PollOutcome, Poller,
    PollerSettings,
};
use crate::shutdown::{SharedShutdown, ShutdownCoordinator};
use crate::storage::{open_storage, Storage, StorageKind};

/// Parse a positive number of seconds
fn parse_seconds(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("interval must be positive, got {value}"));
    }
    Ok(value)
}

/// Which part of the pipeline `run` executes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Price poller only
    Poll,
    /// Document crawl, API crawl and comparison
    Crawl,
    /// Poller, then the crawl phase once the poller stops
    Both,
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "poll" | "1" => Ok(Phase::Poll),
            "crawl" | "2" => Ok(Phase::Crawl),
            "both" => Ok(Phase::Both),
            _ => Err(format!("Invalid phase: {s}. Valid options: poll, crawl, both")),
        }
    }
}

/// Command-line interface
#[derive(Parser, Debug)]
#[command(name = "crypto-crawler")]
#[command(about = "Poll crypto prices and crawl ranked listings", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Storage backend: csv, sqlite or memory
    #[arg(long, global = true)]
    pub storage: Option<StorageKind>,

    /// Directory for CSV and SQLite files
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level: TRACE, DEBUG, INFO, WARNING or ERROR
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Shorthand for --log-level DEBUG
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Maximum attempts per request (range: 1-20)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_retries: Option<u32>,

    /// Outbound request rate per client; 0 disables limiting
    #[arg(long, global = true)]
    pub requests_per_second: Option<f64>,

    /// Serve Prometheus metrics on this address (e.g., 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll a single asset price until Ctrl+C or repeated failures
    Poll(PollArgs),

    /// Crawl ranked listings page by page
    Crawl(CrawlArgs),

    /// Compare document and API crawl throughput
    Compare,

    /// Run the poll and/or crawl phases
    Run(RunArgs),
}

/// `poll` arguments
#[derive(Args, Debug)]
pub struct PollArgs {
    /// Provider asset id
    #[arg(long, default_value = "bitcoin")]
    pub asset: String,

    /// Display symbol
    #[arg(long, default_value = "BTC")]
    pub symbol: String,

    /// Seconds between successful polls
    #[arg(long, value_parser = parse_seconds)]
    pub interval: Option<f64>,
}

/// `crawl` arguments
#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Crawl mode: api or html
    #[arg(long, default_value = "api")]
    pub mode: CrawlMode,

    /// Pages to crawl
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub pages: Option<u32>,

    /// Records per page (api mode)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub per_page: Option<u32>,
}

/// `run` arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Phase to run: poll, crawl or both
    #[arg(long, default_value = "both")]
    pub phase: Phase,
}

impl Cli {
    /// Environment configuration with command-line overrides, validated
    pub fn resolve_config(&self) -> Result<CrawlerConfig, CliError> {
        let mut config = CrawlerConfig::from_env()?;
        self.apply_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply global and per-command overrides to `config`
    pub fn apply_overrides(&self, config: &mut CrawlerConfig) -> Result<(), CliError> {
        if let Some(kind) = self.storage {
            config.storage_type = kind;
        }
        if let Some(dir) = &self.data_dir {
            config.data_directory = dir.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        } else if self.verbose {
            config.log_level = "DEBUG".to_string();
        }
        if let Some(retries) = self.max_retries {
            config.http_max_retries = retries;
        }
        if let Some(rps) = self.requests_per_second {
            config.requests_per_second = rps;
        }

        match &self.command {
            Commands::Poll(args) => {
                if let Some(secs) = args.interval {
                    config.poll_interval = Duration::try_from_secs_f64(secs).map_err(|e| {
                        CliError::InvalidArgument(format!("interval {secs}: {e}"))
                    })?;
                }
            }
            Commands::Crawl(args) => {
                if let Some(pages) = args.pages {
                    config.cmc_pages_per_scrape = pages;
                }
                if let Some(per_page) = args.per_page {
                    config.cmc_coins_per_page = per_page;
                }
            }
            Commands::Compare | Commands::Run(_) => {}
        }
        Ok(())
    }

    /// Run the selected command to completion
    pub async fn execute(
        &self,
        config: &CrawlerConfig,
        shutdown: SharedShutdown,
    ) -> Result<(), CliError> {
        info!(
            storage = %config.storage_type,
            timeout_secs = config.http_timeout.as_secs_f64(),
            retries = config.http_max_retries,
            "Configuration loaded"
        );

        match &self.command {
            Commands::Poll(args) => {
                let storage = open_storage(config.storage_type, &config.data_directory, "crypto");
                let settings = PollerSettings {
                    asset_id: args.asset.clone(),
                    symbol: args.symbol.clone(),
                    ..PollerSettings::from_config(config)
                };
                run_poll(config, settings, storage, shutdown).await?.into_result()?;
                Ok(())
            }
            Commands::Crawl(args) => {
                let storage = open_storage(config.storage_type, &config.data_directory, "crypto");
                run_crawl(config, args.mode, storage, Some(shutdown)).await?;
                Ok(())
            }
            Commands::Compare => {
                let storage = open_storage(config.storage_type, &config.data_directory, "crypto");
                run_compare(config, storage).await?;
                Ok(())
            }
            Commands::Run(args) => run_phases(config, args.phase, shutdown).await,
        }
    }
}

fn listing_provider(config: &CrawlerConfig) -> Result<Arc<CoinMarketCapProvider>, CliError> {
    let fetcher = Arc::new(RetryingFetcher::from_config(config)?);
    Ok(Arc::new(CoinMarketCapProvider::new(
        fetcher,
        &config.coinmarketcap_base_url,
        &config.coinmarketcap_api_url,
    )))
}

/// Poll until cancelled or stopped by failures; the fetcher is closed on return
async fn run_poll(
    config: &CrawlerConfig,
    settings: PollerSettings,
    storage: Arc<dyn Storage>,
    shutdown: SharedShutdown,
) -> Result<PollOutcome, CliError> {
    let fetcher = Arc::new(RetryingFetcher::from_config(config)?);
    let provider = Arc::new(CoinGeckoProvider::new(fetcher, &config.coingecko_base_url));

    println!("Starting {} price poller...", settings.symbol);
    println!("Press Ctrl-C to stop");

    let mut poller =
        Poller::new(provider, storage, settings, shutdown).with_reporter(|tick| println!("{tick}"));
    let outcome = poller.start().await;

    println!("Price poller stopped.");
    Ok(outcome)
}

/// One crawl run with a dedicated fetcher
async fn run_crawl(
    config: &CrawlerConfig,
    mode: CrawlMode,
    storage: Arc<dyn Storage>,
    shutdown: Option<SharedShutdown>,
) -> Result<CrawlReport, CliError> {
    let provider = listing_provider(config)?;
    let mut crawler = PagedCrawler::new(
        provider.clone(),
        storage,
        mode,
        mode.default_delay(config),
    );
    if let Some(shutdown) = shutdown {
        crawler = crawler.with_shutdown(shutdown);
    }

    println!(
        "Crawling CoinMarketCap via {mode} (pages 1-{})...",
        config.cmc_pages_per_scrape
    );
    let result = crawler
        .run(config.cmc_pages_per_scrape, config.cmc_coins_per_page)
        .await;
    provider.close().await;

    let report = result?;
    println!("{report}");
    Ok(report)
}

async fn run_compare(
    config: &CrawlerConfig,
    storage: Arc<dyn Storage>,
) -> Result<ComparisonReport, CliError> {
    let provider = listing_provider(config)?;
    println!("Comparing HTML vs JSON methods...");

    let result = compare_modes(provider.clone(), storage, config).await;
    provider.close().await;

    let report = result?;
    println!("\n{report}");
    Ok(report)
}

/// Shutdown token for the crawl phase of `run`
///
/// A Ctrl+C that already ended the poll phase of `Both` is spent, so the crawl
/// phase gets a fresh token tripped by the next Ctrl+C. Abort the returned
/// listener once the phase is over.
fn crawl_phase_shutdown(
    phase: Phase,
    shutdown: SharedShutdown,
) -> (SharedShutdown, Option<JoinHandle<()>>) {
    if phase != Phase::Both || !shutdown.is_shutdown_requested() {
        return (shutdown, None);
    }

    let fresh = ShutdownCoordinator::shared();
    let listener = tokio::spawn({
        let fresh = fresh.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl+C received - stopping crawl phase");
                fresh.request_shutdown();
            }
        }
    });
    (fresh, Some(listener))
}

/// Phase 1 stores under `phase1_data`, phase 2 under `phase2_data`
///
/// With `Both`, the first Ctrl+C ends the poller and the crawl phase still
/// starts; a further Ctrl+C stops the crawl at a page boundary and skips the
/// comparison. A poller stopped by failures does not skip the crawl phase, but
/// its error is returned afterwards.
async fn run_phases(
    config: &CrawlerConfig,
    phase: Phase,
    shutdown: SharedShutdown,
) -> Result<(), CliError> {
    let mut poll_result = Ok(());

    if matches!(phase, Phase::Poll | Phase::Both) {
        println!("=== PHASE 1: Price Pulse ===");
        let storage = open_storage(config.storage_type, &config.data_directory, "phase1_data");
        let outcome = run_poll(
            config,
            PollerSettings::from_config(config),
            storage,
            shutdown.clone(),
        )
        .await?;
        if let Err(err) = outcome.into_result() {
            warn!(error = %err, "Price poller stopped by failures");
            println!("ERROR: {err}");
            poll_result = Err(CliError::from(err));
        }
    }

    if matches!(phase, Phase::Crawl | Phase::Both) {
        let (crawl_shutdown, listener) = crawl_phase_shutdown(phase, shutdown);
        let result = run_crawl_phase(config, crawl_shutdown).await;
        if let Some(listener) = listener {
            listener.abort();
        }
        result?;
    }

    poll_result
}

async fn run_crawl_phase(config: &CrawlerConfig, shutdown: SharedShutdown) -> Result<(), CliError> {
    println!("\n=== PHASE 2: CoinMarketCap Watchlist ===");
    let storage = open_storage(config.storage_type, &config.data_directory, "phase2_data");

    println!("=== Phase 2.1: HTML Scraping ===");
    run_crawl(config, CrawlMode::Document, storage.clone(), Some(shutdown.clone())).await?;

    println!("\n=== Phase 2.2: JSON API ===");
    run_crawl(config, CrawlMode::Api, storage.clone(), Some(shutdown.clone())).await?;

    if shutdown.is_shutdown_requested() {
        println!("\nInterrupted, skipping performance comparison");
        return Ok(());
    }

    println!("\n=== Performance Comparison ===");
    run_compare(config, storage).await?;
    Ok(())
}
