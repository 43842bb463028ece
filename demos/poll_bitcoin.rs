//! Example: poll the Bitcoin price into memory for a few seconds
//!
//! Run with: cargo run --example poll_bitcoin

use std::sync::Arc;
use std::time::Duration;

use crypto_crawler::config::CrawlerConfig;
use crypto_crawler::fetcher::coingecko::CoinGeckoProvider;
use crypto_crawler::fetcher::RetryingFetcher;
use crypto_crawler::pipeline::{Poller, PollerSettings};
use crypto_crawler::shutdown::ShutdownCoordinator;
use crypto_crawler::storage::memory::MemoryStorage;
use crypto_crawler::storage::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("crypto_crawler=info")
        .init();

    let config = CrawlerConfig {
        poll_interval: Duration::from_secs(2),
        moving_average_window: 3,
        ..CrawlerConfig::from_env()?
    };

    let fetcher = Arc::new(RetryingFetcher::from_config(&config)?);
    let provider = Arc::new(CoinGeckoProvider::new(fetcher, &config.coingecko_base_url));
    let storage = Arc::new(MemoryStorage::new());
    let shutdown = ShutdownCoordinator::shared();

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            shutdown.request_shutdown();
        }
    });

    let mut poller = Poller::new(
        provider,
        storage.clone(),
        PollerSettings::from_config(&config),
        shutdown,
    )
    .with_reporter(|tick| println!("{tick}"));

    let outcome = poller.start().await;
    println!(
        "\n{} cycles, {} stored, {} failed",
        outcome.cycles, outcome.successes, outcome.failures
    );

    for point in storage.recent_prices("BTC", 3).await? {
        println!("{}  ${:.2}", point.timestamp, point.price);
    }
    Ok(())
}
