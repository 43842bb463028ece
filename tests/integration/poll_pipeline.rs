//! Poller end to end: mock CoinGecko, real HTTP client, file-backed storage

use std::sync::Arc;
use std::time::Duration;

use crypto_crawler::fetcher::coingecko::CoinGeckoProvider;
use crypto_crawler::fetcher::{ReqwestTransport, RetryingFetcher};
use crypto_crawler::pipeline::{
    FailureBackoff, PipelineError, PollerSettings, Poller, RateLimiter, RetryPolicy, StopReason,
};
use crypto_crawler::shutdown::ShutdownCoordinator;
use crypto_crawler::storage::csv::CsvStorage;
use crypto_crawler::storage::{open_storage, Storage, StorageKind};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> Arc<CoinGeckoProvider> {
    let fetcher = RetryingFetcher::new(
        Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap()),
        Arc::new(RateLimiter::disabled()),
        RetryPolicy::new(1),
    );
    Arc::new(CoinGeckoProvider::new(Arc::new(fetcher), &server.uri()))
}

fn settings() -> PollerSettings {
    PollerSettings {
        poll_interval: Duration::from_millis(20),
        max_consecutive_failures: 3,
        moving_average_window: 2,
        failure_backoff: FailureBackoff {
            base: Duration::from_millis(10),
            cap: Duration::from_millis(40),
        },
        ..PollerSettings::default()
    }
}

#[tokio::test]
async fn polled_prices_land_in_csv_until_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bitcoin": {"usd": 43000.0, "last_updated_at": 1704067200}
        })))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let storage = Arc::new(CsvStorage::new(temp_dir.path().join("crypto")));
    let shutdown = ShutdownCoordinator::shared();

    let mut poller = Poller::new(provider(&server), storage.clone(), settings(), shutdown.clone());
    let handle = tokio::spawn(async move { poller.start().await });

    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown.request_shutdown();
    let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome.reason, StopReason::Cancelled);
    assert!(outcome.successes >= 2);
    assert_eq!(outcome.failures, 0);

    let stored = storage.recent_prices("BTC", 100).await.unwrap();
    assert_eq!(stored.len() as u64, outcome.successes);
    assert!(stored.iter().all(|p| p.price == 43000.0));
    assert!(stored.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn polled_prices_land_in_sqlite() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bitcoin": {"usd": 42000.0, "last_updated_at": 1704067200}
        })))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let storage = open_storage(StorageKind::Sqlite, temp_dir.path(), "phase1_data");
    let shutdown = ShutdownCoordinator::shared();

    let mut poller = Poller::new(provider(&server), storage.clone(), settings(), shutdown.clone());
    let handle = tokio::spawn(async move { poller.start().await });

    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown.request_shutdown();
    let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome.failures, 0);
    assert!(temp_dir.path().join("phase1_data.db").exists());
    let stored = storage.recent_prices("BTC", 100).await.unwrap();
    assert_eq!(stored.len() as u64, outcome.successes);
    assert!(stored.iter().all(|p| p.price == 42000.0));
}

#[tokio::test]
async fn failing_upstream_stops_poller() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let mut poller = Poller::new(
        provider(&server),
        Arc::new(CsvStorage::new(temp_dir.path().join("crypto"))),
        settings(),
        ShutdownCoordinator::shared(),
    );

    let outcome = tokio::time::timeout(Duration::from_secs(5), poller.start())
        .await
        .unwrap();

    assert_eq!(outcome.cycles, 3);
    let err = outcome.into_result().unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ConsecutiveFailureLimit { consecutive: 3, .. }
    ));
}
