//! Crawler end to end: mock listing API, real HTTP client, CSV storage

use std::sync::Arc;
use std::time::Duration;

use crypto_crawler::fetcher::coinmarketcap::CoinMarketCapProvider;
use crypto_crawler::fetcher::{ReqwestTransport, RetryingFetcher};
use crypto_crawler::pipeline::{CrawlMode, PagedCrawler, RateLimiter, RetryPolicy};
use crypto_crawler::storage::csv::CsvStorage;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn listing_page(first_rank: u32, count: u32) -> Value {
    let items: Vec<Value> = (first_rank..first_rank + count)
        .map(|rank| {
            json!({
                "cmcRank": rank,
                "name": format!("Coin {rank}"),
                "symbol": format!("C{rank}"),
                "quotes": [{"price": rank as f64, "percentChange24h": 0.5, "marketCap": 1.0e6}]
            })
        })
        .collect();
    json!({"data": {"cryptoCurrencyList": items}})
}

#[tokio::test]
async fn failed_page_is_skipped_and_rest_written_once() {
    let server = MockServer::start().await;
    for page in [1u32, 2, 4, 5] {
        let start = (page - 1) * 3 + 1;
        Mock::given(method("GET"))
            .and(query_param("start", start.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing_page(start, 3)))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(query_param("start", "7"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let fetcher = Arc::new(RetryingFetcher::new(
        Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap()),
        Arc::new(RateLimiter::disabled()),
        RetryPolicy::new(2).with_base_delay(Duration::from_millis(10)),
    ));
    let provider = Arc::new(CoinMarketCapProvider::new(
        fetcher,
        &server.uri(),
        &format!("{}/listing", server.uri()),
    ));

    let temp_dir = TempDir::new().unwrap();
    let storage = Arc::new(CsvStorage::new(temp_dir.path().join("crypto")));
    let crawler = PagedCrawler::new(
        provider,
        storage.clone(),
        CrawlMode::Api,
        Duration::from_millis(5),
    );

    let report = crawler.run(5, 3).await.unwrap();

    assert_eq!(report.failed_pages, vec![3]);
    let ranks: Vec<u32> = report.records.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4, 5, 6, 10, 11, 12, 13, 14, 15]);

    let content = std::fs::read_to_string(storage.listings_path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "rank,name,symbol,price,change_24h,market_cap,timestamp");
    assert_eq!(lines.len(), 13);

    // One batch shares one timestamp
    let timestamps: std::collections::HashSet<&str> = lines[1..]
        .iter()
        .filter_map(|l| l.rsplit(',').next())
        .collect();
    assert_eq!(timestamps.len(), 1);
}
