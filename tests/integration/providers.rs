//! Providers against a mock HTTP server

use std::sync::Arc;
use std::time::Duration;

use crypto_crawler::fetcher::coingecko::CoinGeckoProvider;
use crypto_crawler::fetcher::coinmarketcap::CoinMarketCapProvider;
use crypto_crawler::fetcher::extract::PLACEHOLDER_MARKET_CAP_MULTIPLIER;
use crypto_crawler::fetcher::{
    DataProvider, FetcherError, ReqwestTransport, RetryingFetcher,
};
use crypto_crawler::pipeline::{RateLimiter, RetryPolicy};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn shared_fetcher() -> Arc<RetryingFetcher> {
    Arc::new(RetryingFetcher::new(
        Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap()),
        Arc::new(RateLimiter::disabled()),
        RetryPolicy::new(2).with_base_delay(Duration::from_millis(10)),
    ))
}

fn cmc(server: &MockServer) -> CoinMarketCapProvider {
    CoinMarketCapProvider::new(
        shared_fetcher(),
        &server.uri(),
        &format!("{}/data-api/v3/cryptocurrency/listing", server.uri()),
    )
}

const RANKING_PAGE: &str = r#"
<html><body><table><tbody>
  <tr class="cmc-table-row">
    <td><p>2</p></td>
    <td><p class="sc-4984dd93-0">Ethereum</p><p class="coin-item-symbol">ETH</p></td>
    <td><div class="sc-b3fc6b7-0"><span>$2,301.25</span></div></td>
    <td><span class="icon-Caret-down"></span><span>1.10%</span></td>
  </tr>
  <tr class="cmc-table-row">
    <td><p>3</p></td>
    <td><p class="coin-item-symbol">USDT</p></td>
    <td><div class="sc-b3fc6b7-0">$1.00</div></td>
  </tr>
</tbody></table></body></html>
"#;

#[tokio::test]
async fn coingecko_price_is_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .and(query_param("ids", "bitcoin"))
        .and(query_param("vs_currencies", "usd"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bitcoin": {"usd": 43210.5, "last_updated_at": 1704067200}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = CoinGeckoProvider::new(shared_fetcher(), &server.uri());
    let quote = provider.get_price("bitcoin").await.unwrap();

    assert_eq!(quote.price, 43210.5);
    assert_eq!(quote.last_updated, Some(1704067200));
    assert_eq!(provider.name(), "coingecko");
}

#[tokio::test]
async fn coingecko_missing_asset_is_missing_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let provider = CoinGeckoProvider::new(shared_fetcher(), &server.uri());
    let err = provider.get_price("bitcoin").await.unwrap_err();
    assert!(matches!(err, FetcherError::MissingField(_)));

    let err = provider.get_listings(1, 10).await.unwrap_err();
    assert!(matches!(err, FetcherError::Unsupported(_)));
}

#[tokio::test]
async fn coinmarketcap_listing_page_offsets_and_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data-api/v3/cryptocurrency/listing"))
        .and(query_param("start", "21"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"cryptoCurrencyList": [
                {"cmcRank": 21, "name": "Polkadot", "symbol": "DOT",
                 "quotes": [{"price": 7.5, "percentChange24h": -2.5, "marketCap": 9.1e9}]},
                {"cmcRank": 22, "name": "Tron", "symbol": "TRX",
                 "quotes": [{"price": 0.1}]},
                {"cmcRank": 23, "symbol": "NONAME", "quotes": [{"price": 1.0}]}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let records = cmc(&server).get_listings(2, 20).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].symbol, "DOT");
    assert_eq!(records[0].change_24h, -2.5);
    assert_eq!(records[1].change_24h, 0.0);
    assert_eq!(records[1].market_cap, 0.0);
}

#[tokio::test]
async fn coinmarketcap_document_rows_are_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page/2/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RANKING_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let records = cmc(&server).get_listings_document(2).await.unwrap();

    assert_eq!(records.len(), 1);
    let eth = &records[0];
    assert_eq!(eth.rank, 2);
    assert_eq!(eth.name, "Ethereum");
    assert_eq!(eth.symbol, "ETH");
    assert_eq!(eth.price, 2301.25);
    assert_eq!(eth.change_24h, 1.10);
    assert!(eth.market_cap > 0.0);
    assert_eq!(eth.market_cap, eth.price * PLACEHOLDER_MARKET_CAP_MULTIPLIER);
}

#[tokio::test]
async fn coinmarketcap_blocked_document_is_client_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let provider = cmc(&server);
    let err = provider.get_listings_document(1).await.unwrap_err();
    assert!(matches!(err, FetcherError::Client { status: 403, .. }));

    let err = provider.get_price("bitcoin").await.unwrap_err();
    assert!(matches!(err, FetcherError::Unsupported(_)));
}
