//! Retrying fetcher against a real HTTP server

use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crypto_crawler::fetcher::{FetcherError, ReqwestTransport, RetryingFetcher};
use crypto_crawler::pipeline::{RateLimiter, RetryPolicy};
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(max_retries: u32, requests_per_second: f64) -> RetryingFetcher {
    RetryingFetcher::new(
        Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap()),
        Arc::new(RateLimiter::per_second(requests_per_second)),
        RetryPolicy::new(max_retries).with_base_delay(Duration::from_millis(10)),
    )
}

/// Collects formatted log output for assertions
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn retries_server_errors_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"value": 42}"#))
        .expect(1)
        .mount(&server)
        .await;

    let value: Value = fetcher(3, 0.0)
        .fetch_json(&format!("{}/flaky", server.uri()))
        .await
        .unwrap();

    assert_eq!(value["value"], 42);
}

#[tokio::test]
async fn exhausts_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&server)
        .await;

    let err = fetcher(4, 0.0)
        .fetch_text(&format!("{}/down", server.uri()))
        .await
        .unwrap_err();

    match err {
        FetcherError::ExhaustedRetries {
            attempts,
            last_status,
            ..
        } => {
            assert_eq!(attempts, 4);
            assert_eq!(last_status, Some(500));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn client_error_fails_after_one_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = fetcher(5, 0.0)
        .fetch_text(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetcherError::Client { status: 404, .. }));
}

#[tokio::test]
async fn rate_limit_response_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer({
            let logs = logs.clone();
            move || logs.clone()
        })
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let err = fetcher(5, 0.0).fetch_text(&server.uri()).await.unwrap_err();
    assert!(matches!(err, FetcherError::Client { status: 429, .. }));

    let output = logs.contents();
    assert!(output.contains("failed after 1 attempt"), "logs: {output}");
    assert!(output.contains("client error 429"), "logs: {output}");
    assert!(output.contains("Lower CRYPTO_REQUESTS_PER_SECOND"), "logs: {output}");
}

#[tokio::test]
async fn two_requests_per_second_spaces_three_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = fetcher(1, 2.0);
    let started = Instant::now();
    for _ in 0..3 {
        fetcher.fetch_text(&server.uri()).await.unwrap();
    }

    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn closed_fetcher_rejects_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = fetcher(3, 0.0);
    fetcher.close().await;

    let err = fetcher.fetch_text(&server.uri()).await.unwrap_err();
    assert!(matches!(err, FetcherError::Closed));
}

#[tokio::test]
async fn connection_refused_is_retried_then_exhausted() {
    // Bind and drop a listener to get a port with nothing behind it
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let err = fetcher(2, 0.0)
        .fetch_text(&format!("http://127.0.0.1:{port}/"))
        .await
        .unwrap_err();

    match err {
        FetcherError::ExhaustedRetries {
            attempts,
            last_status,
            ..
        } => {
            assert_eq!(attempts, 2);
            assert_eq!(last_status, None);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
