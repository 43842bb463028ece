//! Observability metrics for the crawler pipelines
//!
//! Tracks HTTP requests, retry behavior, poll cycle health and crawl page
//! outcomes.
//!
//! ## Architecture
//!
//! - Uses `metrics` crate for low-overhead metric collection
//! - Prometheus exporter for scraping endpoint (enabled with `--metrics-addr`)
//! - Without an installed recorder every call is a cheap no-op

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Correlation ID generator for request tracing
static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Metrics setup errors
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Exporter could not be installed
    #[error("failed to install Prometheus exporter: {0}")]
    InstallError(String),
}

/// Initialize metrics system with Prometheus exporter
///
/// Idempotent: later calls are ignored once the exporter is installed.
///
/// # Arguments
/// * `addr` - Socket address to bind Prometheus scrape endpoint (e.g., "0.0.0.0:9090")
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    if METRICS_INITIALIZED.load(Ordering::SeqCst) {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::InstallError(e.to_string()))?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP attempts made to data providers"
    );
    describe_counter!(
        "http_retries_total",
        Unit::Count,
        "Total number of retry attempts"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration in seconds"
    );
    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Duration of retry backoff in seconds"
    );
    describe_counter!(
        "poll_cycles_total",
        Unit::Count,
        "Poll cycles by outcome"
    );
    describe_gauge!(
        "poll_consecutive_failures",
        Unit::Count,
        "Current run of consecutive poll failures"
    );
    describe_gauge!(
        "poll_last_price",
        Unit::Count,
        "Most recent polled price"
    );
    describe_counter!(
        "crawl_pages_total",
        Unit::Count,
        "Crawled pages by mode and outcome"
    );
    describe_counter!(
        "crawl_records_total",
        Unit::Count,
        "Listing records delivered to storage"
    );

    METRICS_INITIALIZED.store(true, Ordering::SeqCst);
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Check if metrics system is initialized
pub fn is_initialized() -> bool {
    METRICS_INITIALIZED.load(Ordering::SeqCst)
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Reduce a URL to `host/path` so query strings do not explode label cardinality
fn endpoint_label(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => format!("{}{}", parsed.host_str().unwrap_or(""), parsed.path()),
        Err(_) => url.split('?').next().unwrap_or(url).to_string(),
    }
}

/// Record an HTTP request with timing
pub struct HttpRequestMetrics {
    endpoint: String,
    start_time: Instant,
    correlation_id: String,
    attempt: u32,
}

impl HttpRequestMetrics {
    /// Start recording a new HTTP attempt
    pub fn start(url: &str, attempt: u32) -> Self {
        let endpoint = endpoint_label(url);
        let correlation_id = generate_correlation_id();

        debug!(
            correlation_id = %correlation_id,
            endpoint = %endpoint,
            attempt = attempt,
            "Starting HTTP request metrics"
        );

        Self {
            endpoint,
            start_time: Instant::now(),
            correlation_id,
            attempt,
        }
    }

    /// Record completion of the HTTP request
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => status_code.to_string(),
            "attempt" => self.attempt.to_string(),
        )
        .increment(1);

        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            status = status_code,
            duration_ms = duration.as_millis() as u64,
            "HTTP request completed"
        );
    }

    /// Record a network error (no status code)
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => "network_error",
            "attempt" => self.attempt.to_string(),
        )
        .increment(1);

        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        warn!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            attempt = self.attempt,
            duration_ms = duration.as_millis() as u64,
            "Network error recorded"
        );
    }

    /// Get the correlation ID for this request
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record retry backoff duration
pub fn record_retry_backoff(duration: Duration, attempt: u32) {
    counter!(
        "http_retries_total",
        "attempt" => attempt.to_string(),
    )
    .increment(1);

    histogram!(
        "retry_backoff_duration_seconds",
        "attempt" => attempt.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record a successful poll cycle
pub fn record_poll_success(symbol: &str, price: f64) {
    counter!(
        "poll_cycles_total",
        "symbol" => symbol.to_string(),
        "outcome" => "success",
    )
    .increment(1);
    gauge!("poll_last_price", "symbol" => symbol.to_string()).set(price);
    gauge!("poll_consecutive_failures", "symbol" => symbol.to_string()).set(0.0);
}

/// Record a failed poll cycle
pub fn record_poll_failure(symbol: &str, consecutive: u32) {
    counter!(
        "poll_cycles_total",
        "symbol" => symbol.to_string(),
        "outcome" => "failure",
    )
    .increment(1);
    gauge!("poll_consecutive_failures", "symbol" => symbol.to_string()).set(consecutive as f64);
}

/// Record the outcome of one crawled page
pub fn record_page(mode: &str, succeeded: bool) {
    counter!(
        "crawl_pages_total",
        "mode" => mode.to_string(),
        "outcome" => if succeeded { "success" } else { "failure" },
    )
    .increment(1);
}

/// Record a completed crawl run
pub fn record_crawl_complete(mode: &str, records: usize, duration: Duration) {
    counter!("crawl_records_total", "mode" => mode.to_string()).increment(records as u64);

    info!(
        mode = mode,
        records = records,
        duration_ms = duration.as_millis() as u64,
        "Crawl run recorded"
    );
}
