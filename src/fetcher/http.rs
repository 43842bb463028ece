//! Rate-limited retrying HTTP client
//!
//! Wraps one logical GET with:
//! - a single [`RateLimiter::wait`] per call
//! - exponential backoff on 5xx responses and transport failures
//! - immediate failure on 4xx responses
//! - a hard ceiling of [`RetryPolicy::max_retries`] attempts

use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::CrawlerConfig;
use crate::fetcher::retry_formatter::{RetryContext, RetryErrorType};
use crate::fetcher::transport::{HttpTransport, ReqwestTransport, TransportErrorKind};
use crate::fetcher::{FetcherError, FetcherResult};
use crate::metrics::{record_retry_backoff, HttpRequestMetrics};
use crate::pipeline::backoff::RetryPolicy;
use crate::pipeline::rate_limit::RateLimiter;

/// HTTP client applying rate limiting and retry policy to every fetch
pub struct RetryingFetcher {
    transport: Arc<dyn HttpTransport>,
    rate_limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    /// Create a fetcher over an explicit transport
    ///
    /// # Arguments
    /// * `transport` - One-shot GET implementation
    /// * `rate_limiter` - Limiter; share the `Arc` to serialize several fetchers
    /// * `policy` - Retry ceiling and base delay
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        rate_limiter: Arc<RateLimiter>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            rate_limiter,
            policy,
        }
    }

    /// Build a `reqwest`-backed fetcher from configuration
    pub fn from_config(config: &CrawlerConfig) -> FetcherResult<Self> {
        let transport = ReqwestTransport::new(config.http_timeout)?;
        Ok(Self::new(
            Arc::new(transport),
            Arc::new(RateLimiter::per_second(config.requests_per_second)),
            RetryPolicy::new(config.http_max_retries),
        ))
    }

    /// Retry policy in effect
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Maximum attempts per fetch
    pub fn max_retries(&self) -> u32 {
        self.policy.max_retries
    }

    /// Limiter shared by every fetch of this client
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Fetch `url` and deserialize the JSON body
    ///
    /// # Errors
    /// `Client` on 4xx, `ExhaustedRetries` after the retry ceiling,
    /// `Parse` when the body is not the expected JSON
    pub async fn fetch_json<T>(&self, url: &str) -> FetcherResult<T>
    where
        T: DeserializeOwned,
    {
        let body = self.request_with_retry(url).await?;
        serde_json::from_str(&body).map_err(|e| {
            FetcherError::Parse(format!("Failed to deserialize response from {url}: {e}"))
        })
    }

    /// Fetch `url` and return the raw body (e.g., an HTML document)
    pub async fn fetch_text(&self, url: &str) -> FetcherResult<String> {
        self.request_with_retry(url).await
    }

    /// Release the underlying transport
    pub async fn close(&self) {
        self.transport.close().await;
    }

    /// Rate limit once, then attempt up to `max_retries` times
    ///
    /// Retries on:
    /// - 5xx server errors
    /// - Network errors (timeout, connection refused, reset)
    ///
    /// Does not retry on:
    /// - 4xx client errors
    /// - A closed transport
    async fn request_with_retry(&self, url: &str) -> FetcherResult<String> {
        self.rate_limiter.wait().await;

        let max_attempts = self.policy.max_retries;
        let mut last_status = None;
        let mut last_error = format!("no attempts made (max_retries = {max_attempts})");

        for attempt in 0..max_attempts {
            debug!("Making request to {} (attempt {})", url, attempt + 1);
            let metrics = HttpRequestMetrics::start(url, attempt + 1);

            let error_type = match self.transport.get(url).await {
                Ok(response) if response.status >= 500 => {
                    metrics.record_complete(response.status);
                    last_status = Some(response.status);
                    last_error = format!("server error {}", response.status);
                    RetryErrorType::from_status(response.status)
                }
                Ok(response) if response.status >= 400 => {
                    metrics.record_complete(response.status);
                    let ctx = RetryContext::new(
                        attempt + 1,
                        max_attempts,
                        RetryErrorType::from_status(response.status),
                        Duration::ZERO,
                        url,
                    );
                    error!(
                        status = response.status,
                        "{}",
                        ctx.format_failure(&format!("client error {}, not retrying", response.status))
                    );
                    return Err(FetcherError::Client {
                        status: response.status,
                        url: url.to_string(),
                    });
                }
                Ok(response) => {
                    metrics.record_complete(response.status);
                    if attempt > 0 {
                        let ctx = RetryContext::new(
                            attempt + 1,
                            max_attempts,
                            RetryErrorType::NetworkGeneric,
                            Duration::ZERO,
                            url,
                        );
                        info!("{}", ctx.format_success());
                    }
                    debug!("Successfully fetched data from {}", url);
                    return Ok(response.body);
                }
                Err(err) if err.kind == TransportErrorKind::Closed => {
                    return Err(FetcherError::Closed);
                }
                Err(err) => {
                    metrics.record_network_error();
                    last_status = None;
                    last_error = err.to_string();
                    RetryErrorType::from_transport(&err)
                }
            };

            if self.policy.has_next_attempt(attempt) {
                let delay = self.policy.delay_for(attempt);
                let ctx = RetryContext::new(attempt + 1, max_attempts, error_type, delay, url);
                warn!("{}", ctx.format_retry());
                record_retry_backoff(delay, attempt + 1);
                tokio::time::sleep(delay).await;
            } else {
                let ctx =
                    RetryContext::new(attempt + 1, max_attempts, error_type, Duration::ZERO, url);
                error!("{}", ctx.format_failure(&last_error));
            }
        }

        Err(FetcherError::ExhaustedRetries {
            url: url.to_string(),
            attempts: max_attempts,
            last_status,
            last_error,
        })
    }
}
