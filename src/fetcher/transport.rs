//! Raw HTTP GET seam
//!
//! [`HttpTransport`] issues exactly one request and reports the status and
//! body; retry and rate-limit policy live in
//! [`RetryingFetcher`](crate::fetcher::RetryingFetcher).

use async_trait::async_trait;
use reqwest::Client;
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

/// HTTP connect timeout (seconds) - time to establish TCP connection
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// User agent sent with every request
const USER_AGENT: &str = concat!("crypto-crawler/", env!("CARGO_PKG_VERSION"));

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl HttpResponse {
    /// Build a response from status and body
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// What went wrong below the HTTP status level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Request or connect timeout
    Timeout,
    /// Connection refused, DNS failure, reset
    Connect,
    /// Transport was closed before the request
    Closed,
    /// Anything else (body decode, redirect loop, ...)
    Other,
}

/// Failure to obtain any HTTP response
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    /// Failure classification
    pub kind: TransportErrorKind,
    /// Human-readable detail
    pub message: String,
}

impl TransportError {
    /// Build an error of the given kind
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a timeout
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    /// Shorthand for a connection failure
    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, err.to_string())
    }
}

/// One-shot HTTP GET
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a single GET request
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;

    /// Release pooled connections; later requests fail with `Closed`
    async fn close(&self) {}
}

/// [`HttpTransport`] backed by a pooled `reqwest` client
pub struct ReqwestTransport {
    client: RwLock<Option<Client>>,
}

impl ReqwestTransport {
    /// Build a client with the given overall request timeout
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS).min(timeout))
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                TransportError::new(
                    TransportErrorKind::Other,
                    format!("Failed to build HTTP client: {e}"),
                )
            })?;

        Ok(Self::from_client(client))
    }

    /// Wrap an existing client
    pub fn from_client(client: Client) -> Self {
        Self {
            client: RwLock::new(Some(client)),
        }
    }

    fn current_client(&self) -> Option<Client> {
        // Client clones share the same pool.
        self.client
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let client = self
            .current_client()
            .ok_or_else(|| TransportError::new(TransportErrorKind::Closed, "HTTP client closed"))?;

        let response = client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }

    async fn close(&self) {
        if let Ok(mut guard) = self.client.write() {
            if guard.take().is_some() {
                debug!("HTTP client closed");
            }
        }
    }
}
