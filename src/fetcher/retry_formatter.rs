//! Retry message formatting for the retrying fetcher.
//!
//! Classifies each failed attempt and renders the consistent, user-facing log
//! lines emitted while retrying and after the final attempt.

use std::time::Duration;

use crate::fetcher::transport::{TransportError, TransportErrorKind};

/// Classification of a failed attempt for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Network timeout
    NetworkTimeout,
    /// Connection refused, DNS failure, or other offline scenarios
    NetworkOffline,
    /// HTTP 5xx server error
    ServerError(u16),
    /// HTTP 429 rate limit exceeded
    RateLimit,
    /// Other client errors (4xx)
    ClientError(u16),
    /// Generic fallback when no better classification fits
    NetworkGeneric,
}

impl RetryErrorType {
    /// Classify an HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimit,
            500..=599 => Self::ServerError(status),
            400..=499 => Self::ClientError(status),
            _ => Self::NetworkGeneric,
        }
    }

    /// Classify a transport failure
    pub fn from_transport(err: &TransportError) -> Self {
        match err.kind {
            TransportErrorKind::Timeout => Self::NetworkTimeout,
            TransportErrorKind::Connect => Self::NetworkOffline,
            TransportErrorKind::Closed | TransportErrorKind::Other => Self::NetworkGeneric,
        }
    }

    /// User-friendly description string used inside retry log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::RateLimit => "rate limit exceeded",
            Self::ClientError(code) => match code {
                401 | 403 => "access denied",
                404 => "resource not found",
                _ => "client error",
            },
            Self::NetworkGeneric => "network error",
        }
    }

    /// Suggested remediation shown once all attempts failed.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Check your network connection or raise CRYPTO_HTTP_TIMEOUT",
            Self::NetworkOffline => "Verify internet connectivity and DNS resolution",
            Self::ServerError(_) => "The provider may be experiencing issues, try again later",
            Self::RateLimit => "Lower CRYPTO_REQUESTS_PER_SECOND or wait before retrying",
            Self::ClientError(_) => "Review the request URL and provider base URLs",
            Self::NetworkGeneric => "Check network connectivity and try again",
        }
    }
}

/// Context for formatting retry messages.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Current attempt number (1-based)
    pub attempt: u32,
    /// Maximum number of attempts configured
    pub max_attempts: u32,
    /// Type of error that triggered retry
    pub error_type: RetryErrorType,
    /// Backoff duration until next attempt
    pub backoff_duration: Duration,
    /// URL that failed
    pub url: String,
}

impl RetryContext {
    /// Convenience constructor used by the retry loop.
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        error_type: RetryErrorType,
        backoff_duration: Duration,
        url: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type,
            backoff_duration,
            url: url.into(),
        }
    }

    /// Format standardized retry message with attempt counters.
    pub fn format_retry(&self) -> String {
        format!(
            "Retrying (attempt {}/{}) after {} - waiting {:.1} seconds... ({})",
            self.attempt,
            self.max_attempts,
            self.error_type.description(),
            self.backoff_duration.as_secs_f64(),
            self.url
        )
    }

    /// Format retry success message when a previous attempt failed.
    pub fn format_success(&self) -> String {
        format!(
            "Retry attempt {}/{} succeeded ({})",
            self.attempt, self.max_attempts, self.url
        )
    }

    /// Format final failure summary with an actionable suggestion.
    pub fn format_failure(&self, last_error: &str) -> String {
        [
            format!(
                "[FAILED] Request failed after {} {}",
                self.attempt,
                if self.attempt == 1 { "attempt" } else { "attempts" }
            ),
            format!("  Last error: {last_error}"),
            format!("  URL: {}", self.url),
            format!("  Suggestion: {}", self.error_type.suggestion()),
        ]
        .join("\n")
    }
}
