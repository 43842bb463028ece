use std::time::Duration;

use crypto_crawler::fetcher::retry_formatter::{RetryContext, RetryErrorType};

const URL: &str = "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin";

fn sample_context(error_type: RetryErrorType) -> RetryContext {
    RetryContext::new(2, 5, error_type, Duration::from_secs(4), URL)
}

#[test]
fn format_retry_captures_attempt_and_wait() {
    let message = sample_context(RetryErrorType::ServerError(503)).format_retry();
    assert!(message.contains("attempt 2/5"));
    assert!(message.contains("service unavailable"));
    assert!(message.contains("4.0 seconds"));
    assert!(message.contains(URL));
}

#[test]
fn format_success_names_attempt() {
    let message = sample_context(RetryErrorType::NetworkTimeout).format_success();
    assert!(message.contains("Retry attempt 2/5 succeeded"));
}

#[test]
fn format_failure_lists_suggestion() {
    let output = sample_context(RetryErrorType::NetworkTimeout).format_failure("operation timed out");
    assert!(output.contains("Request failed after 5 attempts"));
    assert!(output.contains("operation timed out"));
    assert!(output.contains("CRYPTO_HTTP_TIMEOUT"));
}

#[test]
fn status_codes_are_classified() {
    assert_eq!(RetryErrorType::from_status(429), RetryErrorType::RateLimit);
    assert_eq!(RetryErrorType::from_status(502), RetryErrorType::ServerError(502));
    assert_eq!(RetryErrorType::from_status(404), RetryErrorType::ClientError(404));
    assert_eq!(RetryErrorType::from_status(404).description(), "resource not found");
}
