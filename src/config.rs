//! Environment-driven configuration
//!
//! Values come from `CRYPTO_*` (and provider URL) environment variables,
//! after `.env` is loaded with `dotenvy`. Anything unset falls back to the
//! defaults in [`CrawlerConfig::default`]; the CLI applies its overrides on top
//! and calls [`CrawlerConfig::validate`] last.

use std::path::PathBuf;
use std::time::Duration;

use crate::fetcher::endpoints::{COINGECKO_BASE_URL, COINMARKETCAP_API_URL, COINMARKETCAP_BASE_URL};
use crate::pipeline::backoff::{DEFAULT_MAX_CONSECUTIVE_FAILURES, DEFAULT_MAX_RETRIES};
use crate::pipeline::rate_limit::RateLimiter;
use crate::storage::StorageKind;

/// Accepted log levels (case-insensitive)
pub const LOG_LEVELS: [&str; 6] = ["TRACE", "DEBUG", "INFO", "WARN", "WARNING", "ERROR"];

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// One or more values are unusable
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Crawler configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlerConfig {
    /// Per-request timeout
    pub http_timeout: Duration,
    /// Attempts per fetch
    pub http_max_retries: u32,
    /// Pause between successful poll cycles
    pub poll_interval: Duration,
    /// Consecutive poll failures that stop the poller
    pub max_consecutive_failures: u32,
    /// Pause between document pages
    pub html_scraping_delay: Duration,
    /// Pause between API pages
    pub json_api_delay: Duration,
    /// Moving average window size
    pub moving_average_window: usize,
    /// Request rate per client; `<= 0` disables limiting
    pub requests_per_second: f64,
    /// Storage backend
    pub storage_type: StorageKind,
    /// Directory for file-backed storage
    pub data_directory: PathBuf,
    /// CoinGecko API root
    pub coingecko_base_url: String,
    /// CoinMarketCap site root
    pub coinmarketcap_base_url: String,
    /// CoinMarketCap listing API
    pub coinmarketcap_api_url: String,
    /// Log level name
    pub log_level: String,
    /// Pages per crawl run
    pub cmc_pages_per_scrape: u32,
    /// Records per API page
    pub cmc_coins_per_page: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(30),
            http_max_retries: DEFAULT_MAX_RETRIES,
            poll_interval: Duration::from_secs(1),
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            html_scraping_delay: Duration::from_millis(500),
            json_api_delay: Duration::from_millis(200),
            moving_average_window: 10,
            requests_per_second: 2.0,
            storage_type: StorageKind::Csv,
            data_directory: PathBuf::from("data"),
            coingecko_base_url: COINGECKO_BASE_URL.to_string(),
            coinmarketcap_base_url: COINMARKETCAP_BASE_URL.to_string(),
            coinmarketcap_api_url: COINMARKETCAP_API_URL.to_string(),
            log_level: "INFO".to_string(),
            cmc_pages_per_scrape: 5,
            cmc_coins_per_page: 20,
        }
    }
}

impl CrawlerConfig {
    /// Load `.env`, then read the process environment
    pub fn from_env() -> ConfigResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source
    ///
    /// Unset variables keep their defaults; set but unparseable ones are
    /// reported together.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut errors = Vec::new();
        let mut config = Self::default();
        let mut reader = EnvReader {
            lookup: &lookup,
            errors: &mut errors,
        };

        reader.seconds("CRYPTO_HTTP_TIMEOUT", &mut config.http_timeout);
        reader.parse("CRYPTO_HTTP_MAX_RETRIES", &mut config.http_max_retries);
        reader.seconds("CRYPTO_POLL_INTERVAL", &mut config.poll_interval);
        reader.parse("CRYPTO_MAX_FAILURES", &mut config.max_consecutive_failures);
        reader.seconds("CRYPTO_HTML_DELAY", &mut config.html_scraping_delay);
        reader.seconds("CRYPTO_JSON_DELAY", &mut config.json_api_delay);
        reader.parse("CRYPTO_MA_WINDOW", &mut config.moving_average_window);
        reader.parse("CRYPTO_REQUESTS_PER_SECOND", &mut config.requests_per_second);
        reader.parse("CRYPTO_STORAGE_TYPE", &mut config.storage_type);
        reader.parse("CRYPTO_DATA_DIR", &mut config.data_directory);
        reader.parse("COINGECKO_BASE_URL", &mut config.coingecko_base_url);
        reader.parse("COINMARKETCAP_BASE_URL", &mut config.coinmarketcap_base_url);
        reader.parse("COINMARKETCAP_API_URL", &mut config.coinmarketcap_api_url);
        reader.parse("CRYPTO_LOG_LEVEL", &mut config.log_level);
        reader.parse("CRYPTO_CMC_PAGES", &mut config.cmc_pages_per_scrape);
        reader.parse("CRYPTO_CMC_PER_PAGE", &mut config.cmc_coins_per_page);

        if errors.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// Check every value, reporting all problems at once
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if self.http_timeout.is_zero() {
            errors.push("http_timeout must be positive".to_string());
        }
        if self.http_max_retries == 0 {
            errors.push("http_max_retries must be at least 1".to_string());
        }
        if self.poll_interval.is_zero() {
            errors.push("poll_interval must be positive".to_string());
        }
        if self.max_consecutive_failures == 0 {
            errors.push("max_consecutive_failures must be at least 1".to_string());
        }
        if self.moving_average_window == 0 {
            errors.push("moving_average_window must be at least 1".to_string());
        }
        if !self.requests_per_second.is_finite() {
            errors.push("requests_per_second must be a finite number".to_string());
        } else if RateLimiter::interval_for(self.requests_per_second).is_none() {
            errors.push(format!(
                "requests_per_second {} is too low to space requests",
                self.requests_per_second
            ));
        }
        if self.cmc_pages_per_scrape == 0 {
            errors.push("cmc_pages_per_scrape must be at least 1".to_string());
        }
        if self.cmc_coins_per_page == 0 {
            errors.push("cmc_coins_per_page must be at least 1".to_string());
        }
        if !LOG_LEVELS.contains(&self.log_level.to_uppercase().as_str()) {
            errors.push(format!(
                "log_level '{}' is not one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }
        for (name, url) in [
            ("coingecko_base_url", &self.coingecko_base_url),
            ("coinmarketcap_base_url", &self.coinmarketcap_base_url),
            ("coinmarketcap_api_url", &self.coinmarketcap_api_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(format!("{name} must be an http(s) URL, got '{url}'"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// Log level as a `tracing` directive (`WARNING` → `warn`)
    pub fn tracing_level(&self) -> &'static str {
        match self.log_level.to_uppercase().as_str() {
            "TRACE" => "trace",
            "DEBUG" => "debug",
            "WARN" | "WARNING" => "warn",
            "ERROR" => "error",
            _ => "info",
        }
    }
}

/// Reads typed values out of a variable source, collecting parse errors
struct EnvReader<'a, F> {
    lookup: &'a F,
    errors: &'a mut Vec<String>,
}

impl<F> EnvReader<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&mut self, key: &str, slot: &mut T)
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        if let Some(value) = self.raw(key) {
            match value.parse() {
                Ok(parsed) => *slot = parsed,
                Err(e) => self.errors.push(format!("{key}='{value}': {e}")),
            }
        }
    }

    /// Fractional seconds; negative values are rejected here because
    /// `Duration` cannot hold them
    fn seconds(&mut self, key: &str, slot: &mut Duration) {
        if let Some(value) = self.raw(key) {
            match value.parse::<f64>().map(Duration::try_from_secs_f64) {
                Ok(Ok(duration)) => *slot = duration,
                Ok(Err(_)) => self
                    .errors
                    .push(format!("{key}='{value}': expected a non-negative number of seconds")),
                Err(e) => self.errors.push(format!("{key}='{value}': {e}")),
            }
        }
    }
}
