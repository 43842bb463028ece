//! Storage backends for polled prices and crawled listings

use crate::{ListingRecord, PricePoint, Sample};
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

pub mod csv;
pub mod memory;
pub mod sqlite;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(String),

    /// Stored data could not be read back
    #[error("parse error: {0}")]
    Parse(String),

    /// SQLite query or connection error
    #[error("database error: {0}")]
    Database(String),

    /// Backend can no longer accept reads or writes
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence boundary for both pipelines
///
/// Calls are never retried by the pipelines; a failed write is reported to
/// the caller once.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Backend name for logs (e.g., "csv")
    fn name(&self) -> &str;

    /// Persist one price sample
    async fn store_price(&self, sample: &Sample) -> StorageResult<()>;

    /// Persist a crawl batch; an empty batch is a valid no-op write
    async fn store_listings(&self, records: &[ListingRecord]) -> StorageResult<()>;

    /// Up to `count` most recent prices for `symbol`, oldest first
    async fn recent_prices(&self, symbol: &str, count: usize) -> StorageResult<Vec<PricePoint>>;
}

/// Available storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    /// Append-only CSV files
    #[default]
    Csv,
    /// Single SQLite database file
    Sqlite,
    /// Process memory, lost on exit
    Memory,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Csv => write!(f, "csv"),
            StorageKind::Sqlite => write!(f, "sqlite"),
            StorageKind::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(StorageKind::Csv),
            "sqlite" => Ok(StorageKind::Sqlite),
            "memory" => Ok(StorageKind::Memory),
            other => Err(format!(
                "Invalid storage type '{other}'. Valid options: csv, sqlite, memory"
            )),
        }
    }
}

/// Build the backend for `kind`
///
/// CSV files are named `<data_dir>/<stem>_*.csv`, the SQLite database
/// `<data_dir>/<stem>.db`.
pub fn open_storage(kind: StorageKind, data_dir: &Path, stem: &str) -> Arc<dyn Storage> {
    match kind {
        StorageKind::Csv => Arc::new(csv::CsvStorage::new(data_dir.join(stem))),
        StorageKind::Sqlite => Arc::new(sqlite::SqliteStorage::new(data_dir.join(stem))),
        StorageKind::Memory => Arc::new(memory::MemoryStorage::new()),
    }
}
