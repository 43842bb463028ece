//! Append-only CSV storage
//!
//! Two files next to each other, derived from a base path:
//! - `<base>_prices.csv` with `symbol,price,timestamp,source`
//! - `<base>_listings.csv` with `rank,name,symbol,price,change_24h,market_cap,timestamp`
//!
//! Headers are written when a file is created; later writes append.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{Storage, StorageError, StorageResult};
use crate::{ListingRecord, PricePoint, Sample};

/// CSV row for a price sample
#[derive(Debug, Serialize, Deserialize)]
struct PriceRow {
    symbol: String,
    price: f64,
    timestamp: String,
    source: String,
}

impl From<&Sample> for PriceRow {
    fn from(sample: &Sample) -> Self {
        Self {
            symbol: sample.symbol.clone(),
            price: sample.value,
            timestamp: sample.timestamp_rfc3339(),
            source: sample.source.clone(),
        }
    }
}

/// CSV row for a listing record
#[derive(Debug, Serialize)]
struct ListingRow<'a> {
    rank: u32,
    name: &'a str,
    symbol: &'a str,
    price: f64,
    change_24h: f64,
    market_cap: f64,
    timestamp: &'a str,
}

/// CSV file storage
pub struct CsvStorage {
    prices_path: PathBuf,
    listings_path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvStorage {
    /// Create storage rooted at `base` (e.g., `data/crypto` → `data/crypto_prices.csv`)
    ///
    /// Nothing touches the filesystem until the first write.
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        let base = base.as_ref().to_string_lossy().into_owned();
        Self {
            prices_path: PathBuf::from(format!("{base}_prices.csv")),
            listings_path: PathBuf::from(format!("{base}_listings.csv")),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the price file
    pub fn prices_path(&self) -> &Path {
        &self.prices_path
    }

    /// Path of the listings file
    pub fn listings_path(&self) -> &Path {
        &self.listings_path
    }

    /// Append serializable rows to `path`, writing the header on creation
    fn append_rows<T: Serialize>(path: &Path, rows: &[T]) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StorageError::Io(format!("Failed to create directory: {}", e))
                })?;
            }
        }

        let is_new = !path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StorageError::Io(format!("Failed to open {}: {}", path.display(), e)))?;

        let mut writer = WriterBuilder::new().has_headers(is_new).from_writer(file);
        for row in rows {
            writer
                .serialize(row)
                .map_err(|e| StorageError::Csv(format!("Failed to write row: {}", e)))?;
        }
        writer
            .flush()
            .map_err(|e| StorageError::Io(format!("Failed to flush: {}", e)))?;

        if is_new {
            info!("Created CSV file: {}", path.display());
        }
        Ok(())
    }

    /// Write an empty file with just the header row
    fn ensure_header(path: &Path, header: &[&str]) -> StorageResult<()> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StorageError::Io(format!("Failed to create directory: {}", e))
                })?;
            }
        }
        let mut writer = WriterBuilder::new()
            .from_path(path)
            .map_err(|e| StorageError::Csv(format!("Failed to create {}: {}", path.display(), e)))?;
        writer
            .write_record(header)
            .map_err(|e| StorageError::Csv(format!("Failed to write header: {}", e)))?;
        writer
            .flush()
            .map_err(|e| StorageError::Io(format!("Failed to flush: {}", e)))
    }
}

const LISTINGS_HEADER: [&str; 7] = [
    "rank",
    "name",
    "symbol",
    "price",
    "change_24h",
    "market_cap",
    "timestamp",
];

#[async_trait]
impl Storage for CsvStorage {
    fn name(&self) -> &str {
        "csv"
    }

    async fn store_price(&self, sample: &Sample) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        Self::append_rows(&self.prices_path, &[PriceRow::from(sample)])?;
        debug!(symbol = %sample.symbol, price = sample.value, "Stored price");
        Ok(())
    }

    async fn store_listings(&self, records: &[ListingRecord]) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;

        if records.is_empty() {
            Self::ensure_header(&self.listings_path, &LISTINGS_HEADER)?;
            debug!("Stored empty listing batch");
            return Ok(());
        }

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let rows: Vec<ListingRow<'_>> = records
            .iter()
            .map(|r| ListingRow {
                rank: r.rank,
                name: &r.name,
                symbol: &r.symbol,
                price: r.price,
                change_24h: r.change_24h,
                market_cap: r.market_cap,
                timestamp: &timestamp,
            })
            .collect();

        Self::append_rows(&self.listings_path, &rows)?;
        info!(count = records.len(), path = %self.listings_path.display(), "Stored listings");
        Ok(())
    }

    async fn recent_prices(&self, symbol: &str, count: usize) -> StorageResult<Vec<PricePoint>> {
        let _guard = self.write_lock.lock().await;

        if !self.prices_path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = ReaderBuilder::new()
            .from_path(&self.prices_path)
            .map_err(|e| StorageError::Csv(format!("Failed to open prices: {}", e)))?;

        let mut points = Vec::new();
        for row in reader.deserialize::<PriceRow>() {
            let row = row.map_err(|e| StorageError::Csv(format!("Failed to read row: {}", e)))?;
            if row.symbol != symbol {
                continue;
            }
            let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
                .map_err(|e| {
                    StorageError::Parse(format!("Invalid timestamp '{}': {}", row.timestamp, e))
                })?
                .with_timezone(&Utc);
            points.push(PricePoint {
                price: row.price,
                timestamp,
            });
        }

        let skip = points.len().saturating_sub(count);
        Ok(points.split_off(skip))
    }
}
