//! SQLite storage
//!
//! One database file `<base>.db` with a `prices` and a `listings` table.
//! The connection pool and schema are created on first use.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{Storage, StorageError, StorageResult};
use crate::{ListingRecord, PricePoint, Sample};

const CREATE_PRICES: &str = r#"
    CREATE TABLE IF NOT EXISTS prices (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        symbol TEXT NOT NULL,
        price REAL NOT NULL,
        timestamp TEXT NOT NULL,
        source TEXT NOT NULL DEFAULT 'coingecko'
    )
"#;

const CREATE_LISTINGS: &str = r#"
    CREATE TABLE IF NOT EXISTS listings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        rank INTEGER NOT NULL,
        name TEXT NOT NULL,
        symbol TEXT NOT NULL,
        price REAL NOT NULL,
        change_24h REAL NOT NULL,
        market_cap REAL NOT NULL,
        timestamp TEXT NOT NULL
    )
"#;

fn db_error(context: &str) -> impl Fn(sqlx::Error) -> StorageError + '_ {
    move |e| StorageError::Database(format!("{context}: {e}"))
}

/// SQLite database storage
pub struct SqliteStorage {
    db_path: PathBuf,
    pool: OnceCell<SqlitePool>,
}

impl SqliteStorage {
    /// Create storage rooted at `base` (e.g., `data/crypto` → `data/crypto.db`)
    ///
    /// Nothing touches the filesystem until the first call.
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        let base = base.as_ref().to_string_lossy().into_owned();
        Self {
            db_path: PathBuf::from(format!("{base}.db")),
            pool: OnceCell::new(),
        }
    }

    /// Path of the database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn pool(&self) -> StorageResult<&SqlitePool> {
        self.pool.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> StorageResult<SqlitePool> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    StorageError::Io(format!("Failed to create directory: {}", e))
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(db_error("Failed to open database"))?;

        for statement in [CREATE_PRICES, CREATE_LISTINGS] {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(db_error("Failed to create schema"))?;
        }

        info!(path = %self.db_path.display(), "Opened SQLite database");
        Ok(pool)
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn store_price(&self, sample: &Sample) -> StorageResult<()> {
        let pool = self.pool().await?;
        sqlx::query("INSERT INTO prices (symbol, price, timestamp, source) VALUES (?, ?, ?, ?)")
            .bind(&sample.symbol)
            .bind(sample.value)
            .bind(sample.timestamp_rfc3339())
            .bind(&sample.source)
            .execute(pool)
            .await
            .map_err(db_error("Failed to insert price"))?;

        debug!(symbol = %sample.symbol, price = sample.value, "Stored price");
        Ok(())
    }

    async fn store_listings(&self, records: &[ListingRecord]) -> StorageResult<()> {
        let pool = self.pool().await?;
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let mut tx = pool.begin().await.map_err(db_error("Failed to begin"))?;
        for record in records {
            sqlx::query(
                "INSERT INTO listings (rank, name, symbol, price, change_24h, market_cap, timestamp) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(i64::from(record.rank))
            .bind(&record.name)
            .bind(&record.symbol)
            .bind(record.price)
            .bind(record.change_24h)
            .bind(record.market_cap)
            .bind(&timestamp)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to insert listing"))?;
        }
        tx.commit().await.map_err(db_error("Failed to commit"))?;

        info!(count = records.len(), path = %self.db_path.display(), "Stored listings");
        Ok(())
    }

    async fn recent_prices(&self, symbol: &str, count: usize) -> StorageResult<Vec<PricePoint>> {
        let pool = self.pool().await?;
        let limit = i64::try_from(count).unwrap_or(i64::MAX);

        let rows: Vec<(f64, String)> = sqlx::query_as(
            "SELECT price, timestamp FROM prices WHERE symbol = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(symbol)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(db_error("Failed to read prices"))?;

        // Newest first from the query; callers expect oldest first.
        rows.into_iter()
            .rev()
            .map(|(price, timestamp)| -> StorageResult<PricePoint> {
                let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                    .map_err(|e| {
                        StorageError::Parse(format!("Invalid timestamp '{}': {}", timestamp, e))
                    })?
                    .with_timezone(&Utc);
                Ok(PricePoint { price, timestamp })
            })
            .collect()
    }
}
