//! In-process storage, used by tests and `--storage memory`

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

use super::{Storage, StorageError, StorageResult};
use crate::{ListingRecord, PricePoint, Sample};

/// Keeps samples and listing batches in memory
#[derive(Debug, Default)]
pub struct MemoryStorage {
    prices: Mutex<Vec<Sample>>,
    batches: Mutex<Vec<Vec<ListingRecord>>>,
}

impl MemoryStorage {
    /// Create empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored sample, in arrival order
    pub fn prices(&self) -> Vec<Sample> {
        self.prices.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Each `store_listings` call as its own batch
    pub fn listing_batches(&self) -> Vec<Vec<ListingRecord>> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// All listings across batches
    pub fn listings(&self) -> Vec<ListingRecord> {
        self.listing_batches().into_iter().flatten().collect()
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> StorageResult<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| StorageError::Unavailable(format!("{what} lock poisoned")))
}

#[async_trait]
impl Storage for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    async fn store_price(&self, sample: &Sample) -> StorageResult<()> {
        lock(&self.prices, "prices")?.push(sample.clone());
        Ok(())
    }

    async fn store_listings(&self, records: &[ListingRecord]) -> StorageResult<()> {
        lock(&self.batches, "listings")?.push(records.to_vec());
        Ok(())
    }

    async fn recent_prices(&self, symbol: &str, count: usize) -> StorageResult<Vec<PricePoint>> {
        let mut points: Vec<PricePoint> = lock(&self.prices, "prices")?
            .iter()
            .filter(|s| s.symbol == symbol)
            .map(|s| PricePoint {
                price: s.value,
                timestamp: s.timestamp,
            })
            .collect();
        let skip = points.len().saturating_sub(count);
        Ok(points.split_off(skip))
    }
}
