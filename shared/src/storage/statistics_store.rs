//! Daily statistics storage trait and implementations.
//!
//! The `statistics` collection holds one `DailyStat` per day start.

use crate::models::DailyStat;
use crate::range::TimeRange;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors that can occur during statistics store operations.
#[derive(Debug, Error)]
pub enum StatisticsStoreError {
    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on statistics store")]
    LockError,

    /// Generic storage error.
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Trait for statistics storage implementations.
pub trait StatisticsStore: Send + Sync {
    /// Stores a statistic, replacing any statistic for the same day.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn upsert(&self, stat: DailyStat) -> Result<(), StatisticsStoreError>;

    /// Returns the statistic for the day starting at `day_start`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query operation fails.
    fn get(&self, day_start: i64) -> Result<Option<DailyStat>, StatisticsStoreError>;

    /// Returns the statistics whose day start lies in `range`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query operation fails.
    fn query(&self, range: TimeRange) -> Result<Vec<DailyStat>, StatisticsStoreError>;

    /// Returns the number of stored statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the count operation fails.
    fn count(&self) -> Result<usize, StatisticsStoreError>;

    /// Clears all statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear operation fails.
    fn clear(&self) -> Result<(), StatisticsStoreError>;
}

/// In-memory statistics store implementation.
#[derive(Debug, Default)]
pub struct InMemoryStatisticsStore {
    stats: Arc<RwLock<BTreeMap<i64, DailyStat>>>,
}

impl InMemoryStatisticsStore {
    /// Creates a new empty in-memory statistics store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory statistics store wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl StatisticsStore for InMemoryStatisticsStore {
    fn upsert(&self, stat: DailyStat) -> Result<(), StatisticsStoreError> {
        let mut stats = self
            .stats
            .write()
            .map_err(|_| StatisticsStoreError::LockError)?;
        stats.insert(stat.day_start, stat);
        Ok(())
    }

    fn get(&self, day_start: i64) -> Result<Option<DailyStat>, StatisticsStoreError> {
        let stats = self
            .stats
            .read()
            .map_err(|_| StatisticsStoreError::LockError)?;
        Ok(stats.get(&day_start).copied())
    }

    fn query(&self, range: TimeRange) -> Result<Vec<DailyStat>, StatisticsStoreError> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let stats = self
            .stats
            .read()
            .map_err(|_| StatisticsStoreError::LockError)?;
        Ok(stats.range(range.start..range.end).map(|(_, s)| *s).collect())
    }

    fn count(&self) -> Result<usize, StatisticsStoreError> {
        let stats = self
            .stats
            .read()
            .map_err(|_| StatisticsStoreError::LockError)?;
        Ok(stats.len())
    }

    fn clear(&self) -> Result<(), StatisticsStoreError> {
        let mut stats = self
            .stats
            .write()
            .map_err(|_| StatisticsStoreError::LockError)?;
        stats.clear();
        Ok(())
    }
}

/// `ClickHouse`-backed statistics store implementation.
///
/// The `statistics` table is a `ReplacingMergeTree` ordered by `ts`.
#[derive(Clone)]
pub struct ClickHouseStatisticsStore {
    client: Arc<clickhouse::Client>,
}

#[derive(clickhouse::Row, serde::Serialize, serde::Deserialize)]
struct StatRow {
    ts: i64,
    total_size: i64,
    reserved_size: i64,
    available_size: i64,
}

impl From<DailyStat> for StatRow {
    fn from(stat: DailyStat) -> Self {
        Self {
            ts: stat.day_start,
            total_size: stat.total_size,
            reserved_size: stat.reserved_size,
            available_size: stat.available_size,
        }
    }
}

impl From<StatRow> for DailyStat {
    fn from(row: StatRow) -> Self {
        Self {
            day_start: row.ts,
            total_size: row.total_size,
            reserved_size: row.reserved_size,
            available_size: row.available_size,
        }
    }
}

impl ClickHouseStatisticsStore {
    /// Creates a new `ClickHouse` statistics store with the given client.
    #[must_use]
    pub fn new(client: Arc<clickhouse::Client>) -> Self {
        Self { client }
    }

    /// Creates a new `ClickHouse` statistics store wrapped in an Arc.
    #[must_use]
    pub fn new_shared(client: Arc<clickhouse::Client>) -> Arc<Self> {
        Arc::new(Self::new(client))
    }

    fn block_on<F, T>(future: F) -> Result<T, StatisticsStoreError>
    where
        F: std::future::Future<Output = Result<T, clickhouse::error::Error>>,
    {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current()
                .block_on(future)
                .map_err(|e| StatisticsStoreError::StorageError(e.to_string()))
        })
    }
}

impl StatisticsStore for ClickHouseStatisticsStore {
    fn upsert(&self, stat: DailyStat) -> Result<(), StatisticsStoreError> {
        let client = Arc::clone(&self.client);
        Self::block_on(async move {
            let mut inserter = client.insert::<StatRow>("statistics").await?;
            inserter.write(&StatRow::from(stat)).await?;
            inserter.end().await?;
            Ok(())
        })
    }

    fn get(&self, day_start: i64) -> Result<Option<DailyStat>, StatisticsStoreError> {
        let query = self
            .client
            .query(
                "SELECT ts, total_size, reserved_size, available_size \
                 FROM statistics FINAL WHERE ts = ? LIMIT 1",
            )
            .bind(day_start);
        let row = Self::block_on(async move { query.fetch_optional::<StatRow>().await })?;
        Ok(row.map(DailyStat::from))
    }

    fn query(&self, range: TimeRange) -> Result<Vec<DailyStat>, StatisticsStoreError> {
        let query = self
            .client
            .query(
                "SELECT ts, total_size, reserved_size, available_size \
                 FROM statistics FINAL WHERE ts >= ? AND ts < ? ORDER BY ts",
            )
            .bind(range.start)
            .bind(range.end);
        let rows = Self::block_on(async move { query.fetch_all::<StatRow>().await })?;
        Ok(rows.into_iter().map(DailyStat::from).collect())
    }

    fn count(&self) -> Result<usize, StatisticsStoreError> {
        let client = Arc::clone(&self.client);
        let count: u64 = Self::block_on(async move {
            client
                .query("SELECT count() FROM statistics FINAL")
                .fetch_one::<u64>()
                .await
        })?;
        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }

    fn clear(&self) -> Result<(), StatisticsStoreError> {
        let client = Arc::clone(&self.client);
        Self::block_on(async move { client.query("TRUNCATE TABLE statistics").execute().await })
    }
}
