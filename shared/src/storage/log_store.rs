//! Log storage trait and implementations.
//!
//! Provides the `LogStore` trait for the `logs` collection, keyed by
//! `(timestamp, name)`, with an in-memory and a `ClickHouse` implementation.

use crate::models::{LogEntry, LogType};
use crate::range::TimeRange;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors that can occur during log store operations.
#[derive(Debug, Error)]
pub enum LogStoreError {
    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on log store")]
    LockError,

    /// Generic storage error.
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Query parameters for retrieving logs.
///
/// Results are ordered by timestamp, newest first, then by host name.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    /// Filter logs starting from this unix second (inclusive).
    pub start_time: Option<i64>,

    /// Filter logs up to this unix second (exclusive).
    pub end_time: Option<i64>,

    /// Filter by host name (exact match).
    pub name: Option<String>,

    /// Maximum number of logs to return.
    pub limit: Option<usize>,
}

impl LogQuery {
    /// Creates a new empty query (returns all logs).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the query to a half-open time range.
    #[must_use]
    pub fn with_range(self, range: TimeRange) -> Self {
        self.with_start_time(range.start).with_end_time(range.end)
    }

    /// Sets the start time filter.
    #[must_use]
    pub fn with_start_time(mut self, start: i64) -> Self {
        self.start_time = Some(start);
        self
    }

    /// Sets the end time filter.
    #[must_use]
    pub fn with_end_time(mut self, end: i64) -> Self {
        self.end_time = Some(end);
        self
    }

    /// Sets the host name filter.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the maximum number of results.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, entry: &LogEntry) -> bool {
        if self.start_time.is_some_and(|start| entry.timestamp < start) {
            return false;
        }
        if self.end_time.is_some_and(|end| entry.timestamp >= end) {
            return false;
        }
        if let Some(ref name) = self.name {
            if &entry.name != name {
                return false;
            }
        }
        true
    }
}

/// Trait for log storage implementations.
///
/// Implementations must be thread-safe (Send + Sync) and enforce uniqueness
/// of `(timestamp, name)`.
pub trait LogStore: Send + Sync {
    /// Inserts an entry, replacing any stored entry with the same
    /// `(timestamp, name)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn upsert(&self, entry: LogEntry) -> Result<(), LogStoreError>;

    /// Queries logs based on the provided parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the query operation fails.
    fn query(&self, query: LogQuery) -> Result<Vec<LogEntry>, LogStoreError>;

    /// Returns the total number of logs in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the count operation fails.
    fn count(&self) -> Result<usize, LogStoreError>;

    /// Clears all logs from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear operation fails.
    fn clear(&self) -> Result<(), LogStoreError>;

    /// Returns the stored entry with the greatest timestamp for a host.
    ///
    /// # Errors
    ///
    /// Returns an error if the query operation fails.
    fn latest_for_host(&self, name: &str) -> Result<Option<LogEntry>, LogStoreError> {
        let logs = self.query(LogQuery::new().with_name(name).with_limit(1))?;
        Ok(logs.into_iter().next())
    }
}

/// In-memory log store implementation.
///
/// Entries live in a `BTreeMap` keyed by `(timestamp, name)` behind a
/// `RwLock`, which gives upsert semantics for free.
///
/// **Note:** Data is not persisted across restarts.
///
/// # Example
///
/// ```
/// use shared::storage::{InMemoryLogStore, LogStore, LogQuery};
/// use shared::models::{LogEntry, LogType};
///
/// let store = InMemoryLogStore::new();
/// store.upsert(LogEntry::new(100, "host-a", LogType::Storage, 10, 2)).unwrap();
/// store.upsert(LogEntry::new(100, "host-a", LogType::Storage, 12, 2)).unwrap();
///
/// let logs = store.query(LogQuery::new()).unwrap();
/// assert_eq!(logs.len(), 1);
/// assert_eq!(logs[0].total_size, 12);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    logs: Arc<RwLock<BTreeMap<(i64, String), LogEntry>>>,
}

impl InMemoryLogStore {
    /// Creates a new empty in-memory log store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            logs: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Creates a new in-memory log store wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl LogStore for InMemoryLogStore {
    fn upsert(&self, entry: LogEntry) -> Result<(), LogStoreError> {
        let mut logs = self.logs.write().map_err(|_| LogStoreError::LockError)?;
        logs.insert((entry.timestamp, entry.name.clone()), entry);
        Ok(())
    }

    fn query(&self, query: LogQuery) -> Result<Vec<LogEntry>, LogStoreError> {
        let logs = self.logs.read().map_err(|_| LogStoreError::LockError)?;

        let mut filtered: Vec<LogEntry> = logs
            .values()
            .filter(|entry| query.matches(entry))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.name.cmp(&b.name)));
        filtered.truncate(query.limit.unwrap_or(usize::MAX));

        Ok(filtered)
    }

    fn count(&self) -> Result<usize, LogStoreError> {
        let logs = self.logs.read().map_err(|_| LogStoreError::LockError)?;
        Ok(logs.len())
    }

    fn clear(&self) -> Result<(), LogStoreError> {
        let mut logs = self.logs.write().map_err(|_| LogStoreError::LockError)?;
        logs.clear();
        Ok(())
    }
}

/// `ClickHouse`-backed log store implementation.
///
/// The `logs` table is a `ReplacingMergeTree` ordered by `(ts, name)`, so a
/// second insert with the same key replaces the first. Reads use `FINAL` to
/// see the deduplicated rows.
#[derive(Clone)]
pub struct ClickHouseLogStore {
    client: Arc<clickhouse::Client>,
}

#[derive(clickhouse::Row, serde::Serialize, serde::Deserialize)]
struct LogRow {
    ts: i64,
    name: String,
    log_type: String,
    total_size: i64,
    available_size: i64,
    reserved_size: i64,
}

impl From<LogEntry> for LogRow {
    fn from(entry: LogEntry) -> Self {
        Self {
            ts: entry.timestamp,
            name: entry.name,
            log_type: entry.log_type.to_string(),
            total_size: entry.total_size,
            available_size: entry.available_size,
            reserved_size: entry.reserved_size,
        }
    }
}

impl TryFrom<LogRow> for LogEntry {
    type Error = LogStoreError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        let log_type = LogType::parse(&row.log_type).ok_or_else(|| {
            LogStoreError::StorageError(format!(
                "Unknown log type '{}' stored for {} at {}",
                row.log_type, row.name, row.ts
            ))
        })?;

        Ok(Self {
            timestamp: row.ts,
            name: row.name,
            log_type,
            total_size: row.total_size,
            available_size: row.available_size,
            reserved_size: row.reserved_size,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT ts, name, log_type, total_size, available_size, reserved_size FROM logs FINAL";

/// Single-row lookup of a host's newest entry.
const LATEST_FOR_HOST_SQL: &str =
    "SELECT ts, name, log_type, total_size, available_size, reserved_size FROM logs FINAL \
     WHERE name = ? ORDER BY ts DESC LIMIT 1";

/// Builds the row query for `query`. Placeholders are bound in the order
/// start, end, name.
fn select_sql(query: &LogQuery) -> String {
    use std::fmt::Write as _;

    let mut sql = format!("{SELECT_COLUMNS} WHERE 1=1");
    if query.start_time.is_some() {
        sql.push_str(" AND ts >= ?");
    }
    if query.end_time.is_some() {
        sql.push_str(" AND ts < ?");
    }
    if query.name.is_some() {
        sql.push_str(" AND name = ?");
    }
    sql.push_str(" ORDER BY ts DESC, name ASC");
    if let Some(limit) = query.limit {
        write!(&mut sql, " LIMIT {limit}").unwrap();
    }
    sql
}

impl ClickHouseLogStore {
    /// Creates a new `ClickHouse` log store with the given client.
    #[must_use]
    pub fn new(client: Arc<clickhouse::Client>) -> Self {
        Self { client }
    }

    /// Creates a new `ClickHouse` log store wrapped in an Arc.
    #[must_use]
    pub fn new_shared(client: Arc<clickhouse::Client>) -> Arc<Self> {
        Arc::new(Self::new(client))
    }

    /// Helper to execute async operations synchronously.
    fn block_on<F, T>(future: F) -> Result<T, LogStoreError>
    where
        F: std::future::Future<Output = Result<T, clickhouse::error::Error>>,
    {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current()
                .block_on(future)
                .map_err(|e| LogStoreError::StorageError(e.to_string()))
        })
    }
}

impl LogStore for ClickHouseLogStore {
    fn upsert(&self, entry: LogEntry) -> Result<(), LogStoreError> {
        let client = Arc::clone(&self.client);
        Self::block_on(async move {
            let mut inserter = client.insert::<LogRow>("logs").await?;
            inserter.write(&LogRow::from(entry)).await?;
            inserter.end().await?;
            Ok(())
        })
    }

    fn query(&self, query: LogQuery) -> Result<Vec<LogEntry>, LogStoreError> {
        let mut rows_query = self.client.query(&select_sql(&query));
        if let Some(start) = query.start_time {
            rows_query = rows_query.bind(start);
        }
        if let Some(end) = query.end_time {
            rows_query = rows_query.bind(end);
        }
        if let Some(ref name) = query.name {
            rows_query = rows_query.bind(name.as_str());
        }

        let rows = Self::block_on(async move { rows_query.fetch_all::<LogRow>().await })?;
        rows.into_iter().map(LogEntry::try_from).collect()
    }

    fn latest_for_host(&self, name: &str) -> Result<Option<LogEntry>, LogStoreError> {
        let lookup = self.client.query(LATEST_FOR_HOST_SQL).bind(name);
        let row = Self::block_on(async move { lookup.fetch_optional::<LogRow>().await })?;
        row.map(LogEntry::try_from).transpose()
    }

    fn count(&self) -> Result<usize, LogStoreError> {
        let client = Arc::clone(&self.client);
        let count: u64 = Self::block_on(async move {
            client
                .query("SELECT count() FROM logs FINAL")
                .fetch_one::<u64>()
                .await
        })?;

        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }

    fn clear(&self) -> Result<(), LogStoreError> {
        let client = Arc::clone(&self.client);
        Self::block_on(async move { client.query("TRUNCATE TABLE logs").execute().await })
    }
}
