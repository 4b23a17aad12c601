//! Host state storage trait and implementations.
//!
//! The `hosts` collection keeps one `HostState` per host name.

use crate::models::{HostState, LogEntry, LogType};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors that can occur during host store operations.
#[derive(Debug, Error)]
pub enum HostStoreError {
    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on host store")]
    LockError,

    /// Generic storage error.
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Trait for host state storage implementations.
pub trait HostStore: Send + Sync {
    /// Stores a host state, fully replacing any state with the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn upsert(&self, state: HostState) -> Result<(), HostStoreError>;

    /// Returns the state of one host.
    ///
    /// # Errors
    ///
    /// Returns an error if the query operation fails.
    fn get(&self, name: &str) -> Result<Option<HostState>, HostStoreError>;

    /// Returns all host states ordered by host name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query operation fails.
    fn list(&self) -> Result<Vec<HostState>, HostStoreError>;

    /// Returns the number of known hosts.
    ///
    /// # Errors
    ///
    /// Returns an error if the count operation fails.
    fn count(&self) -> Result<usize, HostStoreError>;

    /// Clears all host states.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear operation fails.
    fn clear(&self) -> Result<(), HostStoreError>;
}

/// In-memory host store implementation.
#[derive(Debug, Default)]
pub struct InMemoryHostStore {
    hosts: Arc<RwLock<BTreeMap<String, HostState>>>,
}

impl InMemoryHostStore {
    /// Creates a new empty in-memory host store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory host store wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl HostStore for InMemoryHostStore {
    fn upsert(&self, state: HostState) -> Result<(), HostStoreError> {
        let mut hosts = self.hosts.write().map_err(|_| HostStoreError::LockError)?;
        hosts.insert(state.name().to_string(), state);
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Option<HostState>, HostStoreError> {
        let hosts = self.hosts.read().map_err(|_| HostStoreError::LockError)?;
        Ok(hosts.get(name).cloned())
    }

    fn list(&self) -> Result<Vec<HostState>, HostStoreError> {
        let hosts = self.hosts.read().map_err(|_| HostStoreError::LockError)?;
        Ok(hosts.values().cloned().collect())
    }

    fn count(&self) -> Result<usize, HostStoreError> {
        let hosts = self.hosts.read().map_err(|_| HostStoreError::LockError)?;
        Ok(hosts.len())
    }

    fn clear(&self) -> Result<(), HostStoreError> {
        let mut hosts = self.hosts.write().map_err(|_| HostStoreError::LockError)?;
        hosts.clear();
        Ok(())
    }
}

/// `ClickHouse`-backed host store implementation.
///
/// The `hosts` table is a `ReplacingMergeTree` ordered by `name`; the last
/// inserted row for a name wins once read with `FINAL`.
#[derive(Clone)]
pub struct ClickHouseHostStore {
    client: Arc<clickhouse::Client>,
}

#[derive(clickhouse::Row, serde::Serialize, serde::Deserialize)]
struct HostRow {
    name: String,
    ts: i64,
    log_type: String,
    total_size: i64,
    available_size: i64,
    reserved_size: i64,
}

impl From<HostState> for HostRow {
    fn from(state: HostState) -> Self {
        let entry = state.entry;
        Self {
            name: entry.name,
            ts: entry.timestamp,
            log_type: entry.log_type.to_string(),
            total_size: entry.total_size,
            available_size: entry.available_size,
            reserved_size: entry.reserved_size,
        }
    }
}

impl TryFrom<HostRow> for HostState {
    type Error = HostStoreError;

    fn try_from(row: HostRow) -> Result<Self, Self::Error> {
        let Some(log_type) = LogType::parse(&row.log_type) else {
            return Err(HostStoreError::StorageError(format!(
                "Unknown log type '{}' stored for host {}",
                row.log_type, row.name
            )));
        };

        Ok(HostState::from(LogEntry {
            timestamp: row.ts,
            name: row.name,
            log_type,
            total_size: row.total_size,
            available_size: row.available_size,
            reserved_size: row.reserved_size,
        }))
    }
}

const HOST_COLUMNS: &str = "name, ts, log_type, total_size, available_size, reserved_size";

impl ClickHouseHostStore {
    /// Creates a new `ClickHouse` host store with the given client.
    #[must_use]
    pub fn new(client: Arc<clickhouse::Client>) -> Self {
        Self { client }
    }

    /// Creates a new `ClickHouse` host store wrapped in an Arc.
    #[must_use]
    pub fn new_shared(client: Arc<clickhouse::Client>) -> Arc<Self> {
        Arc::new(Self::new(client))
    }

    fn block_on<F, T>(future: F) -> Result<T, HostStoreError>
    where
        F: std::future::Future<Output = Result<T, clickhouse::error::Error>>,
    {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current()
                .block_on(future)
                .map_err(|e| HostStoreError::StorageError(e.to_string()))
        })
    }
}

impl HostStore for ClickHouseHostStore {
    fn upsert(&self, state: HostState) -> Result<(), HostStoreError> {
        let client = Arc::clone(&self.client);
        Self::block_on(async move {
            let mut inserter = client.insert::<HostRow>("hosts").await?;
            inserter.write(&HostRow::from(state)).await?;
            inserter.end().await?;
            Ok(())
        })
    }

    fn get(&self, name: &str) -> Result<Option<HostState>, HostStoreError> {
        let query = self
            .client
            .query(&format!(
                "SELECT {HOST_COLUMNS} FROM hosts FINAL WHERE name = ? LIMIT 1"
            ))
            .bind(name);
        let row = Self::block_on(async move { query.fetch_optional::<HostRow>().await })?;
        row.map(HostState::try_from).transpose()
    }

    fn list(&self) -> Result<Vec<HostState>, HostStoreError> {
        let query = self.client.query(&format!(
            "SELECT {HOST_COLUMNS} FROM hosts FINAL ORDER BY name"
        ));
        let rows = Self::block_on(async move { query.fetch_all::<HostRow>().await })?;
        rows.into_iter().map(HostState::try_from).collect()
    }

    fn count(&self) -> Result<usize, HostStoreError> {
        let client = Arc::clone(&self.client);
        let count: u64 = Self::block_on(async move {
            client
                .query("SELECT count() FROM hosts FINAL")
                .fetch_one::<u64>()
                .await
        })?;
        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }

    fn clear(&self) -> Result<(), HostStoreError> {
        let client = Arc::clone(&self.client);
        Self::block_on(async move { client.query("TRUNCATE TABLE hosts").execute().await })
    }
}
