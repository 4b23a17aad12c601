//! Run-scoped context.
//!
//! Holds the store handles for one analyzer run. The context is built once
//! per invocation and owns every connection; dropping it releases them.

use shared::storage::{
    ClickHouseHostStore, ClickHouseLogStore, ClickHouseStatisticsStore, HostStore,
    InMemoryHostStore, InMemoryLogStore, InMemoryStatisticsStore, LogStore, StatisticsStore,
};
use std::sync::Arc;
use thiserror::Error;

use crate::config::StorageBackend;
use crate::db::{Database, DatabaseConfig};

/// Errors that abort a run before any work starts.
#[derive(Debug, Error)]
pub enum RunError {
    /// The store could not be reached.
    #[error("Failed to connect to ClickHouse at {url}: {reason}")]
    Connection {
        /// Server URL.
        url: String,
        /// Underlying failure.
        reason: String,
    },

    /// The output collections could not be provisioned.
    #[error("Failed to prepare database {database}: {reason}")]
    Schema {
        /// Database name.
        database: String,
        /// Underlying failure.
        reason: String,
    },
}

/// Store handles for one run.
pub struct RunContext {
    log_store: Arc<dyn LogStore>,
    host_store: Arc<dyn HostStore>,
    statistics_store: Arc<dyn StatisticsStore>,
    database: Option<Database>,
}

impl RunContext {
    /// Creates a context from existing stores.
    pub fn new(
        log_store: Arc<dyn LogStore>,
        host_store: Arc<dyn HostStore>,
        statistics_store: Arc<dyn StatisticsStore>,
    ) -> Self {
        Self {
            log_store,
            host_store,
            statistics_store,
            database: None,
        }
    }

    /// Creates a context with fresh in-memory stores.
    #[must_use]
    pub fn with_in_memory_store() -> Self {
        Self::new(
            Arc::new(InMemoryLogStore::new()),
            Arc::new(InMemoryHostStore::new()),
            Arc::new(InMemoryStatisticsStore::new()),
        )
    }

    /// Creates a context backed by `ClickHouse`.
    ///
    /// Pings the server and provisions the schema first; either failure is
    /// fatal for the run.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Connection`] if the server is unreachable and
    /// [`RunError::Schema`] if the tables cannot be created.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, RunError> {
        let database = Database::new(config);

        database
            .ping()
            .await
            .map_err(|err| RunError::Connection {
                url: config.url.clone(),
                reason: format!("{err:#}"),
            })?;

        database
            .ensure_schema()
            .await
            .map_err(|err| RunError::Schema {
                database: config.database.clone(),
                reason: format!("{err:#}"),
            })?;

        tracing::info!(url = %config.url, database = %config.database, "Connected to ClickHouse");

        let client = database.client();
        Ok(Self {
            log_store: ClickHouseLogStore::new_shared(Arc::clone(&client)),
            host_store: ClickHouseHostStore::new_shared(Arc::clone(&client)),
            statistics_store: ClickHouseStatisticsStore::new_shared(client),
            database: Some(database),
        })
    }

    /// Builds the context for the given backend.
    ///
    /// # Errors
    ///
    /// Returns an error if a `ClickHouse` backend cannot be prepared.
    pub async fn open(backend: &StorageBackend) -> Result<Self, RunError> {
        match backend {
            StorageBackend::InMemory => Ok(Self::with_in_memory_store()),
            StorageBackend::ClickHouse(config) => Self::connect(config).await,
        }
    }

    /// Returns a reference to the log store.
    #[must_use]
    pub fn log_store(&self) -> &dyn LogStore {
        self.log_store.as_ref()
    }

    /// Returns a reference to the host store.
    #[must_use]
    pub fn host_store(&self) -> &dyn HostStore {
        self.host_store.as_ref()
    }

    /// Returns a reference to the statistics store.
    #[must_use]
    pub fn statistics_store(&self) -> &dyn StatisticsStore {
        self.statistics_store.as_ref()
    }
}

impl Drop for RunContext {
    fn drop(&mut self) {
        if let Some(ref database) = self.database {
            tracing::debug!(database = %database.name(), "Releasing ClickHouse connection");
        }
    }
}
