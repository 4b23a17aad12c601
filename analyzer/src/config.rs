//! Run configuration module.
//!
//! Collects the parameters of one analyzer run: where to read activity logs
//! from, which range to cover and where to write the results.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use shared::range::{TimeRange, DEFAULT_WINDOW_SECS};

use crate::db::DatabaseConfig;
use crate::source::DEFAULT_KADEMLIA_URL;

/// Number of days covered when no range is given.
pub const DEFAULT_RANGE_DAYS: i64 = 30;

/// Where the run persists its collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local stores, discarded when the run ends.
    InMemory,
    /// `ClickHouse` tables in the configured database.
    ClickHouse(DatabaseConfig),
}

/// Configuration of one analyzer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Kademlia API base URL.
    pub api_url: String,
    /// Range to ingest and aggregate, in unix seconds.
    pub range: TimeRange,
    /// Width of one fetch window in seconds.
    pub window_secs: i64,
    /// Output stores.
    pub storage: StorageBackend,
}

impl RunConfig {
    /// Creates a configuration with the default window width.
    #[must_use]
    pub fn new(api_url: impl Into<String>, range: TimeRange, storage: StorageBackend) -> Self {
        Self {
            api_url: api_url.into(),
            range,
            window_secs: DEFAULT_WINDOW_SECS,
            storage,
        }
    }

    /// Configuration covering the last 30 days before `now`, against the
    /// local API and in-memory stores.
    #[must_use]
    pub fn default_at(now: DateTime<Utc>) -> Self {
        Self::new(
            DEFAULT_KADEMLIA_URL,
            TimeRange::last_days(now, DEFAULT_RANGE_DAYS),
            StorageBackend::InMemory,
        )
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The API URL is empty
    /// - The range starts after it ends
    /// - The window width is not positive
    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            bail!("Kademlia API URL cannot be empty");
        }
        if self.range.start > self.range.end {
            bail!(
                "Start time {} is after end time {}",
                self.range.start,
                self.range.end
            );
        }
        if self.window_secs <= 0 {
            bail!("Window width must be positive, got {}", self.window_secs);
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::default_at(Utc::now())
    }
}
