//! Per-record ingestion.

use shared::models::{LogEntry, RawLogEntry};
use shared::storage::{HostStore, LogStore};

use super::host_state::HostStateTracker;

/// What happened to one raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The record was filtered out; nothing was written.
    Skipped,
    /// The record was upserted into the log store.
    Stored,
    /// The log store upsert failed. Host state was still tracked.
    StoreFailed,
}

/// Filters raw records, stores accepted ones and refreshes host state.
pub struct LogIngestor<'a> {
    logs: &'a dyn LogStore,
    tracker: HostStateTracker<'a>,
}

impl<'a> LogIngestor<'a> {
    /// Creates an ingestor writing to the given stores.
    #[must_use]
    pub fn new(logs: &'a dyn LogStore, hosts: &'a dyn HostStore) -> Self {
        Self {
            logs,
            tracker: HostStateTracker::new(logs, hosts),
        }
    }

    /// Ingests one raw record.
    ///
    /// Records without a timestamp or host name, or of a type other than
    /// `storage` / `log:storage`, are skipped without touching any store.
    /// Accepted records are upserted by `(ts, name)` and then handed to the
    /// host state tracker whether or not the upsert succeeded.
    pub fn ingest(&self, raw: &RawLogEntry) -> IngestOutcome {
        let Some(entry) = LogEntry::from_raw(raw) else {
            tracing::trace!(?raw, "Skipping non-storage activity record");
            return IngestOutcome::Skipped;
        };

        let outcome = match self.logs.upsert(entry.clone()) {
            Ok(()) => IngestOutcome::Stored,
            Err(err) => {
                tracing::error!(
                    host = %entry.name,
                    ts = entry.timestamp,
                    error = %err,
                    "Failed to store log entry"
                );
                IngestOutcome::StoreFailed
            }
        };

        self.tracker.track(&entry);
        outcome
    }
}
