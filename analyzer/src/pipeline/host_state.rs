//! Latest-state tracking per host.

use shared::models::{HostState, LogEntry};
use shared::storage::{HostStore, LogStore};

/// What the tracker did with an accepted entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// The host state now holds the entry.
    Updated,
    /// A newer entry is on file; the host state was left alone.
    Stale,
    /// The log store lookup failed; the host state was left alone.
    LookupFailed,
    /// The host state write failed.
    WriteFailed,
}

/// Keeps the `hosts` collection pointing at each host's newest report.
///
/// The decision is made against the log store on every call rather than a
/// running maximum held in memory, so replaying windows in any order can
/// never move a host's state backwards.
pub struct HostStateTracker<'a> {
    logs: &'a dyn LogStore,
    hosts: &'a dyn HostStore,
}

impl<'a> HostStateTracker<'a> {
    /// Creates a tracker over the given stores.
    #[must_use]
    pub fn new(logs: &'a dyn LogStore, hosts: &'a dyn HostStore) -> Self {
        Self { logs, hosts }
    }

    /// Replaces the host's state with `entry` unless the log store already
    /// holds a strictly newer entry for the same host.
    pub fn track(&self, entry: &LogEntry) -> TrackOutcome {
        let latest = match self.logs.latest_for_host(&entry.name) {
            Ok(latest) => latest,
            Err(err) => {
                tracing::error!(
                    host = %entry.name,
                    ts = entry.timestamp,
                    error = %err,
                    "Failed to look up latest log for host"
                );
                return TrackOutcome::LookupFailed;
            }
        };

        if latest.is_some_and(|on_file| on_file.timestamp > entry.timestamp) {
            return TrackOutcome::Stale;
        }

        match self.hosts.upsert(HostState::from(entry.clone())) {
            Ok(()) => TrackOutcome::Updated,
            Err(err) => {
                tracing::error!(
                    host = %entry.name,
                    ts = entry.timestamp,
                    error = %err,
                    "Failed to update host state"
                );
                TrackOutcome::WriteFailed
            }
        }
    }
}
