//! Latest known state of a storage host.

use serde::{Deserialize, Serialize};

use super::LogEntry;

/// The most recent storage report accepted for a host.
///
/// Keyed by host name in the `hosts` collection. The record is a full copy of
/// the winning `LogEntry`, so it carries the same wire fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostState {
    /// The accepted report.
    #[serde(flatten)]
    pub entry: LogEntry,
}

impl HostState {
    /// Host name, the unique key of this state.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    /// Timestamp of the report this state was copied from.
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.entry.timestamp
    }
}

impl From<LogEntry> for HostState {
    fn from(entry: LogEntry) -> Self {
        Self { entry }
    }
}
