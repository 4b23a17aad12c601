//! Storage activity log model.
//!
//! Defines the raw record returned by the Kademlia activity log API and the
//! filtered `LogEntry` that is persisted in the `logs` collection.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Kind of activity log record the analyzer cares about.
///
/// The remote API reports many event types; only storage capacity reports
/// are ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogType {
    /// Periodic storage report (`"storage"`).
    #[serde(rename = "storage")]
    Storage,
    /// Storage report emitted through the log channel (`"log:storage"`).
    #[serde(rename = "log:storage")]
    LogStorage,
}

impl LogType {
    /// Parses a wire type string, returning `None` for ignored types.
    ///
    /// # Example
    ///
    /// ```
    /// use shared::models::LogType;
    ///
    /// assert_eq!(LogType::parse("storage"), Some(LogType::Storage));
    /// assert_eq!(LogType::parse("log:storage"), Some(LogType::LogStorage));
    /// assert_eq!(LogType::parse("connect"), None);
    /// ```
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "storage" => Some(Self::Storage),
            "log:storage" => Some(Self::LogStorage),
            _ => None,
        }
    }

    /// Returns the wire representation of this type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Storage => "storage",
            Self::LogStorage => "log:storage",
        }
    }
}

impl std::fmt::Display for LogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One element of the `GetActivityLog` response array.
///
/// Every field is optional on the wire; unknown fields are ignored. Sizes
/// never reject a record: see [`lenient_size`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLogEntry {
    /// Event time in unix seconds.
    #[serde(default)]
    pub ts: Option<i64>,

    /// Host name that produced the event.
    #[serde(default)]
    pub name: Option<String>,

    /// Event type, e.g. `"storage"`.
    #[serde(default, rename = "type")]
    pub log_type: Option<String>,

    /// Total storage capacity in bytes.
    #[serde(default, deserialize_with = "lenient_size")]
    pub total_size: i64,

    /// Free storage capacity in bytes.
    #[serde(default, deserialize_with = "lenient_size")]
    pub available_size: i64,
}

/// Reads a size field of any JSON shape.
///
/// Integers are taken as is, floats are truncated toward zero and saturate
/// at the `i64` bounds, numeric strings are parsed. `null` and every other
/// shape read as 0.
///
/// # Errors
///
/// Only fails if the input is not valid JSON.
pub fn lenient_size<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(size_from_value(&Value::deserialize(deserializer)?))
}

#[allow(clippy::cast_possible_truncation)]
fn size_from_value(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().map(|f| f as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

/// A storage capacity report accepted for persistence.
///
/// `(timestamp, name)` is the natural key of the `logs` collection.
///
/// # Example
///
/// ```
/// use shared::models::{LogEntry, LogType};
///
/// let entry = LogEntry::new(1_700_000_000, "host-a", LogType::Storage, 100, 40);
/// assert_eq!(entry.reserved_size, 60);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Event time in unix seconds.
    #[serde(rename = "ts")]
    pub timestamp: i64,

    /// Host name that produced the event.
    pub name: String,

    /// Event type.
    #[serde(rename = "type")]
    pub log_type: LogType,

    /// Total storage capacity in bytes.
    pub total_size: i64,

    /// Free storage capacity in bytes.
    pub available_size: i64,

    /// Capacity in use, always `total_size - available_size`.
    pub reserved_size: i64,
}

impl LogEntry {
    /// Creates a log entry, deriving the reserved size.
    #[must_use]
    pub fn new(
        timestamp: i64,
        name: impl Into<String>,
        log_type: LogType,
        total_size: i64,
        available_size: i64,
    ) -> Self {
        Self {
            timestamp,
            name: name.into(),
            log_type,
            total_size,
            available_size,
            reserved_size: total_size.saturating_sub(available_size),
        }
    }

    /// Converts a raw API record into a persistable entry.
    ///
    /// Returns `None` when the record has no timestamp, no host name or a
    /// type other than `storage` / `log:storage`. A zero timestamp or an
    /// empty name counts as missing.
    ///
    /// # Example
    ///
    /// ```
    /// use shared::models::{LogEntry, RawLogEntry};
    ///
    /// let raw = RawLogEntry {
    ///     ts: Some(100),
    ///     name: Some("host-a".to_string()),
    ///     log_type: Some("log:storage".to_string()),
    ///     total_size: 10,
    ///     available_size: 2,
    /// };
    /// let entry = LogEntry::from_raw(&raw).unwrap();
    /// assert_eq!(entry.reserved_size, 8);
    ///
    /// let ignored = RawLogEntry { log_type: Some("ping".to_string()), ..raw };
    /// assert!(LogEntry::from_raw(&ignored).is_none());
    /// ```
    #[must_use]
    pub fn from_raw(raw: &RawLogEntry) -> Option<Self> {
        let timestamp = raw.ts.filter(|ts| *ts != 0)?;
        let name = raw.name.as_deref().filter(|name| !name.is_empty())?;
        let log_type = raw.log_type.as_deref().and_then(LogType::parse)?;

        Some(Self::new(
            timestamp,
            name,
            log_type,
            raw.total_size,
            raw.available_size,
        ))
    }
}
