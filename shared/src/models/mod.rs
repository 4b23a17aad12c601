//! Data models for Kadstats.
//!
//! This module contains the records read from the Kademlia activity log and
//! the three persisted shapes: log entries, host states and daily statistics.

pub mod host;
pub mod log;
pub mod statistic;

pub use host::HostState;
pub use log::{LogEntry, LogType, RawLogEntry};
pub use statistic::DailyStat;
