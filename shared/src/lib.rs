//! Kadstats Shared Library
//!
//! This crate contains the models, time ranges and storage backends used by
//! the Kadstats analyzer and CLI.
//!
//! # Modules
//!
//! - [`models`] - Activity log records, host states and daily statistics
//! - [`range`] - Half-open time ranges, fetch windows and day buckets
//! - [`storage`] - Storage traits and implementations
//!
//! # Example
//!
//! ```
//! use shared::models::{LogEntry, RawLogEntry};
//!
//! let raw: RawLogEntry = serde_json::from_str(
//!     r#"{"ts": 1700000000, "name": "host-a", "type": "storage",
//!         "totalSize": 100, "availableSize": 25}"#,
//! ).unwrap();
//!
//! let entry = LogEntry::from_raw(&raw).unwrap();
//! assert_eq!(entry.reserved_size, 75);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod models;
pub mod range;
pub mod storage;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
