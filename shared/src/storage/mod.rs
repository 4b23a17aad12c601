//! Storage traits and implementations.
//!
//! Each persisted collection has a trait with an in-memory implementation for
//! tests and dry runs and a `ClickHouse` implementation for production:
//!
//! - [`LogStore`] - the `logs` collection, keyed by `(ts, name)`
//! - [`HostStore`] - the `hosts` collection, keyed by `name`
//! - [`StatisticsStore`] - the `statistics` collection, keyed by day start

pub mod host_store;
pub mod log_store;
pub mod statistics_store;

pub use host_store::{ClickHouseHostStore, HostStore, HostStoreError, InMemoryHostStore};
pub use log_store::{ClickHouseLogStore, InMemoryLogStore, LogQuery, LogStore, LogStoreError};
pub use statistics_store::{
    ClickHouseStatisticsStore, InMemoryStatisticsStore, StatisticsStore, StatisticsStoreError,
};
