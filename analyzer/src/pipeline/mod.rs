//! The ingestion and aggregation pipeline.
//!
//! A run has two strictly sequential passes:
//!
//! 1. [`WindowPager`] walks the requested range in fixed-width windows,
//!    fetching each window and handing every record to the [`LogIngestor`],
//!    which filters it, upserts it into the log store and lets the
//!    [`HostStateTracker`] refresh the host's latest state.
//! 2. [`DailyAggregator`] walks the same range in day buckets and rebuilds one
//!    [`DailyStat`](shared::models::DailyStat) per non-empty bucket from the
//!    persisted logs.
//!
//! No step is retried. Fetch and store failures are logged and the failed
//! unit is skipped.

pub mod aggregate;
pub mod host_state;
pub mod ingest;
pub mod pager;

pub use aggregate::{latest_per_host, summarize_bucket, AggregateReport, DailyAggregator};
pub use host_state::{HostStateTracker, TrackOutcome};
pub use ingest::{IngestOutcome, LogIngestor};
pub use pager::{PagerReport, WindowPager};
