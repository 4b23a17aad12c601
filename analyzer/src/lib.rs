//! Kadstats Analyzer
//!
//! This crate dumps storage capacity reports from the Kademlia activity log
//! API into persistent collections and rebuilds daily capacity statistics
//! from them.
//!
//! # Architecture
//!
//! A run is a single sequential job:
//! - [`WindowPager`](pipeline::WindowPager) fetches the range in 30 day windows
//! - [`LogIngestor`](pipeline::LogIngestor) filters and upserts each record and
//!   refreshes the host's latest state
//! - [`DailyAggregator`](pipeline::DailyAggregator) rebuilds one statistic per
//!   day that has logs
//!
//! # Example
//!
//! ```no_run
//! use analyzer::{run_with_config, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let report = run_with_config(RunConfig::default()).await?;
//!     println!("{} statistics written", report.aggregate.written);
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod context;
pub mod db;
pub mod pipeline;
pub mod source;

pub use config::{RunConfig, StorageBackend};
pub use context::{RunContext, RunError};
pub use db::{Database, DatabaseConfig};
pub use source::{ActivityLogSource, FetchError, KademliaClient};

use anyhow::{Context, Result};
use pipeline::{AggregateReport, DailyAggregator, LogIngestor, PagerReport, WindowPager};

/// Counters of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Ingestion pass counters.
    pub ingest: PagerReport,
    /// Aggregation pass counters.
    pub aggregate: AggregateReport,
}

/// Runs both passes against an open context.
///
/// Ingestion of the whole range completes before aggregation starts.
pub async fn run<S: ActivityLogSource>(
    context: &RunContext,
    source: &S,
    config: &RunConfig,
) -> RunReport {
    let range = config.range;

    tracing::info!(start = range.start, end = range.end, "Dumping logs");
    let ingestor = LogIngestor::new(context.log_store(), context.host_store());
    let ingest = WindowPager::with_width(source, config.window_secs)
        .run(range, &ingestor)
        .await;
    tracing::info!(
        windows = ingest.windows,
        fetch_failures = ingest.fetch_failures,
        fetched = ingest.fetched,
        stored = ingest.stored,
        skipped = ingest.skipped,
        store_failures = ingest.store_failures,
        "Log dump complete"
    );

    tracing::info!(start = range.start, end = range.end, "Processing statistics");
    let aggregate =
        DailyAggregator::new(context.log_store(), context.statistics_store()).run(range);
    tracing::info!(
        buckets = aggregate.buckets,
        written = aggregate.written,
        empty = aggregate.empty,
        failures = aggregate.failures,
        "Statistics complete"
    );

    RunReport { ingest, aggregate }
}

/// Opens the configured stores, runs both passes against the Kademlia API
/// and releases the stores.
///
/// # Errors
///
/// Returns an error if:
/// - The configuration is invalid
/// - The HTTP client cannot be built
/// - The store connection or schema setup fails
pub async fn run_with_config(config: RunConfig) -> Result<RunReport> {
    config.validate()?;

    let source = KademliaClient::new(&config.api_url).context("Failed to build HTTP client")?;
    let context = RunContext::open(&config.storage).await?;

    tracing::info!(endpoint = %source.endpoint(), "Reading activity logs");
    Ok(run(&context, &source, &config).await)
}
