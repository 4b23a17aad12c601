//! Kadstats CLI
//!
//! Dumps storage capacity reports from a Kademlia node's activity log and
//! rebuilds the daily capacity statistics.
//!
//! # Usage
//!
//! ```bash
//! kadstats --help
//! kadstats -k http://localhost:7800 -o bdstats
//! kadstats -s 1600000000 -e 1602592000 --in-memory
//! ```

#![deny(unsafe_code)]

use analyzer::config::DEFAULT_RANGE_DAYS;
use analyzer::{DatabaseConfig, RunConfig, StorageBackend};
use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use shared::range::{TimeRange, SECONDS_PER_DAY};

/// Kadstats - Kademlia storage statistics
#[derive(Debug, Parser)]
#[command(name = "kadstats")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Kademlia API base URL
    #[arg(
        short,
        long = "kademlia",
        env = "KADSTATS_KADEMLIA_URL",
        default_value = "http://localhost:7800"
    )]
    kademlia_url: String,

    /// Output database name
    #[arg(short, long, env = "KADSTATS_DB_NAME", default_value = "bdstats")]
    output: String,

    /// Start of the range in unix seconds (default: 30 days before now)
    #[arg(short, long, allow_negative_numbers = true)]
    start: Option<i64>,

    /// End of the range in unix seconds (default: now)
    #[arg(short, long, allow_negative_numbers = true)]
    end: Option<i64>,

    /// Keep results in memory instead of writing to ClickHouse
    #[arg(long)]
    in_memory: bool,
}

impl Cli {
    fn range(&self, now: i64) -> TimeRange {
        let start = self
            .start
            .unwrap_or_else(|| now.saturating_sub(DEFAULT_RANGE_DAYS * SECONDS_PER_DAY));
        TimeRange::new(start, self.end.unwrap_or(now))
    }

    fn into_config(self, now: i64) -> RunConfig {
        let storage = if self.in_memory {
            StorageBackend::InMemory
        } else {
            StorageBackend::ClickHouse(DatabaseConfig::from_env().with_database(&self.output))
        };
        let range = self.range(now);
        RunConfig::new(self.kademlia_url, range, storage)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config(Utc::now().timestamp());
    tracing::info!(
        kademlia = %config.api_url,
        range = %config.range,
        "Starting kadstats v{}",
        env!("CARGO_PKG_VERSION")
    );

    let report = analyzer::run_with_config(config).await?;
    tracing::info!(
        stored = report.ingest.stored,
        statistics = report.aggregate.written,
        "Done"
    );

    Ok(())
}
