//! Daily capacity aggregation.

use std::collections::HashMap;

use shared::models::{DailyStat, LogEntry};
use shared::range::TimeRange;
use shared::storage::{LogQuery, LogStore, StatisticsStore};

/// Counters collected while aggregating. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateReport {
    /// Day buckets visited.
    pub buckets: usize,
    /// Statistics written.
    pub written: usize,
    /// Buckets without any log entry.
    pub empty: usize,
    /// Buckets whose query or write failed.
    pub failures: usize,
}

/// Keeps the entry with the greatest timestamp for every host.
///
/// The result is ordered by host name.
#[must_use]
pub fn latest_per_host(entries: Vec<LogEntry>) -> Vec<LogEntry> {
    let mut latest: HashMap<String, LogEntry> = HashMap::new();
    for entry in entries {
        match latest.get(&entry.name) {
            Some(current) if current.timestamp >= entry.timestamp => {}
            _ => {
                latest.insert(entry.name.clone(), entry);
            }
        }
    }

    let mut selected: Vec<LogEntry> = latest.into_values().collect();
    selected.sort_by(|a, b| a.name.cmp(&b.name));
    selected
}

/// Builds the statistic for one bucket from its log entries.
///
/// Only each host's latest entry in the bucket counts. Returns `None` when
/// the bucket has no entries.
///
/// ```
/// use analyzer::pipeline::summarize_bucket;
/// use shared::models::{LogEntry, LogType};
///
/// let entries = vec![
///     LogEntry::new(100, "a", LogType::Storage, 10, 2),
///     LogEntry::new(200, "a", LogType::Storage, 20, 5),
/// ];
/// let stat = summarize_bucket(0, entries).unwrap();
/// assert_eq!((stat.total_size, stat.reserved_size, stat.available_size), (20, 15, 5));
/// ```
#[must_use]
pub fn summarize_bucket(day_start: i64, entries: Vec<LogEntry>) -> Option<DailyStat> {
    let selected = latest_per_host(entries);
    if selected.is_empty() {
        return None;
    }

    let (total_size, reserved_size) = selected.iter().fold((0i64, 0i64), |(total, reserved), e| {
        (
            total.saturating_add(e.total_size),
            reserved.saturating_add(e.reserved_size),
        )
    });

    Some(DailyStat::new(day_start, total_size, reserved_size))
}

/// Rebuilds daily statistics from the persisted logs.
pub struct DailyAggregator<'a> {
    logs: &'a dyn LogStore,
    stats: &'a dyn StatisticsStore,
}

impl<'a> DailyAggregator<'a> {
    /// Creates an aggregator reading `logs` and writing `stats`.
    #[must_use]
    pub fn new(logs: &'a dyn LogStore, stats: &'a dyn StatisticsStore) -> Self {
        Self { logs, stats }
    }

    /// Recomputes the statistic of every day bucket overlapping `range`.
    ///
    /// The first bucket starts at the day containing `range.start`. Buckets
    /// are processed one after the other; empty buckets write nothing and
    /// failed buckets are logged and skipped.
    pub fn run(&self, range: TimeRange) -> AggregateReport {
        let mut report = AggregateReport::default();

        for bucket in range.day_buckets() {
            report.buckets += 1;
            tracing::info!(day_start = bucket.start, "Processing period");

            let entries = match self.logs.query(LogQuery::new().with_range(bucket)) {
                Ok(logs) => logs,
                Err(err) => {
                    tracing::error!(
                        day_start = bucket.start,
                        error = %err,
                        "Failed to query logs for period"
                    );
                    report.failures += 1;
                    continue;
                }
            };

            let Some(stat) = summarize_bucket(bucket.start, entries) else {
                report.empty += 1;
                continue;
            };

            match self.stats.upsert(stat) {
                Ok(()) => report.written += 1,
                Err(err) => {
                    tracing::error!(
                        day_start = bucket.start,
                        error = %err,
                        "Failed to store daily statistic"
                    );
                    report.failures += 1;
                }
            }
        }

        report
    }
}
