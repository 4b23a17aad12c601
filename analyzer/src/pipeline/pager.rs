//! Windowed paging over the activity log API.

use shared::range::{TimeRange, DEFAULT_WINDOW_SECS};

use super::ingest::{IngestOutcome, LogIngestor};
use crate::source::ActivityLogSource;

/// Counters collected while paging. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PagerReport {
    /// Number of windows requested.
    pub windows: usize,
    /// Windows whose fetch failed and were treated as empty.
    pub fetch_failures: usize,
    /// Raw records received.
    pub fetched: usize,
    /// Records upserted into the log store.
    pub stored: usize,
    /// Records filtered out.
    pub skipped: usize,
    /// Records whose upsert failed.
    pub store_failures: usize,
}

impl PagerReport {
    fn record(&mut self, outcome: IngestOutcome) {
        match outcome {
            IngestOutcome::Stored => self.stored += 1,
            IngestOutcome::Skipped => self.skipped += 1,
            IngestOutcome::StoreFailed => self.store_failures += 1,
        }
    }
}

/// Splits a range into windows and feeds each window's records to an
/// ingestor, one window at a time.
pub struct WindowPager<'s, S> {
    source: &'s S,
    width: i64,
}

impl<'s, S: ActivityLogSource> WindowPager<'s, S> {
    /// Creates a pager with the default 30 day window.
    #[must_use]
    pub fn new(source: &'s S) -> Self {
        Self::with_width(source, DEFAULT_WINDOW_SECS)
    }

    /// Creates a pager with a custom window width in seconds.
    ///
    /// Widths below one second are raised to one second.
    #[must_use]
    pub fn with_width(source: &'s S, width: i64) -> Self {
        Self {
            source,
            width: width.max(1),
        }
    }

    /// Window width in seconds.
    #[must_use]
    pub const fn width(&self) -> i64 {
        self.width
    }

    /// Fetches and ingests every window of `range` in order.
    ///
    /// A window's records are all ingested before the next window is
    /// fetched. A failed fetch counts as an empty window; the cursor always
    /// advances.
    pub async fn run(&self, range: TimeRange, ingestor: &LogIngestor<'_>) -> PagerReport {
        let mut report = PagerReport::default();

        for window in range.windows(self.width) {
            report.windows += 1;
            tracing::info!(start = window.start, end = window.end, "Processing time window");

            let records = match self.source.fetch(window).await {
                Ok(records) => records,
                Err(err) => {
                    tracing::warn!(
                        start = window.start,
                        end = window.end,
                        error = %err,
                        "Failed to fetch activity log window, skipping"
                    );
                    report.fetch_failures += 1;
                    continue;
                }
            };

            report.fetched += records.len();
            for raw in &records {
                report.record(ingestor.ingest(raw));
            }
        }

        report
    }
}
