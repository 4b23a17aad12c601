//! Time ranges, fetch windows and day buckets.
//!
//! All times are unix seconds. Ranges are half-open: `[start, end)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds in one statistics bucket.
pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Width of one activity log fetch window (30 days).
pub const DEFAULT_WINDOW_SECS: i64 = 30 * SECONDS_PER_DAY;

/// Floors a timestamp to the start of its UTC day.
///
/// ```
/// use shared::range::align_to_day;
///
/// assert_eq!(align_to_day(86_399), 0);
/// assert_eq!(align_to_day(86_400), 86_400);
/// assert_eq!(align_to_day(-1), -86_400);
/// ```
#[must_use]
pub const fn align_to_day(ts: i64) -> i64 {
    ts.div_euclid(SECONDS_PER_DAY).saturating_mul(SECONDS_PER_DAY)
}

/// A half-open time range in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive start.
    pub start: i64,
    /// Exclusive end.
    pub end: i64,
}

impl TimeRange {
    /// Creates a new range.
    #[must_use]
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// The `days` days leading up to `now`.
    #[must_use]
    pub fn last_days(now: DateTime<Utc>, days: i64) -> Self {
        let end = now.timestamp();
        Self::new(end.saturating_sub(days.saturating_mul(SECONDS_PER_DAY)), end)
    }

    /// Returns true if the range covers no time.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Returns true if `ts` lies inside the range.
    #[must_use]
    pub const fn contains(&self, ts: i64) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Splits the range into consecutive windows of at most `width` seconds.
    ///
    /// The last window is clipped to `end`. A non-positive width is treated
    /// as one second.
    ///
    /// ```
    /// use shared::range::{TimeRange, SECONDS_PER_DAY};
    ///
    /// let windows: Vec<_> = TimeRange::new(0, 65 * SECONDS_PER_DAY)
    ///     .windows(30 * SECONDS_PER_DAY)
    ///     .collect();
    /// assert_eq!(windows.len(), 3);
    /// assert_eq!(windows[2], TimeRange::new(60 * SECONDS_PER_DAY, 65 * SECONDS_PER_DAY));
    /// ```
    #[must_use]
    pub fn windows(&self, width: i64) -> Windows {
        Windows {
            cursor: self.start,
            end: self.end,
            width: width.max(1),
        }
    }

    /// Iterates the day buckets overlapping the range.
    ///
    /// The first bucket starts at the day containing `start`; buckets are
    /// always a full day wide, so the last one may extend past `end`.
    #[must_use]
    pub fn day_buckets(&self) -> DayBuckets {
        DayBuckets {
            cursor: align_to_day(self.start),
            end: self.end,
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Iterator over fetch windows, see [`TimeRange::windows`].
#[derive(Debug, Clone)]
pub struct Windows {
    cursor: i64,
    end: i64,
    width: i64,
}

impl Iterator for Windows {
    type Item = TimeRange;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.end {
            return None;
        }
        let next = self.cursor.saturating_add(self.width).min(self.end);
        let window = TimeRange::new(self.cursor, next);
        self.cursor = next;
        Some(window)
    }
}

/// Iterator over day buckets, see [`TimeRange::day_buckets`].
#[derive(Debug, Clone)]
pub struct DayBuckets {
    cursor: i64,
    end: i64,
}

impl Iterator for DayBuckets {
    type Item = TimeRange;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.end {
            return None;
        }
        let bucket = TimeRange::new(self.cursor, self.cursor.saturating_add(SECONDS_PER_DAY));
        self.cursor = bucket.end;
        Some(bucket)
    }
}
