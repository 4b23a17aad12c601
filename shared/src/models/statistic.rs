//! Daily capacity statistics.

use serde::{Deserialize, Serialize};

/// Network-wide capacity for one day bucket.
///
/// Sums the latest report of every host seen during the day. Keyed by
/// `day_start` in the `statistics` collection.
///
/// # Example
///
/// ```
/// use shared::models::DailyStat;
///
/// let stat = DailyStat::new(86_400, 1_000, 600);
/// assert_eq!(stat.available_size, 400);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    /// Start of the day in unix seconds, a multiple of 86400.
    #[serde(rename = "ts")]
    pub day_start: i64,

    /// Sum of total capacity over hosts.
    pub total_size: i64,

    /// Sum of reserved capacity over hosts.
    pub reserved_size: i64,

    /// `total_size - reserved_size`.
    pub available_size: i64,
}

impl DailyStat {
    /// Creates a statistic, deriving the available size.
    #[must_use]
    pub const fn new(day_start: i64, total_size: i64, reserved_size: i64) -> Self {
        Self {
            day_start,
            total_size,
            reserved_size,
            available_size: total_size.saturating_sub(reserved_size),
        }
    }
}
