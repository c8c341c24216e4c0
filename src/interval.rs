//! Date range splitting for provider-sized requests
//!
//! The export service refuses requests spanning more than a timeframe-specific
//! number of days. [`split_interval`] partitions an inclusive date range into the
//! minimum number of contiguous chunks that each respect that limit.
//!
//! ```
//! use chrono::NaiveDate;
//! use finam_data_downloader::{split_interval, Timeframe};
//!
//! let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2020, 1, 3).unwrap();
//! let chunks = split_interval(start, end, Timeframe::Ticks).unwrap();
//! assert_eq!(chunks.len(), 3);
//! ```

use crate::Timeframe;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive range of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day (inclusive)
    pub start: NaiveDate,
    /// Last day (inclusive)
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, IntervalError> {
        if start > end {
            return Err(IntervalError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Number of calendar days covered, both ends included
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Whether `other` lies entirely within this range
    pub fn contains(&self, other: &DateRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Errors raised while splitting a range
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntervalError {
    /// Start date after end date
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange {
        /// Requested start
        start: NaiveDate,
        /// Requested end
        end: NaiveDate,
    },
}

/// Split `[start, end]` into chunks no longer than the timeframe allows
///
/// Chunks are returned in chronological order, are contiguous (each chunk starts
/// the day after the previous one ends) and cover the range exactly. A range no
/// longer than the limit comes back as a single chunk; a remainder produces one
/// shorter final chunk.
///
/// # Errors
///
/// Returns [`IntervalError::InvalidRange`] if `start > end`.
pub fn split_interval(
    start: NaiveDate,
    end: NaiveDate,
    timeframe: Timeframe,
) -> Result<Vec<DateRange>, IntervalError> {
    let range = DateRange::new(start, end)?;
    let max_days = timeframe.max_chunk_days();
    let total_days = range.span_days();

    if total_days <= max_days {
        return Ok(vec![range]);
    }

    let chunk_count = (total_days + max_days - 1) / max_days;
    let mut chunks = Vec::with_capacity(chunk_count as usize);

    for i in 0..chunk_count {
        let chunk_start = start + Duration::days(i * max_days);
        let chunk_end = (chunk_start + Duration::days(max_days - 1)).min(end);
        chunks.push(DateRange {
            start: chunk_start,
            end: chunk_end,
        });
    }

    Ok(chunks)
}
