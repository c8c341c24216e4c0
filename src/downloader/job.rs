//! Download job definition

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::config::{default_start_date, DEFAULT_DELAY_SECS, DEFAULT_MAX_RETRIES};
use crate::interval::{DateRange, IntervalError};
use crate::Timeframe;

/// What to download
///
/// The instrument is selected by id within a market; the catalog must hold
/// exactly one record for that pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadJob {
    /// Provider instrument id
    pub id: i64,
    /// Provider market code
    pub market: i32,
    /// Sampling resolution
    pub timeframe: Timeframe,
    /// First day (inclusive)
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    /// Last day (inclusive); today when absent
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Pause between requests and between retries, in seconds
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
    /// Retry bound for "already processing" answers
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Ask the provider to fill periods without trades
    #[serde(default)]
    pub fill_empty: bool,
}

fn default_delay_secs() -> u64 {
    DEFAULT_DELAY_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl DownloadJob {
    /// Job with default dates, pacing and retries
    pub fn new(id: i64, market: impl Into<i32>, timeframe: Timeframe) -> Self {
        Self {
            id,
            market: market.into(),
            timeframe,
            start_date: default_start_date(),
            end_date: None,
            delay_secs: DEFAULT_DELAY_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            fill_empty: false,
        }
    }

    /// Set the first day
    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = start_date;
        self
    }

    /// Set the last day
    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Set the pause between requests
    pub fn with_delay_secs(mut self, delay_secs: u64) -> Self {
        self.delay_secs = delay_secs;
        self
    }

    /// Set the retry bound
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the fill-empty flag
    pub fn with_fill_empty(mut self, fill_empty: bool) -> Self {
        self.fill_empty = fill_empty;
        self
    }

    /// Pause between requests
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    /// Requested range with the end defaulted to today (local time)
    pub fn resolved_range(&self) -> Result<DateRange, IntervalError> {
        let end = self.end_date.unwrap_or_else(|| Local::now().date_naive());
        DateRange::new(self.start_date, end)
    }

    /// Validate job parameters
    ///
    /// Date order is checked by [`resolved_range`](Self::resolved_range).
    pub fn validate(&self) -> Result<(), String> {
        if self.id < 0 {
            return Err(format!("Instrument id must be non-negative, got {}", self.id));
        }

        Ok(())
    }
}
