//! Hierarchical path generation for downloaded files
//!
//! Files are laid out as `{root}/{market}/{CODE}/{CODE}-{timeframe}-{start}-{end}.csv`.
//! Known markets use their name as directory, unknown ones their numeric code.
//!
//! ```rust
//! use finam_data_downloader::output::OutputPathBuilder;
//! use finam_data_downloader::{DateRange, Timeframe};
//! use chrono::NaiveDate;
//! use std::path::PathBuf;
//!
//! let range = DateRange::new(
//!     NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
//! )
//! .unwrap();
//! let path = OutputPathBuilder::new(PathBuf::from("data"), 1, "GAZP")
//!     .with_timeframe(Timeframe::Daily)
//!     .with_range(range)
//!     .build()
//!     .unwrap();
//! assert_eq!(path, PathBuf::from("data/shares/GAZP/GAZP-1d-2020-01-01-2020-12-31.csv"));
//! ```

use super::OutputError;
use crate::interval::DateRange;
use crate::{Market, Timeframe};
use std::path::PathBuf;

/// Path builder for hierarchical file organization
pub struct OutputPathBuilder {
    root_dir: PathBuf,
    market_dir: String,
    code: String,
    timeframe: Option<Timeframe>,
    range: Option<DateRange>,
}

impl OutputPathBuilder {
    /// Create a new path builder
    ///
    /// The code is sanitized to prevent path traversal.
    /// Characters `/`, `\`, `:`, `..` are replaced with `_`.
    pub fn new(root_dir: PathBuf, market: i32, code: &str) -> Self {
        let market_dir = Market::from_code(market)
            .map(|m| m.to_string())
            .unwrap_or_else(|| market.to_string());

        Self {
            root_dir,
            market_dir,
            code: sanitize_code(code),
            timeframe: None,
            range: None,
        }
    }

    /// Set timeframe
    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = Some(timeframe);
        self
    }

    /// Set the downloaded range
    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Build the complete file path
    pub fn build(&self) -> Result<PathBuf, OutputError> {
        let filename = self.generate_filename()?;
        Ok(self
            .root_dir
            .join(&self.market_dir)
            .join(&self.code)
            .join(filename))
    }

    fn generate_filename(&self) -> Result<String, OutputError> {
        let timeframe = self.timeframe.ok_or_else(|| {
            OutputError::ConfigurationError("Timeframe required for output path".to_string())
        })?;
        let range = self.range.ok_or_else(|| {
            OutputError::ConfigurationError("Date range required for output path".to_string())
        })?;

        Ok(format!(
            "{}-{}-{}-{}.csv",
            self.code, timeframe, range.start, range.end
        ))
    }
}

/// Sanitize instrument code for filesystem safety
///
/// - `/`, `\`, `:` → `_` (directory separators)
/// - `..` → `__` (parent directory reference)
///
/// Preserves case.
fn sanitize_code(code: &str) -> String {
    code.replace("..", "__").replace(['/', '\\', ':'], "_")
}
