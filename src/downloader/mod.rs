//! Chunked download orchestration
//!
//! # Overview
//!
//! A download runs through these steps:
//!
//! 1. **Job**: Describe what to download with [`job::DownloadJob`]
//! 2. **Resolution**: The catalog must hold exactly one record for the job's id and market
//! 3. **Splitting**: The range is cut into chunks via [`crate::interval::split_interval`]
//! 4. **Requests**: One URL per chunk from [`request::ExportRequest`], fetched strictly in order
//! 5. **Classification**: [`classifier::classify`] tells tables from provider error pages
//! 6. **Parsing**: [`parser::parse_payload`] turns tables into typed rows
//!
//! # Quick Start
//!
//! ```no_run
//! use finam_data_downloader::downloader::{DownloadJob, ExportConfig, Exporter};
//! use finam_data_downloader::{Market, Timeframe};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let exporter = Exporter::new(ExportConfig::default())?;
//! let job = DownloadJob::new(3, Market::Shares, Timeframe::Hourly).with_max_retries(3);
//! let dataset = exporter.download(&job).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Only the provider's "already processing" answer is retried, with the job's
//! fixed delay. Transport failures, provider rejections and unparsable tables
//! abort the download and no rows are returned.

pub mod classifier;
pub mod config;
pub mod executor;
pub mod job;
pub mod parser;
pub mod progress;
pub mod request;

pub use classifier::{Outcome, ResponseError};
pub use config::ExportConfig;
pub use executor::Exporter;
pub use job::DownloadJob;
pub use parser::PayloadError;
pub use progress::{DownloadObserver, NoopObserver};

use crate::catalog::CatalogError;
use crate::fetcher::FetcherError;
use crate::interval::IntervalError;

/// Download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Job parameters are invalid
    #[error("invalid job: {0}")]
    InvalidJob(String),

    /// Date range is invalid
    #[error(transparent)]
    Interval(#[from] IntervalError),

    /// Instrument lookup failed
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Catalog holds zero or several records for the instrument
    #[error("expected exactly one instrument for id={id} on market {market}, found {matches}")]
    AmbiguousInstrument {
        /// Requested id
        id: i64,
        /// Requested market
        market: i32,
        /// Number of matching records
        matches: usize,
    },

    /// Provider rejected a chunk
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// Chunk table could not be parsed
    #[error("payload parsing error: {0}")]
    Payload(#[from] PayloadError),

    /// Transport failure
    #[error("download error: {0}")]
    Fetch(#[from] FetcherError),
}
