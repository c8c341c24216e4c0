//! # Finam Data Downloader Library
//!
//! A library for downloading historical market data from the Finam export service,
//! an undocumented, rate-limited endpoint that answers with plain-text tables.
//!
//! ## Features
//!
//! - **Instrument Catalog**: Resolves instruments by id, code, name and market from the
//!   provider's metadata script, cached once per process
//! - **Chunked Downloads**: Splits long date ranges into provider-acceptable chunks and
//!   stitches the results back together in chronological order
//! - **Provider-aware Retries**: Retries only on the provider's own "request in progress" signal,
//!   with fixed pacing between requests
//! - **Type-Safe**: Typed tick and candle rows with decimal prices
//!
//! ## Quick Start
//!
//! ```no_run
//! use finam_data_downloader::downloader::{DownloadJob, ExportConfig, Exporter};
//! use finam_data_downloader::{Market, Timeframe};
//! use chrono::NaiveDate;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let exporter = Exporter::new(ExportConfig::default())?;
//!
//! // Daily candles for instrument 16842 on the shares market
//! let job = DownloadJob::new(16842, Market::Shares, Timeframe::Daily)
//!     .with_start_date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
//!     .with_end_date(NaiveDate::from_ymd_opt(2020, 12, 31).unwrap());
//!
//! let dataset = exporter.download(&job).await?;
//! println!("{} rows", dataset.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`interval`] - Splits a date range into chunks sized for a timeframe
//! - [`catalog`] - Instrument metadata cache and filtered lookups
//! - [`fetcher`] - Transport collaborators (HTTP fetcher, metadata session management)
//! - [`downloader`] - Response classification, payload parsing and chunked download orchestration
//! - [`output`] - Dataset writers (CSV)
//! - [`metrics`] - Optional Prometheus metrics

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// CLI command implementations
pub mod cli;

/// Instrument catalog
pub mod catalog;

/// Chunked download orchestration
pub mod downloader;

/// Transport collaborators
pub mod fetcher;

/// Date range splitting
pub mod interval;

/// Observability metrics
pub mod metrics;

/// Dataset output writers
pub mod output;

// Re-export commonly used types
pub use catalog::{InstrumentCatalog, InstrumentRecord, LookupComparator, LookupQuery};
pub use downloader::{DownloadError, DownloadJob, Exporter};
pub use interval::{split_interval, DateRange};

/// Sampling resolution of a time series
///
/// Each variant carries the provider's numeric wire code, the maximum span
/// a single request may cover, and the schema of its result rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    /// Individual trades
    #[serde(rename = "ticks")]
    Ticks,
    /// 1 minute
    #[serde(rename = "1m")]
    Minutes1,
    /// 5 minutes
    #[serde(rename = "5m")]
    Minutes5,
    /// 10 minutes
    #[serde(rename = "10m")]
    Minutes10,
    /// 15 minutes
    #[serde(rename = "15m")]
    Minutes15,
    /// 30 minutes
    #[serde(rename = "30m")]
    Minutes30,
    /// 1 hour
    #[serde(rename = "1h")]
    Hourly,
    /// 1 day
    #[serde(rename = "1d")]
    Daily,
    /// 1 week
    #[serde(rename = "1w")]
    Weekly,
    /// 1 month
    #[serde(rename = "1M")]
    Monthly,
}

impl Timeframe {
    /// All timeframes, finest first
    pub const ALL: [Timeframe; 10] = [
        Timeframe::Ticks,
        Timeframe::Minutes1,
        Timeframe::Minutes5,
        Timeframe::Minutes10,
        Timeframe::Minutes15,
        Timeframe::Minutes30,
        Timeframe::Hourly,
        Timeframe::Daily,
        Timeframe::Weekly,
        Timeframe::Monthly,
    ];

    /// Numeric code sent as the `p` request parameter
    pub fn code(&self) -> u8 {
        match self {
            Timeframe::Ticks => 1,
            Timeframe::Minutes1 => 2,
            Timeframe::Minutes5 => 3,
            Timeframe::Minutes10 => 4,
            Timeframe::Minutes15 => 5,
            Timeframe::Minutes30 => 6,
            Timeframe::Hourly => 7,
            Timeframe::Daily => 8,
            Timeframe::Weekly => 9,
            Timeframe::Monthly => 10,
        }
    }

    /// Maximum number of calendar days (inclusive) one request may cover
    pub fn max_chunk_days(&self) -> i64 {
        match self {
            Timeframe::Ticks => 1,
            Timeframe::Minutes1
            | Timeframe::Minutes5
            | Timeframe::Minutes10
            | Timeframe::Minutes15
            | Timeframe::Minutes30
            | Timeframe::Hourly => 365,
            Timeframe::Daily | Timeframe::Weekly | Timeframe::Monthly => 365 * 30,
        }
    }

    /// Row schema returned by the provider for this timeframe
    pub fn schema(&self) -> RowSchema {
        if self.is_ticks() {
            RowSchema::Ticks
        } else {
            RowSchema::Candles
        }
    }

    /// Whether this is the tick-level timeframe
    pub fn is_ticks(&self) -> bool {
        matches!(self, Timeframe::Ticks)
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Timeframe::Ticks => "ticks",
            Timeframe::Minutes1 => "1m",
            Timeframe::Minutes5 => "5m",
            Timeframe::Minutes10 => "10m",
            Timeframe::Minutes15 => "15m",
            Timeframe::Minutes30 => "30m",
            Timeframe::Hourly => "1h",
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1w",
            Timeframe::Monthly => "1M",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ticks" | "tick" => Ok(Timeframe::Ticks),
            "1m" => Ok(Timeframe::Minutes1),
            "5m" => Ok(Timeframe::Minutes5),
            "10m" => Ok(Timeframe::Minutes10),
            "15m" => Ok(Timeframe::Minutes15),
            "30m" => Ok(Timeframe::Minutes30),
            "1h" | "hourly" => Ok(Timeframe::Hourly),
            "1d" | "daily" => Ok(Timeframe::Daily),
            "1w" | "weekly" => Ok(Timeframe::Weekly),
            "1M" | "monthly" => Ok(Timeframe::Monthly),
            _ => Err(format!("Invalid timeframe: {s}")),
        }
    }
}

/// Well-known provider market codes
///
/// Catalog records and download jobs carry the raw `i32` code, so markets
/// missing from this list can still be requested by number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Market {
    /// Moscow Exchange shares
    Shares,
    /// Bonds
    Bonds,
    /// World currencies
    CurrenciesWorld,
    /// Indexes
    Indexes,
    /// US futures
    FuturesUsa,
    /// Moscow Exchange futures
    Futures,
    /// Expired futures
    FuturesArchive,
    /// Commodities
    Commodities,
    /// US shares
    Usa,
    /// Foreign ETFs
    Etf,
    /// Currencies
    Currencies,
    /// Moscow Exchange ETFs
    EtfMoex,
    /// Saint Petersburg Exchange
    Spb,
    /// Crypto currencies
    CryptoCurrencies,
}

impl Market {
    /// All known markets
    pub fn all() -> &'static [Market] {
        &[
            Market::Shares,
            Market::Bonds,
            Market::CurrenciesWorld,
            Market::Indexes,
            Market::FuturesUsa,
            Market::Futures,
            Market::FuturesArchive,
            Market::Commodities,
            Market::Usa,
            Market::Etf,
            Market::Currencies,
            Market::EtfMoex,
            Market::Spb,
            Market::CryptoCurrencies,
        ]
    }

    /// Provider market code
    pub fn code(&self) -> i32 {
        match self {
            Market::Shares => 1,
            Market::Bonds => 2,
            Market::CurrenciesWorld => 5,
            Market::Indexes => 6,
            Market::FuturesUsa => 7,
            Market::Futures => 14,
            Market::FuturesArchive => 17,
            Market::Commodities => 24,
            Market::Usa => 25,
            Market::Etf => 28,
            Market::Currencies => 45,
            Market::EtfMoex => 515,
            Market::Spb => 517,
            Market::CryptoCurrencies => 520,
        }
    }

    /// Look up a known market by its code
    pub fn from_code(code: i32) -> Option<Market> {
        Market::all().iter().copied().find(|m| m.code() == code)
    }

    fn name(&self) -> &'static str {
        match self {
            Market::Shares => "shares",
            Market::Bonds => "bonds",
            Market::CurrenciesWorld => "currencies-world",
            Market::Indexes => "indexes",
            Market::FuturesUsa => "futures-usa",
            Market::Futures => "futures",
            Market::FuturesArchive => "futures-archive",
            Market::Commodities => "commodities",
            Market::Usa => "usa",
            Market::Etf => "etf",
            Market::Currencies => "currencies",
            Market::EtfMoex => "etf-moex",
            Market::Spb => "spb",
            Market::CryptoCurrencies => "crypto-currencies",
        }
    }
}

impl From<Market> for i32 {
    fn from(market: Market) -> Self {
        market.code()
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        if let Some(market) = Market::all().iter().find(|m| m.name() == normalized) {
            return Ok(*market);
        }
        normalized
            .parse::<i32>()
            .ok()
            .and_then(Market::from_code)
            .ok_or_else(|| format!("Invalid market: {s}"))
    }
}

/// Column layout of a provider response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowSchema {
    /// `<TICKER>;<PER>;<DATE>;<TIME>;<LAST>;<VOL>`
    Ticks,
    /// `<DATE>;<TIME>;<OPEN>;<HIGH>;<LOW>;<CLOSE>;<VOL>`
    Candles,
}

impl RowSchema {
    /// Header line the provider emits for this schema
    pub fn header(&self) -> &'static str {
        match self {
            RowSchema::Ticks => "<TICKER>;<PER>;<DATE>;<TIME>;<LAST>;<VOL>",
            RowSchema::Candles => "<DATE>;<TIME>;<OPEN>;<HIGH>;<LOW>;<CLOSE>;<VOL>",
        }
    }

    /// Header column names in order
    pub fn columns(&self) -> Vec<&'static str> {
        self.header().split(';').collect()
    }
}

/// Single trade from a tick-level response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tick {
    /// Instrument ticker as reported by the provider
    pub ticker: String,
    /// Period column (always `0` for ticks)
    pub period: String,
    /// Trade time (provider local time)
    pub timestamp: NaiveDateTime,
    /// Trade price
    pub last: Decimal,
    /// Trade volume
    pub volume: Decimal,
}

/// OHLCV candle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    /// Candle time (provider local time)
    pub timestamp: NaiveDateTime,
    /// Open price
    pub open: Decimal,
    /// High price
    pub high: Decimal,
    /// Low price
    pub low: Decimal,
    /// Close price
    pub close: Decimal,
    /// Volume
    pub volume: Decimal,
}

impl Candle {
    /// Validate candle data integrity
    pub fn validate(&self) -> Result<(), String> {
        if self.high < self.open || self.high < self.close {
            return Err(format!(
                "High ({}) must be >= open ({}) and close ({})",
                self.high, self.open, self.close
            ));
        }

        if self.low > self.open || self.low > self.close {
            return Err(format!(
                "Low ({}) must be <= open ({}) and close ({})",
                self.low, self.open, self.close
            ));
        }

        if self.volume < Decimal::ZERO {
            return Err(format!("Volume must be non-negative, got {}", self.volume));
        }

        Ok(())
    }
}

/// Ordered rows for one timeframe schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schema", content = "rows", rename_all = "lowercase")]
pub enum Dataset {
    /// Tick rows
    Ticks(Vec<Tick>),
    /// Candle rows
    Candles(Vec<Candle>),
}

impl Dataset {
    /// Empty dataset with the schema of `timeframe`
    pub fn empty_for(timeframe: Timeframe) -> Self {
        match timeframe.schema() {
            RowSchema::Ticks => Dataset::Ticks(Vec::new()),
            RowSchema::Candles => Dataset::Candles(Vec::new()),
        }
    }

    /// Schema of the rows
    pub fn schema(&self) -> RowSchema {
        match self {
            Dataset::Ticks(_) => RowSchema::Ticks,
            Dataset::Candles(_) => RowSchema::Candles,
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        match self {
            Dataset::Ticks(rows) => rows.len(),
            Dataset::Candles(rows) => rows.len(),
        }
    }

    /// Whether the dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append the rows of `other`, keeping their order
    ///
    /// Fails if the two datasets have different schemas.
    pub fn append(&mut self, other: Dataset) -> Result<(), String> {
        match (self, other) {
            (Dataset::Ticks(rows), Dataset::Ticks(more)) => {
                rows.extend(more);
                Ok(())
            }
            (Dataset::Candles(rows), Dataset::Candles(more)) => {
                rows.extend(more);
                Ok(())
            }
            (this, other) => Err(format!(
                "Cannot append {:?} rows to {:?} dataset",
                other.schema(),
                this.schema()
            )),
        }
    }
}
