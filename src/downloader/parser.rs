//! Parsing of `;`-delimited export tables into typed rows

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

use crate::{Candle, Dataset, RowSchema, Tick, Timeframe};

const DATE_FORMAT: &str = "%Y%m%d";
const TIME_FORMAT: &str = "%H%M%S";

/// Table text could not be turned into rows
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// Header lacks a column required by the schema
    #[error("missing column {column} in header")]
    MissingColumn {
        /// Column name, e.g. `<CLOSE>`
        column: &'static str,
    },

    /// A record could not be read or converted
    #[error("record {record}: {message}")]
    InvalidRecord {
        /// 1-based data record number (header excluded)
        record: u64,
        /// What went wrong
        message: String,
    },

    /// Table structure is broken
    #[error("invalid table: {0}")]
    Table(String),
}

/// Column positions resolved from the header
struct Columns(Vec<usize>);

impl Columns {
    fn resolve(headers: &StringRecord, schema: RowSchema) -> Result<Self, PayloadError> {
        schema
            .columns()
            .into_iter()
            .map(|column| {
                headers
                    .iter()
                    .position(|h| h == column)
                    .ok_or(PayloadError::MissingColumn { column })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Columns)
    }

    fn field<'r>(&self, record: &'r StringRecord, idx: usize) -> &'r str {
        record.get(self.0[idx]).unwrap_or_default()
    }
}

/// Parse table text into a dataset with the timeframe's schema
///
/// Columns are located by header name, so extra or reordered columns are fine.
/// A header-only table yields an empty dataset.
///
/// # Errors
///
/// [`PayloadError`] naming the offending record on missing columns, uneven
/// field counts or values that are not dates, times or decimals.
pub fn parse_payload(text: &str, timeframe: Timeframe) -> Result<Dataset, PayloadError> {
    let schema = timeframe.schema();
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| PayloadError::Table(e.to_string()))?
        .clone();
    let columns = Columns::resolve(&headers, schema)?;

    let mut dataset = Dataset::empty_for(timeframe);
    for (idx, result) in reader.records().enumerate() {
        let number = idx as u64 + 1;
        let record = result.map_err(|e| invalid(number, e.to_string()))?;
        match &mut dataset {
            Dataset::Ticks(rows) => rows.push(parse_tick(&columns, &record, number)?),
            Dataset::Candles(rows) => rows.push(parse_candle(&columns, &record, number)?),
        }
    }

    debug!(rows = dataset.len(), timeframe = %timeframe, "Parsed payload");
    Ok(dataset)
}

fn invalid(record: u64, message: impl Into<String>) -> PayloadError {
    PayloadError::InvalidRecord {
        record,
        message: message.into(),
    }
}

// Column order follows RowSchema::Ticks: TICKER, PER, DATE, TIME, LAST, VOL
fn parse_tick(columns: &Columns, record: &StringRecord, number: u64) -> Result<Tick, PayloadError> {
    Ok(Tick {
        ticker: columns.field(record, 0).to_string(),
        period: columns.field(record, 1).to_string(),
        timestamp: parse_timestamp(columns.field(record, 2), columns.field(record, 3), number)?,
        last: parse_decimal(columns.field(record, 4), "<LAST>", number)?,
        volume: parse_decimal(columns.field(record, 5), "<VOL>", number)?,
    })
}

// Column order follows RowSchema::Candles: DATE, TIME, OPEN, HIGH, LOW, CLOSE, VOL
fn parse_candle(columns: &Columns, record: &StringRecord, number: u64) -> Result<Candle, PayloadError> {
    Ok(Candle {
        timestamp: parse_timestamp(columns.field(record, 0), columns.field(record, 1), number)?,
        open: parse_decimal(columns.field(record, 2), "<OPEN>", number)?,
        high: parse_decimal(columns.field(record, 3), "<HIGH>", number)?,
        low: parse_decimal(columns.field(record, 4), "<LOW>", number)?,
        close: parse_decimal(columns.field(record, 5), "<CLOSE>", number)?,
        volume: parse_decimal(columns.field(record, 6), "<VOL>", number)?,
    })
}

fn parse_timestamp(date: &str, time: &str, number: u64) -> Result<NaiveDateTime, PayloadError> {
    let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|e| invalid(number, format!("invalid date {date:?}: {e}")))?;

    // times before 10:00 may come without the leading zero
    let padded = format!("{time:0>6}");
    let time = NaiveTime::parse_from_str(&padded, TIME_FORMAT)
        .map_err(|e| invalid(number, format!("invalid time {time:?}: {e}")))?;

    Ok(date.and_time(time))
}

fn parse_decimal(value: &str, column: &str, number: u64) -> Result<Decimal, PayloadError> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|_| invalid(number, format!("invalid {column} value {value:?}")))
}
