//! Dataset output writers

use crate::{Candle, Dataset, Tick};

pub mod csv;
pub mod path;

pub use self::csv::CsvDatasetWriter;
pub use path::OutputPathBuilder;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),

    /// Missing or invalid writer configuration
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Sink for downloaded rows
pub trait DatasetWriter {
    /// Write one tick
    fn write_tick(&mut self, tick: &Tick) -> OutputResult<()>;

    /// Write one candle
    fn write_candle(&mut self, candle: &Candle) -> OutputResult<()>;

    /// Write every row of a dataset, in order
    fn write_dataset(&mut self, dataset: &Dataset) -> OutputResult<()> {
        match dataset {
            Dataset::Ticks(rows) => rows.iter().try_for_each(|tick| self.write_tick(tick)),
            Dataset::Candles(rows) => rows.iter().try_for_each(|candle| self.write_candle(candle)),
        }
    }

    /// Flush any buffered data to disk
    fn flush(&mut self) -> OutputResult<()>;

    /// Close the writer and finalize output
    fn close(self) -> OutputResult<()>;
}
