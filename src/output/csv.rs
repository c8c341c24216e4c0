//! CSV output writer

use crate::{Candle, Tick};
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use super::{DatasetWriter, OutputError, OutputResult};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// Rows between periodic flushes
const FLUSH_INTERVAL: u64 = 1000;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// CSV record for a tick
#[derive(Debug, Serialize)]
struct TickRecord<'a> {
    ticker: &'a str,
    period: &'a str,
    timestamp: String,
    last: String,
    volume: String,
}

impl<'a> From<&'a Tick> for TickRecord<'a> {
    fn from(tick: &'a Tick) -> Self {
        Self {
            ticker: &tick.ticker,
            period: &tick.period,
            timestamp: tick.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            last: tick.last.to_string(),
            volume: tick.volume.to_string(),
        }
    }
}

/// CSV record for a candle
#[derive(Debug, Serialize)]
struct CandleRecord {
    timestamp: String,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: String,
}

impl From<&Candle> for CandleRecord {
    fn from(candle: &Candle) -> Self {
        Self {
            timestamp: candle.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            open: candle.open.to_string(),
            high: candle.high.to_string(),
            low: candle.low.to_string(),
            close: candle.close.to_string(),
            volume: candle.volume.to_string(),
        }
    }
}

/// Comma-separated writer for downloaded datasets
///
/// The header row is written with the first record, so an empty dataset
/// produces an empty file.
pub struct CsvDatasetWriter {
    writer: Writer<BufWriter<File>>,
    rows_written: u64,
}

impl CsvDatasetWriter {
    /// Create a writer, creating parent directories as needed
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        Self::new_with_buffer_size(path, DEFAULT_BUFFER_SIZE)
    }

    /// Create a writer with a custom buffer size in bytes
    pub fn new_with_buffer_size<P: AsRef<Path>>(path: P, buffer_size: usize) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating CSV writer: path={}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {}", e)))?;
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {}", e)))?;

        let buf_writer = BufWriter::with_capacity(buffer_size, file);

        Ok(Self {
            writer: Writer::from_writer(buf_writer),
            rows_written: 0,
        })
    }

    /// Get number of rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    fn write_record<R: Serialize>(&mut self, record: R) -> OutputResult<()> {
        self.writer
            .serialize(record)
            .map_err(|e| OutputError::CsvError(format!("Failed to write row: {}", e)))?;

        self.rows_written += 1;
        if self.rows_written % FLUSH_INTERVAL == 0 {
            self.flush()?;
            debug!("Progress: {} rows written", self.rows_written);
        }
        Ok(())
    }
}

impl DatasetWriter for CsvDatasetWriter {
    fn write_tick(&mut self, tick: &Tick) -> OutputResult<()> {
        self.write_record(TickRecord::from(tick))
    }

    fn write_candle(&mut self, candle: &Candle) -> OutputResult<()> {
        self.write_record(CandleRecord::from(candle))
    }

    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
    }

    fn close(mut self) -> OutputResult<()> {
        debug!("Closing CSV writer: {} total rows written", self.rows_written);

        self.flush()?;

        let buf_writer = self.writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get inner writer: {}", e))
        })?;

        let file = buf_writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get file handle: {}", e))
        })?;

        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {}", e)))?;

        info!("CSV writer closed successfully: {} rows written", self.rows_written);
        Ok(())
    }
}
