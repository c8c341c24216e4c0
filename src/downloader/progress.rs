//! Progress reporting hooks for chunked downloads
//!
//! The exporter calls a [`DownloadObserver`] as it moves through the chunks of
//! a job. The CLI uses it to drive a progress bar; library users can plug in
//! their own reporting or leave the default no-op.

use crate::interval::DateRange;

/// Receives chunk-level progress events
///
/// All methods default to doing nothing. Calls happen on the downloading task,
/// in chunk order.
pub trait DownloadObserver: Send + Sync {
    /// Download planned `total` chunks
    fn on_plan(&self, _total: usize) {}

    /// Chunk `index` (0-based) is about to be requested
    fn on_chunk_start(&self, _index: usize, _range: &DateRange) {}

    /// Chunk `index` got an already-processing answer; `retry` is 1-based
    fn on_retry(&self, _index: usize, _retry: u32) {}

    /// Chunk `index` was parsed into `rows` rows
    fn on_chunk_complete(&self, _index: usize, _rows: usize) {}
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl DownloadObserver for NoopObserver {}
