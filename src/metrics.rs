//! Observability metrics for export downloads
//!
//! Metrics are always recorded through the `metrics` facade. Without an
//! installed recorder they are no-ops; `init_metrics` installs a Prometheus
//! exporter serving a scrape endpoint.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<RwLock<bool>> = Lazy::new(|| RwLock::new(false));

/// Correlation ID generator for request tracing
static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Initialize metrics system with Prometheus exporter
///
/// Idempotent: later calls are no-ops.
///
/// # Arguments
/// * `addr` - Socket address to bind the scrape endpoint (e.g., "0.0.0.0:9090")
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "export_requests_total",
        Unit::Count,
        "Total number of export requests by outcome"
    );

    describe_histogram!(
        "export_request_duration_seconds",
        Unit::Seconds,
        "Export request duration in seconds"
    );

    describe_counter!(
        "export_in_progress_retries_total",
        Unit::Count,
        "Retries caused by the provider's already-processing answer"
    );

    describe_counter!(
        "export_chunks_completed_total",
        Unit::Count,
        "Chunks downloaded and parsed"
    );

    describe_counter!(
        "export_downloads_failed_total",
        Unit::Count,
        "Downloads aborted with an error"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Check if metrics system is initialized
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Timing and outcome of one export request
pub struct ExportRequestMetrics {
    timeframe: String,
    start_time: Instant,
    correlation_id: String,
    attempt: u32,
}

impl ExportRequestMetrics {
    /// Start recording a request
    pub fn start(timeframe: impl Into<String>, attempt: u32) -> Self {
        let timeframe = timeframe.into();
        let correlation_id = generate_correlation_id();

        debug!(
            correlation_id = %correlation_id,
            timeframe = %timeframe,
            attempt = attempt,
            "Starting export request"
        );

        Self {
            timeframe,
            start_time: Instant::now(),
            correlation_id,
            attempt,
        }
    }

    /// Record the request's outcome (`success`, `in_progress`, `throttled`, ...)
    pub fn record(&self, outcome: &'static str) {
        let duration = self.start_time.elapsed();

        counter!(
            "export_requests_total",
            "timeframe" => self.timeframe.clone(),
            "outcome" => outcome,
        )
        .increment(1);

        histogram!(
            "export_request_duration_seconds",
            "timeframe" => self.timeframe.clone(),
        )
        .record(duration.as_secs_f64());

        debug!(
            correlation_id = %self.correlation_id,
            timeframe = %self.timeframe,
            attempt = self.attempt,
            outcome = outcome,
            duration_ms = duration.as_millis(),
            "Export request finished"
        );
    }

    /// Get the correlation ID for this request
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record a retry after an already-processing answer
pub fn record_in_progress_retry(chunk: usize, retry: u32) {
    counter!("export_in_progress_retries_total").increment(1);
    debug!(chunk = chunk, retry = retry, "In-progress retry recorded");
}

/// Download job metrics
pub struct DownloadMetrics {
    timeframe: String,
    instrument: String,
    start_time: Instant,
}

impl DownloadMetrics {
    /// Start tracking a download
    pub fn start(timeframe: impl Into<String>, instrument: impl Into<String>) -> Self {
        let timeframe = timeframe.into();
        let instrument = instrument.into();

        info!(
            timeframe = %timeframe,
            instrument = %instrument,
            "Download started"
        );

        Self {
            timeframe,
            instrument,
            start_time: Instant::now(),
        }
    }

    /// Record one completed chunk
    pub fn record_chunk(&self, rows: usize) {
        counter!(
            "export_chunks_completed_total",
            "timeframe" => self.timeframe.clone(),
        )
        .increment(1);

        debug!(instrument = %self.instrument, rows = rows, "Chunk completed");
    }

    /// Record successful download completion
    pub fn record_success(&self, rows: usize) {
        let duration = self.start_time.elapsed();

        info!(
            timeframe = %self.timeframe,
            instrument = %self.instrument,
            rows = rows,
            duration_secs = duration.as_secs(),
            "Download completed successfully"
        );
    }

    /// Record failed download
    pub fn record_failure(&self, error: &str) {
        let duration = self.start_time.elapsed();

        counter!(
            "export_downloads_failed_total",
            "timeframe" => self.timeframe.clone(),
        )
        .increment(1);

        error!(
            timeframe = %self.timeframe,
            instrument = %self.instrument,
            error = %error,
            duration_secs = duration.as_secs(),
            "Download failed"
        );
    }
}
