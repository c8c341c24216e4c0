//! Integration tests for logging and tracing

use finam_data_downloader::downloader::DownloadJob;
use finam_data_downloader::{Market, Timeframe};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::support::{date, exporter, ScriptedFetcher, CANDLE_HEADER, IN_PROGRESS};

#[test]
fn test_tracing_subscriber_initialization() {
    // may already be installed by another test in this binary
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("finam_data_downloader=debug")),
        )
        .with_test_writer()
        .try_init();
}

#[test]
fn test_tracing_json_format() {
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new("finam_data_downloader=info"))
        .with_test_writer()
        .try_init();
}

#[tokio::test(start_paused = true)]
async fn test_download_with_retries_logs_without_panicking() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("finam_data_downloader=trace"))
        .with_test_writer()
        .try_init();

    let data = Arc::new(ScriptedFetcher::ok([IN_PROGRESS, CANDLE_HEADER]));
    let (exporter, _meta) = exporter(data);
    let job = DownloadJob::new(3, Market::Shares, Timeframe::Daily)
        .with_start_date(date(2021, 1, 1))
        .with_end_date(date(2021, 1, 10));

    assert!(exporter.download(&job).await.is_ok());
}
