//! Retry and abort behavior on provider-reported failures

use finam_data_downloader::downloader::{DownloadJob, ResponseError};
use finam_data_downloader::fetcher::FetcherError;
use finam_data_downloader::{DownloadError, Market, Timeframe};
use std::sync::Arc;
use std::time::Duration;

use crate::support::{
    date, exporter, ScriptedFetcher, CANDLE_HEADER, IN_PROGRESS, THROTTLED, TICK_HEADER, TOO_LONG,
};

fn daily_job(max_retries: u32) -> DownloadJob {
    DownloadJob::new(16842, Market::Shares, Timeframe::Daily)
        .with_start_date(date(2020, 1, 1))
        .with_end_date(date(2020, 3, 31))
        .with_max_retries(max_retries)
}

#[tokio::test(start_paused = true)]
async fn test_in_progress_is_retried_until_table_arrives() {
    let data = Arc::new(ScriptedFetcher::ok([
        IN_PROGRESS.to_string(),
        IN_PROGRESS.to_string(),
        format!("{CANDLE_HEADER}\n20200103;000000;1;2;0.5;1.5;10\n"),
    ]));
    let (exporter, _meta) = exporter(data.clone());

    let dataset = exporter.download(&daily_job(5)).await.unwrap();

    assert_eq!(data.call_count(), 3);
    assert_eq!(dataset.len(), 1);
    let times = data.times();
    assert!(times[1] - times[0] >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_retry_budget_allows_one_extra_attempt() {
    // max_retries = 2 tolerates three "in progress" answers
    let data = Arc::new(ScriptedFetcher::ok([
        IN_PROGRESS.to_string(),
        IN_PROGRESS.to_string(),
        IN_PROGRESS.to_string(),
        CANDLE_HEADER.to_string(),
    ]));
    let (exporter, _meta) = exporter(data.clone());

    let dataset = exporter.download(&daily_job(2)).await.unwrap();

    assert_eq!(data.call_count(), 4);
    assert!(dataset.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_retry_budget_exhausted() {
    let data = Arc::new(ScriptedFetcher::ok(vec![IN_PROGRESS; 10]));
    let (exporter, _meta) = exporter(data.clone());

    let err = exporter.download(&daily_job(2)).await.unwrap_err();

    assert!(matches!(
        err,
        DownloadError::Response(ResponseError::AlreadyInProgress)
    ));
    assert_eq!(data.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_zero_retries_still_retries_once() {
    let data = Arc::new(ScriptedFetcher::ok([IN_PROGRESS, CANDLE_HEADER]));
    let (exporter, _meta) = exporter(data.clone());

    exporter.download(&daily_job(0)).await.unwrap();
    assert_eq!(data.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_throttled_aborts_remaining_chunks() {
    let data = Arc::new(ScriptedFetcher::ok([
        format!("{TICK_HEADER}\nSBER;0;20200103;100000;255.99;10\n"),
        THROTTLED.to_string(),
        format!("{TICK_HEADER}\nSBER;0;20200105;100000;255.99;10\n"),
    ]));
    let (exporter, _meta) = exporter(data.clone());

    let job = DownloadJob::new(3, Market::Shares, Timeframe::Ticks)
        .with_start_date(date(2020, 1, 3))
        .with_end_date(date(2020, 1, 5));
    let err = exporter.download(&job).await.unwrap_err();

    assert!(matches!(err, DownloadError::Response(ResponseError::Throttled)));
    assert_eq!(data.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_range_too_long_is_not_retried() {
    let data = Arc::new(ScriptedFetcher::ok([TOO_LONG, CANDLE_HEADER]));
    let (exporter, _meta) = exporter(data.clone());

    let err = exporter.download(&daily_job(10)).await.unwrap_err();

    assert!(matches!(err, DownloadError::Response(ResponseError::RangeTooLong)));
    assert_eq!(data.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_html_error_page_is_malformed() {
    let data = Arc::new(ScriptedFetcher::ok(["<html><body>Service unavailable</body></html>"]));
    let (exporter, _meta) = exporter(data.clone());

    let err = exporter.download(&daily_job(10)).await.unwrap_err();

    assert!(matches!(err, DownloadError::Response(ResponseError::Malformed(_))));
    assert_eq!(data.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_aborts_without_retry() {
    let data = Arc::new(ScriptedFetcher::new([
        Err(FetcherError::Status {
            status: 503,
            url: "http://export.finam.ru/table.csv".to_string(),
        }),
        Ok(CANDLE_HEADER.to_string()),
    ]));
    let (exporter, _meta) = exporter(data.clone());

    let err = exporter.download(&daily_job(10)).await.unwrap_err();

    assert!(matches!(err, DownloadError::Fetch(FetcherError::Status { status: 503, .. })));
    assert_eq!(data.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unparseable_row_fails_download() {
    let data = Arc::new(ScriptedFetcher::ok([format!(
        "{CANDLE_HEADER}\n20200103;000000;abc;2;0.5;1.5;10\n"
    )]));
    let (exporter, _meta) = exporter(data);

    let err = exporter.download(&daily_job(10)).await.unwrap_err();
    assert!(matches!(err, DownloadError::Payload(_)));
}
