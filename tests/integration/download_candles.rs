//! End-to-end candle downloads against a scripted export service

use finam_data_downloader::downloader::DownloadJob;
use finam_data_downloader::interval::IntervalError;
use finam_data_downloader::output::{CsvDatasetWriter, DatasetWriter, OutputPathBuilder};
use finam_data_downloader::{Dataset, DateRange, DownloadError, Market, Timeframe};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;

use crate::support::{date, exporter, query_param, ScriptedFetcher, CANDLE_HEADER};

fn daily_body() -> String {
    format!(
        "{CANDLE_HEADER}\n\
         20200103;000000;155.99;158.19;153.70;155.00;35816990\n\
         20200106;000000;154.75;154.84;151.40;153.90;22156620\n"
    )
}

#[tokio::test(start_paused = true)]
async fn test_daily_year_is_a_single_request() {
    let data = Arc::new(ScriptedFetcher::ok([daily_body()]));
    let (exporter, _meta) = exporter(data.clone());

    let job = DownloadJob::new(16842, Market::Shares, Timeframe::Daily)
        .with_start_date(date(2020, 1, 1))
        .with_end_date(date(2020, 12, 31));
    let dataset = exporter.download(&job).await.unwrap();

    assert_eq!(data.call_count(), 1);
    let Dataset::Candles(rows) = dataset else {
        panic!("expected candles");
    };
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].open, Decimal::from_str("155.99").unwrap());
    assert_eq!(rows[1].timestamp, date(2020, 1, 6).and_hms_opt(0, 0, 0).unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_request_carries_instrument_and_zero_based_months() {
    let data = Arc::new(ScriptedFetcher::ok([daily_body()]));
    let (exporter, _meta) = exporter(data.clone());

    let job = DownloadJob::new(16842, 1, Timeframe::Daily)
        .with_start_date(date(2020, 1, 1))
        .with_end_date(date(2020, 12, 31));
    exporter.download(&job).await.unwrap();

    let url = &data.urls()[0];
    assert!(url.starts_with("http://export.finam.ru/table.csv?"));
    assert_eq!(query_param(url, "em").as_deref(), Some("16842"));
    assert_eq!(query_param(url, "market").as_deref(), Some("1"));
    assert_eq!(query_param(url, "code").as_deref(), Some("GAZP"));
    assert_eq!(query_param(url, "cn").as_deref(), Some("GAZP"));
    assert_eq!(query_param(url, "p").as_deref(), Some("8"));
    assert_eq!(query_param(url, "df").as_deref(), Some("1"));
    assert_eq!(query_param(url, "mf").as_deref(), Some("0"));
    assert_eq!(query_param(url, "yf").as_deref(), Some("2020"));
    assert_eq!(query_param(url, "dt").as_deref(), Some("31"));
    assert_eq!(query_param(url, "mt").as_deref(), Some("11"));
    assert_eq!(query_param(url, "yt").as_deref(), Some("2020"));
    assert_eq!(query_param(url, "datf").as_deref(), Some("5"));
    assert_eq!(query_param(url, "fsp").as_deref(), Some("0"));
    assert_eq!(query_param(url, "sep").as_deref(), Some("3"));
}

#[tokio::test(start_paused = true)]
async fn test_hourly_range_is_split_per_year_in_order() {
    let first = format!("{CANDLE_HEADER}\n20190110;100000;1;2;0.5;1.5;10\n");
    let second = format!("{CANDLE_HEADER}\n20200110;100000;2;3;1.5;2.5;20\n");
    let data = Arc::new(ScriptedFetcher::ok([first, second]));
    let (exporter, _meta) = exporter(data.clone());

    let job = DownloadJob::new(175924, Market::Futures, Timeframe::Hourly)
        .with_start_date(date(2019, 1, 1))
        .with_end_date(date(2020, 6, 30));
    let dataset = exporter.download(&job).await.unwrap();

    let urls = data.urls();
    assert_eq!(urls.len(), 2);
    assert_eq!(query_param(&urls[0], "yf").as_deref(), Some("2019"));
    assert_eq!(query_param(&urls[1], "yf").as_deref(), Some("2020"));
    assert_eq!(query_param(&urls[1], "mt").as_deref(), Some("5"));

    let Dataset::Candles(rows) = dataset else {
        panic!("expected candles");
    };
    assert_eq!(rows.len(), 2);
    assert!(rows[0].timestamp < rows[1].timestamp);
}

#[tokio::test(start_paused = true)]
async fn test_catalog_is_loaded_once_across_downloads() {
    let data = Arc::new(ScriptedFetcher::ok([daily_body(), daily_body()]));
    let (exporter, meta) = exporter(data.clone());

    let job = DownloadJob::new(3, 1, Timeframe::Daily)
        .with_start_date(date(2020, 1, 1))
        .with_end_date(date(2020, 1, 31));
    exporter.download(&job).await.unwrap();
    exporter.download(&job).await.unwrap();

    // landing page plus metadata script
    assert_eq!(meta.calls(), 2);
    assert_eq!(data.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_downloaded_candles_written_to_csv() {
    let data = Arc::new(ScriptedFetcher::ok([daily_body()]));
    let (exporter, _meta) = exporter(data);
    let range = DateRange::new(date(2020, 1, 1), date(2020, 1, 31)).unwrap();

    let job = DownloadJob::new(16842, 1, Timeframe::Daily)
        .with_start_date(range.start)
        .with_end_date(range.end);
    let dataset = exporter.download(&job).await.unwrap();

    let dir = TempDir::new().unwrap();
    let path = OutputPathBuilder::new(dir.path().to_path_buf(), 1, "GAZP")
        .with_timeframe(Timeframe::Daily)
        .with_range(range)
        .build()
        .unwrap();
    let mut writer = CsvDatasetWriter::new(&path).unwrap();
    writer.write_dataset(&dataset).unwrap();
    writer.close().unwrap();

    assert!(path.ends_with("shares/GAZP/GAZP-1d-2020-01-01-2020-01-31.csv"));
    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines[0], "timestamp,open,high,low,close,volume");
    assert_eq!(lines[1], "2020-01-03 00:00:00,155.99,158.19,153.70,155.00,35816990");
    assert_eq!(lines.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_inverted_range_fails_before_any_request() {
    let data = Arc::new(ScriptedFetcher::ok([daily_body()]));
    let (exporter, meta) = exporter(data.clone());

    let job = DownloadJob::new(16842, Market::Shares, Timeframe::Daily)
        .with_start_date(date(2020, 1, 5))
        .with_end_date(date(2020, 1, 1));
    let err = exporter.download(&job).await.unwrap_err();

    assert!(matches!(
        err,
        DownloadError::Interval(IntervalError::InvalidRange { .. })
    ));
    assert_eq!(meta.calls(), 0);
    assert_eq!(data.call_count(), 0);
}
