//! Tick downloads: one request per day with pacing between requests

use finam_data_downloader::downloader::DownloadJob;
use finam_data_downloader::{Dataset, Market, Timeframe};
use std::sync::Arc;
use std::time::Duration;

use crate::support::{date, exporter, query_param, ScriptedFetcher, TICK_HEADER};

#[tokio::test(start_paused = true)]
async fn test_three_days_of_ticks_are_three_paced_requests() {
    let data = Arc::new(ScriptedFetcher::ok([
        format!("{TICK_HEADER}\nSBER;0;20200103;95959;255.99;10\nSBER;0;20200103;100000;256.01;3\n"),
        // weekend: provider answers with an empty body
        String::new(),
        format!("{TICK_HEADER}\nSBER;0;20200105;100001;257.00;1\n"),
    ]));
    let (exporter, _meta) = exporter(data.clone());

    let job = DownloadJob::new(3, Market::Shares, Timeframe::Ticks)
        .with_start_date(date(2020, 1, 3))
        .with_end_date(date(2020, 1, 5))
        .with_delay_secs(2);
    let dataset = exporter.download(&job).await.unwrap();

    let urls = data.urls();
    assert_eq!(urls.len(), 3);
    for (url, day) in urls.iter().zip(["3", "4", "5"]) {
        assert_eq!(query_param(url, "df").as_deref(), Some(day));
        assert_eq!(query_param(url, "dt").as_deref(), Some(day));
        assert_eq!(query_param(url, "p").as_deref(), Some("1"));
        assert_eq!(query_param(url, "datf").as_deref(), Some("6"));
    }

    let times = data.times();
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(2));
    }

    let Dataset::Ticks(rows) = dataset else {
        panic!("expected ticks");
    };
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].ticker, "SBER");
    assert_eq!(rows[0].timestamp, date(2020, 1, 3).and_hms_opt(9, 59, 59).unwrap());
    assert_eq!(rows[2].timestamp, date(2020, 1, 5).and_hms_opt(10, 0, 1).unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_empty_day_gives_empty_tick_dataset() {
    let data = Arc::new(ScriptedFetcher::ok([""]));
    let (exporter, _meta) = exporter(data);

    let job = DownloadJob::new(3, Market::Shares, Timeframe::Ticks)
        .with_start_date(date(2020, 1, 4))
        .with_end_date(date(2020, 1, 4));
    let dataset = exporter.download(&job).await.unwrap();

    assert_eq!(dataset, Dataset::Ticks(Vec::new()));
}

#[tokio::test(start_paused = true)]
async fn test_fill_empty_flag_is_forwarded() {
    let data = Arc::new(ScriptedFetcher::ok([""]));
    let (exporter, _meta) = exporter(data.clone());

    let job = DownloadJob::new(3, Market::Shares, Timeframe::Ticks)
        .with_start_date(date(2020, 1, 4))
        .with_end_date(date(2020, 1, 4))
        .with_fill_empty(true);
    exporter.download(&job).await.unwrap();

    assert_eq!(query_param(&data.urls()[0], "fsp").as_deref(), Some("1"));
}
