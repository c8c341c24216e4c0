//! Unit tests for date range splitting

use chrono::Duration;
use finam_data_downloader::interval::IntervalError;
use finam_data_downloader::{split_interval, DateRange, Timeframe};

use crate::support::date;

#[test]
fn test_ticks_are_one_day_per_chunk() {
    let chunks = split_interval(date(2020, 2, 27), date(2020, 3, 2), Timeframe::Ticks).unwrap();
    let starts: Vec<_> = chunks.iter().map(|c| c.start).collect();

    assert_eq!(
        starts,
        vec![
            date(2020, 2, 27),
            date(2020, 2, 28),
            date(2020, 2, 29),
            date(2020, 3, 1),
            date(2020, 3, 2)
        ]
    );
    assert!(chunks.iter().all(|c| c.start == c.end));
}

#[test]
fn test_minutes_split_into_year_chunks_with_remainder() {
    let chunks = split_interval(date(2018, 1, 1), date(2020, 6, 30), Timeframe::Minutes5).unwrap();

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0], DateRange::new(date(2018, 1, 1), date(2018, 12, 31)).unwrap());
    assert_eq!(chunks[1], DateRange::new(date(2019, 1, 1), date(2019, 12, 31)).unwrap());
    assert_eq!(chunks[2].start, date(2020, 1, 1));
    assert_eq!(chunks[2].end, date(2020, 6, 30));
}

#[test]
fn test_daily_history_since_2007_is_one_request() {
    let chunks = split_interval(date(2007, 1, 1), date(2026, 10, 15), Timeframe::Daily).unwrap();
    assert_eq!(chunks.len(), 1);
}

#[test]
fn test_chunks_are_contiguous() {
    let chunks = split_interval(date(2001, 3, 15), date(2024, 11, 2), Timeframe::Hourly).unwrap();
    for pair in chunks.windows(2) {
        assert_eq!(pair[0].end + Duration::days(1), pair[1].start);
    }
    assert_eq!(chunks.last().unwrap().end, date(2024, 11, 2));
}

#[test]
fn test_inverted_range_is_rejected() {
    let err = split_interval(date(2020, 1, 2), date(2020, 1, 1), Timeframe::Daily).unwrap_err();
    assert!(matches!(err, IntervalError::InvalidRange { .. }));
}
