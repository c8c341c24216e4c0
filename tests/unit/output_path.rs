//! Unit tests for output path generation

use finam_data_downloader::output::OutputPathBuilder;
use finam_data_downloader::{DateRange, Timeframe};
use std::path::PathBuf;

use crate::support::date;

fn range() -> DateRange {
    DateRange::new(date(2020, 1, 1), date(2020, 1, 31)).unwrap()
}

#[test]
fn test_known_market_uses_name() {
    let path = OutputPathBuilder::new(PathBuf::from("/data"), 14, "RIH0")
        .with_timeframe(Timeframe::Minutes5)
        .with_range(range())
        .build()
        .unwrap();
    assert_eq!(path, PathBuf::from("/data/futures/RIH0/RIH0-5m-2020-01-01-2020-01-31.csv"));
}

#[test]
fn test_unknown_market_uses_code() {
    let path = OutputPathBuilder::new(PathBuf::from("/data"), 91, "XAU")
        .with_timeframe(Timeframe::Monthly)
        .with_range(range())
        .build()
        .unwrap();
    assert_eq!(path, PathBuf::from("/data/91/XAU/XAU-1M-2020-01-01-2020-01-31.csv"));
}

#[test]
fn test_code_cannot_escape_root() {
    let path = OutputPathBuilder::new(PathBuf::from("/data"), 1, "../etc")
        .with_timeframe(Timeframe::Daily)
        .with_range(range())
        .build()
        .unwrap();
    assert!(path.starts_with("/data/shares"));
    assert!(!path.to_string_lossy().contains(".."));
}

#[test]
fn test_missing_timeframe_is_an_error() {
    let result = OutputPathBuilder::new(PathBuf::from("/data"), 1, "GAZP")
        .with_range(range())
        .build();
    assert!(result.is_err());
}
