//! Unit tests for catalog query matching

use finam_data_downloader::{InstrumentRecord, LookupComparator, LookupQuery};

fn record(id: i64, name: &str, code: &str, market: i32) -> InstrumentRecord {
    InstrumentRecord {
        id,
        name: name.to_string(),
        code: code.to_string(),
        market,
    }
}

#[test]
fn test_fields_are_and_combined() {
    let gazp = record(16842, "Газпром", "GAZP", 1);
    let query = LookupQuery::new().code("GAZP").market(14);
    assert!(!query.matches(&gazp));

    let query = LookupQuery::new().code("GAZP").market(1);
    assert!(query.matches(&gazp));
}

#[test]
fn test_values_are_or_combined() {
    let query = LookupQuery::new().codes(["SBER", "GAZP"]);
    assert!(query.matches(&record(3, "Сбербанк", "SBER", 1)));
    assert!(query.matches(&record(16842, "Газпром", "GAZP", 1)));
    assert!(!query.matches(&record(7, "Лукойл", "LKOH", 1)));
}

#[test]
fn test_code_comparator() {
    let ri = record(175924, "RTS-3.20", "RIH0", 14);

    assert!(!LookupQuery::new().code("RI").matches(&ri));
    assert!(LookupQuery::new()
        .code("RI")
        .code_comparator(LookupComparator::StartsWith)
        .matches(&ri));
}

#[test]
fn test_name_contains_by_default() {
    let query = LookupQuery::new().name("3.20");
    assert_eq!(query.name_comparator, LookupComparator::Contains);
    assert!(query.matches(&record(175924, "RTS-3.20", "RIH0", 14)));
}

#[test]
fn test_comparator_parsing() {
    assert_eq!("starts-with".parse::<LookupComparator>().unwrap(), LookupComparator::StartsWith);
    assert_eq!("EQUALS".parse::<LookupComparator>().unwrap(), LookupComparator::Equals);
    assert!("like".parse::<LookupComparator>().is_err());
}
