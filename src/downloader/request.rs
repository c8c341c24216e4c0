//! Export request URLs

use chrono::{Datelike, NaiveDate};
use url::Url;

use crate::catalog::InstrumentRecord;
use crate::interval::DateRange;
use crate::Timeframe;

/// Format parameters sent with every request, in wire order
pub const FORMAT_PARAMS: [(&str, &str); 11] = [
    ("d", "d"),
    ("f", "table"),
    ("e", ".csv"),
    ("dtf", "1"),
    ("tmf", "3"),
    ("MSOR", "0"),
    ("mstime", "on"),
    ("mstimever", "1"),
    ("sep", "3"),
    ("sep2", "1"),
    ("at", "1"),
];

/// `datf` value for tick tables
const DATA_FORMAT_TICKS: &str = "6";
/// `datf` value for candle tables
const DATA_FORMAT_CANDLES: &str = "5";

/// One chunk's export request
#[derive(Debug, Clone)]
pub struct ExportRequest<'a> {
    /// Resolved instrument
    pub instrument: &'a InstrumentRecord,
    /// Timeframe
    pub timeframe: Timeframe,
    /// Chunk boundaries
    pub range: DateRange,
    /// Ask the provider to fill periods without trades
    pub fill_empty: bool,
}

impl ExportRequest<'_> {
    /// Per-chunk query parameters, in wire order
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("p", self.timeframe.code().to_string()),
            ("em", self.instrument.id.to_string()),
            ("market", self.instrument.market.to_string()),
        ];
        params.extend(date_params(["df", "mf", "yf"], self.range.start));
        params.extend(date_params(["dt", "mt", "yt"], self.range.end));
        params.extend([
            ("cn", self.instrument.code.clone()),
            ("code", self.instrument.code.clone()),
            ("datf", self.data_format().to_string()),
            ("fsp", u8::from(self.fill_empty).to_string()),
        ]);
        params
    }

    /// Full URL on `export_host`
    ///
    /// # Errors
    ///
    /// Fails if `export_host` does not form a valid URL.
    pub fn url(&self, export_host: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!("http://{export_host}/table.csv"))?;
        url.query_pairs_mut()
            .extend_pairs(FORMAT_PARAMS)
            .extend_pairs(self.params());
        Ok(url)
    }

    fn data_format(&self) -> &'static str {
        if self.timeframe.is_ticks() {
            DATA_FORMAT_TICKS
        } else {
            DATA_FORMAT_CANDLES
        }
    }
}

// month is zero-based on the wire
fn date_params(keys: [&'static str; 3], date: NaiveDate) -> [(&'static str, String); 3] {
    [
        (keys[0], date.day().to_string()),
        (keys[1], date.month0().to_string()),
        (keys[2], date.year().to_string()),
    ]
}
