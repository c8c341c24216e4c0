//! Provider metadata discovery and parsing
//!
//! The instrument table ships as a JavaScript file whose path changes over
//! time, so it is discovered from a `<script src=...>` tag on a landing page.
//! The file starts with four one-line array assignments:
//!
//! ```text
//! var aEmitentIds = [3,16842,-1,81820];
//! var aEmitentNames = ['Сбербанк','Газпром','Category','ГАЗПРОМ ао'];
//! var aEmitentCodes = ['SBER','GAZP','CAT','GAZP'];
//! var aEmitentMarkets = [1,1,-1,14];
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{CatalogError, InstrumentRecord};

/// Market value marking category rows that are not instruments
pub const CATEGORY_MARKET: i32 = -1;

/// Number of leading lines holding the four metadata columns
const META_COLUMNS: usize = 4;

static SCRIPT_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<script[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#).expect("valid script regex")
});

/// Locate the metadata script referenced by `html` and resolve it against `base`
///
/// Absolute URLs are returned unchanged, protocol-relative ones get `https:`
/// and anything else is appended to `base`.
///
/// # Errors
///
/// [`CatalogError::MetadataDiscovery`] if no script tag references `filename`.
pub fn find_meta_file_url(html: &str, base: &str, filename: &str) -> Result<String, CatalogError> {
    let src = SCRIPT_SRC
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|src| src.contains(filename))
        .ok_or_else(|| {
            CatalogError::MetadataDiscovery(format!("no <script> tag references {filename}"))
        })?;

    let url = if src.starts_with("http://") || src.starts_with("https://") {
        src.to_string()
    } else if let Some(rest) = src.strip_prefix("//") {
        format!("https://{rest}")
    } else if src.starts_with('/') {
        format!("{}{}", base.trim_end_matches('/'), src)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), src)
    };

    debug!(url = %url, "Discovered metadata file");
    Ok(url)
}

/// Items between the brackets of a one-line array assignment
fn parse_js_array(line: &str) -> Result<Vec<String>, CatalogError> {
    let (start, end) = match (line.find('['), line.rfind(']')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            let preview: String = line.chars().take(40).collect();
            return Err(CatalogError::MetadataParsing(format!(
                "no array literal in line starting with {preview:?}"
            )));
        }
    };

    let items = &line[start + 1..end];
    if items.is_empty() {
        return Ok(Vec::new());
    }

    // names may contain commas, so string arrays split on the quoted separator
    if let Some(quoted) = items.strip_prefix('\'') {
        let quoted = quoted.strip_suffix('\'').unwrap_or(quoted);
        return Ok(quoted.split("','").map(str::to_string).collect());
    }

    Ok(items.split(',').map(|item| item.trim().to_string()).collect())
}

fn parse_int<T: std::str::FromStr>(value: &str, column: &str, row: usize) -> Result<T, CatalogError> {
    value.trim().parse().map_err(|_| {
        CatalogError::MetadataParsing(format!("row {row}: {column} {value:?} is not an integer"))
    })
}

/// Parse the metadata script into records sorted by market
///
/// Rows whose market is [`CATEGORY_MARKET`] are dropped before ids are read,
/// since those rows carry non-numeric ids. The sort is stable.
///
/// # Errors
///
/// [`CatalogError::MetadataParsing`] if fewer than four lines are present, a
/// line lacks an array literal, the columns differ in length, or a market or
/// an instrument id is not an integer.
pub fn parse_meta_lines<S: AsRef<str>>(lines: &[S]) -> Result<Vec<InstrumentRecord>, CatalogError> {
    if lines.len() < META_COLUMNS {
        return Err(CatalogError::MetadataParsing(format!(
            "expected {META_COLUMNS} array lines, got {}",
            lines.len()
        )));
    }

    let ids = parse_js_array(lines[0].as_ref())?;
    let names = parse_js_array(lines[1].as_ref())?;
    let codes = parse_js_array(lines[2].as_ref())?;
    let markets = parse_js_array(lines[3].as_ref())?;

    if names.len() != ids.len() || codes.len() != ids.len() || markets.len() != ids.len() {
        return Err(CatalogError::MetadataParsing(format!(
            "column lengths differ: ids={}, names={}, codes={}, markets={}",
            ids.len(),
            names.len(),
            codes.len(),
            markets.len()
        )));
    }

    let mut records = Vec::with_capacity(ids.len());
    for (row, (((id, name), code), market)) in ids
        .into_iter()
        .zip(names)
        .zip(codes)
        .zip(markets)
        .enumerate()
    {
        let market: i32 = parse_int(&market, "market", row)?;
        if market == CATEGORY_MARKET {
            continue;
        }
        records.push(InstrumentRecord {
            id: parse_int(&id, "id", row)?,
            name,
            code,
            market,
        });
    }

    records.sort_by_key(|record| record.market);
    debug!(records = records.len(), "Parsed instrument metadata");
    Ok(records)
}
