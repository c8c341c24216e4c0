//! Typed instrument filters
//!
//! Several values for one field are OR-combined, fields are AND-combined.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::InstrumentRecord;

/// How a text field is compared against the query values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupComparator {
    /// Exact match
    #[default]
    Equals,
    /// Case-sensitive prefix
    StartsWith,
    /// Case-sensitive substring
    Contains,
}

impl LookupComparator {
    /// Apply the comparator to a field value
    pub fn matches(&self, field: &str, value: &str) -> bool {
        match self {
            LookupComparator::Equals => field == value,
            LookupComparator::StartsWith => field.starts_with(value),
            LookupComparator::Contains => field.contains(value),
        }
    }
}

impl fmt::Display for LookupComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LookupComparator::Equals => "equals",
            LookupComparator::StartsWith => "startswith",
            LookupComparator::Contains => "contains",
        };
        write!(f, "{s}")
    }
}

impl FromStr for LookupComparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "equals" | "eq" => Ok(LookupComparator::Equals),
            "startswith" | "prefix" => Ok(LookupComparator::StartsWith),
            "contains" => Ok(LookupComparator::Contains),
            _ => Err(format!("Invalid comparator: {s}")),
        }
    }
}

/// Instrument selector
///
/// At least one of id, code, name or market must be supplied.
///
/// ```
/// use finam_data_downloader::{LookupComparator, LookupQuery};
///
/// let query = LookupQuery::new()
///     .name("Газ")
///     .market(1)
///     .name_comparator(LookupComparator::StartsWith);
/// assert!(!query.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupQuery {
    /// Instrument ids
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<i64>,
    /// Instrument codes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codes: Vec<String>,
    /// Instrument names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    /// Market codes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markets: Vec<i32>,
    /// Comparator for `names` (default: contains)
    #[serde(default = "default_name_comparator")]
    pub name_comparator: LookupComparator,
    /// Comparator for `codes` (default: equals)
    #[serde(default)]
    pub code_comparator: LookupComparator,
}

fn default_name_comparator() -> LookupComparator {
    LookupComparator::Contains
}

impl LookupQuery {
    /// Empty query with default comparators
    pub fn new() -> Self {
        Self {
            name_comparator: default_name_comparator(),
            ..Self::default()
        }
    }

    /// Add an id
    pub fn id(mut self, id: i64) -> Self {
        self.ids.push(id);
        self
    }

    /// Add several ids
    pub fn ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.ids.extend(ids);
        self
    }

    /// Add a code
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.codes.push(code.into());
        self
    }

    /// Add several codes
    pub fn codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.codes.extend(codes.into_iter().map(Into::into));
        self
    }

    /// Add a name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    /// Add several names
    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add a market
    pub fn market(mut self, market: impl Into<i32>) -> Self {
        self.markets.push(market.into());
        self
    }

    /// Add several markets
    pub fn markets(mut self, markets: impl IntoIterator<Item = i32>) -> Self {
        self.markets.extend(markets);
        self
    }

    /// Set the name comparator
    pub fn name_comparator(mut self, comparator: LookupComparator) -> Self {
        self.name_comparator = comparator;
        self
    }

    /// Set the code comparator
    pub fn code_comparator(mut self, comparator: LookupComparator) -> Self {
        self.code_comparator = comparator;
        self
    }

    /// Whether no selector field is set
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.codes.is_empty() && self.names.is_empty() && self.markets.is_empty()
    }

    /// Whether `record` satisfies every supplied field
    pub fn matches(&self, record: &InstrumentRecord) -> bool {
        (self.ids.is_empty() || self.ids.contains(&record.id))
            && (self.markets.is_empty() || self.markets.contains(&record.market))
            && any_match(&self.codes, &record.code, self.code_comparator)
            && any_match(&self.names, &record.name, self.name_comparator)
    }
}

fn any_match(values: &[String], field: &str, comparator: LookupComparator) -> bool {
    values.is_empty() || values.iter().any(|value| comparator.matches(field, value))
}

impl fmt::Display for LookupQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.ids.is_empty() {
            parts.push(format!("id={:?}", self.ids));
        }
        if !self.codes.is_empty() {
            parts.push(format!("code {} {:?}", self.code_comparator, self.codes));
        }
        if !self.names.is_empty() {
            parts.push(format!("name {} {:?}", self.name_comparator, self.names));
        }
        if !self.markets.is_empty() {
            parts.push(format!("market={:?}", self.markets));
        }
        write!(f, "{}", parts.join(", "))
    }
}
