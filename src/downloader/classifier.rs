//! Classification of raw export responses
//!
//! The export endpoint always answers 200 and reports problems as text in the
//! body, so success and failure are told apart by content.

use crate::Timeframe;

/// Marker for a request spanning too many days
pub const RANGE_TOO_LONG_MARKER: &str = "Вы запросили данные за слишком большой временной период";

/// Marker for throttled clients
pub const THROTTLED_MARKER: &str = "Forbidden: Access is denied";

/// Marker for "already processing your request, try again"
pub const IN_PROGRESS_MARKER: &str = "Система уже обрабатывает Ваш запрос";

/// Characters every well-formed table contains
const TABLE_MARKERS: [char; 3] = ['<', '>', ';'];

const SNIPPET_CHARS: usize = 120;

/// Failure reported by the provider in a response body
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseError {
    /// Requested period too long for the timeframe
    #[error("provider rejected the request: requested period is too long")]
    RangeTooLong,

    /// Access denied due to throttling
    #[error("provider throttled the request: access denied")]
    Throttled,

    /// Provider is still processing an earlier identical request
    #[error("provider is already processing this request")]
    AlreadyInProgress,

    /// Body is not a delimited table
    #[error("response does not look like a valid table: {0:?}")]
    Malformed(String),
}

impl ResponseError {
    /// Whether the request may succeed if repeated
    pub fn is_transient(&self) -> bool {
        matches!(self, ResponseError::AlreadyInProgress)
    }
}

/// Result of classifying a response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Table text ready for parsing
    Success(String),
    /// Provider-reported failure
    Failure(ResponseError),
}

/// Classify a raw response body
///
/// An empty body is a legitimately empty result and is replaced by the header
/// line of the timeframe's schema before any check runs.
///
/// ```
/// use finam_data_downloader::downloader::classifier::{classify, Outcome};
/// use finam_data_downloader::Timeframe;
///
/// assert_eq!(
///     classify("", Timeframe::Daily),
///     Outcome::Success("<DATE>;<TIME>;<OPEN>;<HIGH>;<LOW>;<CLOSE>;<VOL>".to_string())
/// );
/// ```
pub fn classify(raw: &str, timeframe: Timeframe) -> Outcome {
    let text = if raw.is_empty() {
        timeframe.schema().header()
    } else {
        raw
    };

    if text.contains(RANGE_TOO_LONG_MARKER) {
        return Outcome::Failure(ResponseError::RangeTooLong);
    }
    if text.contains(THROTTLED_MARKER) {
        return Outcome::Failure(ResponseError::Throttled);
    }
    if text.contains(IN_PROGRESS_MARKER) {
        return Outcome::Failure(ResponseError::AlreadyInProgress);
    }

    if !TABLE_MARKERS.iter().all(|marker| text.contains(*marker)) {
        let snippet: String = text.chars().take(SNIPPET_CHARS).collect();
        return Outcome::Failure(ResponseError::Malformed(snippet));
    }

    Outcome::Success(text.to_string())
}
