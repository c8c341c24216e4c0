//! Export configuration and defaults

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::fetcher::http::{HTTP_CONNECT_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS};

/// Host serving `table.csv` exports
pub const DEFAULT_EXPORT_HOST: &str = "export.finam.ru";

/// Provider site, used to resolve the metadata script path
pub const DEFAULT_BASE_URL: &str = "https://www.finam.ru";

/// Page whose markup references the metadata script.
/// Any instrument's export page works; this one has been stable for years.
pub const DEFAULT_ENTRY_PATH: &str = "/profile/moex-akcii/gazprom/export/";

/// Metadata script filename searched for on the landing page
pub const DEFAULT_META_FILENAME: &str = "icharts.js";

/// Default first day of a download (earliest data the provider serves)
pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2007, 1, 1).unwrap_or_default()
}

/// Default pause between requests, in seconds.
/// Also used between retries of a busy chunk.
pub const DEFAULT_DELAY_SECS: u64 = 1;

/// Default number of retries on the provider's "already processing" answer.
/// Retries continue while the retry count is <= this value.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Endpoints and transport settings for an [`Exporter`](super::Exporter)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Export host (no scheme)
    pub export_host: String,
    /// Provider site base URL
    pub base_url: String,
    /// Path of the page referencing the metadata script
    pub entry_path: String,
    /// Metadata script filename
    pub meta_filename: String,
    /// HTTP connect timeout
    pub connect_timeout: Duration,
    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl ExportConfig {
    /// Use a different export host
    pub fn with_export_host(mut self, host: impl Into<String>) -> Self {
        self.export_host = host.into();
        self
    }

    /// Use a different provider base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Full URL of the landing page
    pub fn entry_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.entry_path)
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            export_host: DEFAULT_EXPORT_HOST.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            entry_path: DEFAULT_ENTRY_PATH.to_string(),
            meta_filename: DEFAULT_META_FILENAME.to_string(),
            connect_timeout: Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
        }
    }
}
