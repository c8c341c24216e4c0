//! HTTP fetcher for the export service and its metadata pages
//!
//! The provider rejects requests that do not look like they come from a browser,
//! so every client is built with a fixed set of "trusted" default headers.
//! Bodies are decoded as UTF-8 when possible and as Windows-1251 otherwise,
//! the charset the provider's legacy pages are served in.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::session::SessionFactory;
use super::{Fetcher, FetcherError, FetcherResult};

/// HTTP connect timeout (seconds) - time to establish TCP connection
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
/// HTTP request timeout (seconds) - overall time for the entire request
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 60;

const TRUSTED_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
const TRUSTED_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const TRUSTED_ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7";
const TRUSTED_REFERER: &str = "https://www.finam.ru/";

/// Headers the provider expects from a regular browser
fn trusted_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(TRUSTED_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(TRUSTED_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(TRUSTED_ACCEPT_LANGUAGE));
    headers.insert(REFERER, HeaderValue::from_static(TRUSTED_REFERER));
    headers
}

/// Decode a response body
///
/// Tries UTF-8 first and falls back to Windows-1251.
///
/// # Examples
/// ```
/// use finam_data_downloader::fetcher::smart_decode;
///
/// assert_eq!(smart_decode(b"<DATE>;<TIME>").unwrap(), "<DATE>;<TIME>");
/// // "Газ" in Windows-1251
/// assert_eq!(smart_decode(&[0xC3, 0xE0, 0xE7]).unwrap(), "Газ");
/// ```
pub fn smart_decode(bytes: &[u8]) -> FetcherResult<String> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }

    encoding_rs::WINDOWS_1251
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or_else(|| {
            FetcherError::Decode("body is neither UTF-8 nor Windows-1251".to_string())
        })
}

/// reqwest-backed [`Fetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeouts
    pub fn new() -> FetcherResult<Self> {
        Self::with_timeouts(
            Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS),
            Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Create a fetcher with explicit connect and request timeouts
    pub fn with_timeouts(connect_timeout: Duration, request_timeout: Duration) -> FetcherResult<Self> {
        let client = Client::builder()
            .default_headers(trusted_headers())
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| FetcherError::Session(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetcherResult<String> {
        debug!(url = %url, "Fetching");

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Request failed");
            FetcherError::Http {
                url: url.to_string(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Unexpected status");
            return Err(FetcherError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| FetcherError::Http {
            url: url.to_string(),
            message: format!("Failed to read body: {e}"),
        })?;

        debug!(url = %url, bytes = bytes.len(), "Fetched body");
        smart_decode(&bytes)
    }
}

/// Opens a fresh [`HttpFetcher`] per session
#[derive(Debug, Clone)]
pub struct HttpSessionFactory {
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl HttpSessionFactory {
    /// Factory producing fetchers with the given timeouts
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            request_timeout,
        }
    }
}

impl Default for HttpSessionFactory {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS),
            Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
        )
    }
}

impl SessionFactory for HttpSessionFactory {
    type Session = HttpFetcher;

    fn open(&self) -> FetcherResult<HttpFetcher> {
        HttpFetcher::with_timeouts(self.connect_timeout, self.request_timeout)
    }
}
