//! Transport collaborators
//!
//! The core never talks to the network directly. It asks a [`Fetcher`] for the
//! body of a URL and works on the decoded text. Two implementations ship with
//! the crate:
//!
//! - [`http::HttpFetcher`] - plain reqwest client used for data exports
//! - [`session::SessionFetcher`] - leases a session from a [`session::SessionManager`]
//!   per call; used for metadata so the session lives exactly as long as the
//!   catalog load needs it

use async_trait::async_trait;

pub mod http;
pub mod session;

pub use http::{smart_decode, HttpFetcher, HttpSessionFactory};
pub use session::{SessionFactory, SessionFetcher, SessionLease, SessionManager};

/// Transport-level failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetcherError {
    /// Request could not be completed (connection, timeout, body read)
    #[error("HTTP error fetching {url}: {message}")]
    Http {
        /// Requested URL
        url: String,
        /// Underlying error
        message: String,
    },

    /// Server answered with a non-success status
    #[error("unexpected status {status} from {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Body could not be decoded as text
    #[error("decode error: {0}")]
    Decode(String),

    /// Session could not be opened
    #[error("session error: {0}")]
    Session(String),
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Fetches the decoded body of a URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the full body as text
    async fn fetch(&self, url: &str) -> FetcherResult<String>;

    /// Fetch the body split into lines (line terminators removed)
    async fn fetch_lines(&self, url: &str) -> FetcherResult<Vec<String>> {
        let body = self.fetch(url).await?;
        Ok(body.lines().map(str::to_string).collect())
    }

    /// Drop state held for a sequence of calls that will not be completed
    ///
    /// Callers that issue several dependent fetches call this when they give up
    /// part way through. The default does nothing.
    fn abort(&self) {}
}
