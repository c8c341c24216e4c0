//! Instrument catalog
//!
//! Resolves instruments by id, code, name and market against the provider's
//! metadata table. The table is fetched once on first use and then served from
//! memory until [`InstrumentCatalog::reset`] is called.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::downloader::config::ExportConfig;
use crate::fetcher::{Fetcher, FetcherError};

pub mod lookup;
pub mod meta;

pub use lookup::{LookupComparator, LookupQuery};

/// Number of metadata fetches one catalog load performs (landing page, script file)
pub const CATALOG_FETCHES_PER_LOAD: usize = 2;

/// One instrument from the provider's metadata table
///
/// The same `id` may appear under several markets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrumentRecord {
    /// Provider instrument id
    pub id: i64,
    /// Human-readable name
    pub name: String,
    /// Short code (ticker)
    pub code: String,
    /// Provider market code
    pub market: i32,
}

/// Catalog errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Query has no selector field
    #[error("invalid query: either id, code, name or market must be specified")]
    InvalidQuery,

    /// No record matched
    #[error("no instrument matches {0}")]
    NotFound(String),

    /// Metadata script reference not found on the landing page
    #[error("metadata discovery failed: {0}")]
    MetadataDiscovery(String),

    /// Metadata script has an unexpected structure
    #[error("metadata parsing failed: {0}")]
    MetadataParsing(String),

    /// Transport failure while fetching metadata
    #[error(transparent)]
    Fetch(#[from] FetcherError),
}

enum CatalogState {
    Unloaded,
    Loaded(Arc<[InstrumentRecord]>),
}

/// Lazily loaded, process-lifetime cache of instrument records
pub struct InstrumentCatalog {
    fetcher: Arc<dyn Fetcher>,
    entry_url: String,
    base_url: String,
    meta_filename: String,
    state: RwLock<CatalogState>,
    init: Mutex<()>,
}

impl InstrumentCatalog {
    /// Create an unloaded catalog that will fetch metadata through `fetcher`
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &ExportConfig) -> Self {
        Self {
            fetcher,
            entry_url: config.entry_url(),
            base_url: config.base_url.clone(),
            meta_filename: config.meta_filename.clone(),
            state: RwLock::new(CatalogState::Unloaded),
            init: Mutex::new(()),
        }
    }

    /// Whether the table has been loaded
    pub fn is_loaded(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Load the table if it is not loaded yet
    ///
    /// Repeated calls perform no fetches. Concurrent first calls load once.
    pub async fn load(&self) -> Result<(), CatalogError> {
        self.ensure_loaded().await.map(|_| ())
    }

    /// Copy of the loaded records, `None` before the first load
    pub fn records(&self) -> Option<Vec<InstrumentRecord>> {
        self.snapshot().map(|records| records.to_vec())
    }

    /// Find all records matching `query`, loading the table if needed
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvalidQuery`] if the query has no selector (checked before loading)
    /// - [`CatalogError::NotFound`] if nothing matches
    /// - load errors on first use
    pub async fn lookup(&self, query: &LookupQuery) -> Result<Vec<InstrumentRecord>, CatalogError> {
        if query.is_empty() {
            return Err(CatalogError::InvalidQuery);
        }

        let records = self.ensure_loaded().await?;
        let matches: Vec<InstrumentRecord> = records
            .iter()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();

        debug!(query = %query, matches = matches.len(), "Catalog lookup");
        if matches.is_empty() {
            return Err(CatalogError::NotFound(query.to_string()));
        }
        Ok(matches)
    }

    /// Drop the cached table; the next access reloads it
    pub fn reset(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = CatalogState::Unloaded;
    }

    fn snapshot(&self) -> Option<Arc<[InstrumentRecord]>> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            CatalogState::Loaded(records) => Some(Arc::clone(records)),
            CatalogState::Unloaded => None,
        }
    }

    async fn ensure_loaded(&self) -> Result<Arc<[InstrumentRecord]>, CatalogError> {
        if let Some(records) = self.snapshot() {
            return Ok(records);
        }

        let _guard = self.init.lock().await;
        if let Some(records) = self.snapshot() {
            return Ok(records);
        }

        let records: Arc<[InstrumentRecord]> = self.fetch_records().await?.into();
        *self.state.write().unwrap_or_else(PoisonError::into_inner) =
            CatalogState::Loaded(Arc::clone(&records));
        Ok(records)
    }

    async fn fetch_records(&self) -> Result<Vec<InstrumentRecord>, CatalogError> {
        info!(url = %self.entry_url, "Loading instrument metadata");

        let mut scope = LoadScope {
            fetcher: self.fetcher.as_ref(),
            completed: false,
        };

        let html = self.fetcher.fetch(&self.entry_url).await?;
        let meta_url = meta::find_meta_file_url(&html, &self.base_url, &self.meta_filename)?;
        let lines = self.fetcher.fetch_lines(&meta_url).await?;
        scope.completed = true;

        let records = meta::parse_meta_lines(&lines)?;

        info!(records = records.len(), "Instrument metadata loaded");
        Ok(records)
    }
}

/// Aborts the fetcher's pending sequence unless both metadata fetches ran
struct LoadScope<'a> {
    fetcher: &'a dyn Fetcher,
    completed: bool,
}

impl Drop for LoadScope<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.fetcher.abort();
        }
    }
}
