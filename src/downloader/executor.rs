//! Chunked download execution
//!
//! [`Exporter`] resolves the instrument, splits the requested range into
//! provider-sized chunks and requests them one after another. Each response is
//! classified; the provider's "already processing" answer is retried with a
//! fixed pause, every other failure aborts the whole download.

use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::classifier::{classify, Outcome, ResponseError};
use super::config::ExportConfig;
use super::job::DownloadJob;
use super::parser::{parse_payload, PayloadError};
use super::progress::{DownloadObserver, NoopObserver};
use super::request::ExportRequest;
use super::DownloadError;
use crate::catalog::{
    CatalogError, InstrumentCatalog, InstrumentRecord, LookupQuery, CATALOG_FETCHES_PER_LOAD,
};
use crate::fetcher::{Fetcher, HttpFetcher, HttpSessionFactory, SessionFetcher, SessionManager};
use crate::interval::{split_interval, DateRange};
use crate::metrics::{record_in_progress_retry, DownloadMetrics, ExportRequestMetrics};
use crate::Dataset;

/// Downloads datasets from the export service
pub struct Exporter {
    config: ExportConfig,
    fetcher: Arc<dyn Fetcher>,
    catalog: InstrumentCatalog,
    observer: Arc<dyn DownloadObserver>,
}

impl Exporter {
    /// Create an exporter talking to the provider over HTTP
    ///
    /// Metadata is fetched through a managed session that stays open for the
    /// fetches of one catalog load.
    pub fn new(config: ExportConfig) -> Result<Self, DownloadError> {
        let fetcher = HttpFetcher::with_timeouts(config.connect_timeout, config.request_timeout)?;
        let factory = HttpSessionFactory::new(config.connect_timeout, config.request_timeout);
        let meta_fetcher =
            SessionFetcher::new(SessionManager::new(factory, CATALOG_FETCHES_PER_LOAD));

        Ok(Self::with_fetchers(
            config,
            Arc::new(fetcher),
            Arc::new(meta_fetcher),
        ))
    }

    /// Create an exporter with explicit data and metadata fetchers
    pub fn with_fetchers(
        config: ExportConfig,
        fetcher: Arc<dyn Fetcher>,
        meta_fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let catalog = InstrumentCatalog::new(meta_fetcher, &config);
        Self {
            config,
            fetcher,
            catalog,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Report chunk progress to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn DownloadObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Instrument catalog used for lookups
    pub fn catalog(&self) -> &InstrumentCatalog {
        &self.catalog
    }

    /// Look up instruments in the catalog
    pub async fn lookup(&self, query: &LookupQuery) -> Result<Vec<InstrumentRecord>, CatalogError> {
        self.catalog.lookup(query).await
    }

    /// Download a job into one dataset
    ///
    /// Rows are ordered by chunk and, within a chunk, as the provider sent them.
    /// No partial dataset is returned on failure.
    pub async fn download(&self, job: &DownloadJob) -> Result<Dataset, DownloadError> {
        let metrics = DownloadMetrics::start(
            job.timeframe.to_string(),
            format!("{}@{}", job.id, job.market),
        );

        let result = self.execute(job, &metrics).await;
        match &result {
            Ok(dataset) => metrics.record_success(dataset.len()),
            Err(e) => metrics.record_failure(&e.to_string()),
        }
        result
    }

    async fn execute(
        &self,
        job: &DownloadJob,
        metrics: &DownloadMetrics,
    ) -> Result<Dataset, DownloadError> {
        job.validate().map_err(DownloadError::InvalidJob)?;

        let range = job.resolved_range()?;
        let instrument = self.resolve(job.id, job.market).await?;
        let chunks = split_interval(range.start, range.end, job.timeframe)?;

        info!(
            id = instrument.id,
            code = %instrument.code,
            market = instrument.market,
            timeframe = %job.timeframe,
            range = %range,
            chunks = chunks.len(),
            "Starting download"
        );
        self.observer.on_plan(chunks.len());

        let mut dataset = Dataset::empty_for(job.timeframe);
        for (index, chunk) in chunks.iter().enumerate() {
            if index > 0 {
                sleep(job.delay()).await;
            }

            let rows = self.download_chunk(job, &instrument, index, chunk).await?;
            let count = rows.len();
            dataset
                .append(rows)
                .map_err(|e| DownloadError::Payload(PayloadError::Table(e)))?;

            metrics.record_chunk(count);
            self.observer.on_chunk_complete(index, count);
            info!(
                chunk = index + 1,
                total = chunks.len(),
                range = %chunk,
                rows = count,
                "Chunk downloaded"
            );
        }

        Ok(dataset)
    }

    /// The single catalog record for `(id, market)`
    async fn resolve(&self, id: i64, market: i32) -> Result<InstrumentRecord, DownloadError> {
        let query = LookupQuery::new().id(id).market(market);
        let mut matches = self.catalog.lookup(&query).await?;

        if matches.len() != 1 {
            error!(id = id, market = market, matches = matches.len(), "Ambiguous instrument");
            return Err(DownloadError::AmbiguousInstrument {
                id,
                market,
                matches: matches.len(),
            });
        }

        Ok(matches.remove(0))
    }

    async fn download_chunk(
        &self,
        job: &DownloadJob,
        instrument: &InstrumentRecord,
        index: usize,
        range: &DateRange,
    ) -> Result<Dataset, DownloadError> {
        self.observer.on_chunk_start(index, range);

        let request = ExportRequest {
            instrument,
            timeframe: job.timeframe,
            range: *range,
            fill_empty: job.fill_empty,
        };
        let url = request.url(&self.config.export_host).map_err(|e| {
            DownloadError::InvalidJob(format!(
                "invalid export host {:?}: {e}",
                self.config.export_host
            ))
        })?;

        let text = self.fetch_table(job, index, url.as_str()).await?;
        let dataset = parse_payload(&text, job.timeframe)?;

        debug!(chunk = index, rows = dataset.len(), "Chunk parsed");
        Ok(dataset)
    }

    /// Fetch and classify until the provider answers with a table
    async fn fetch_table(&self, job: &DownloadJob, index: usize, url: &str) -> Result<String, DownloadError> {
        let mut retries: u32 = 0;

        loop {
            let request_metrics = ExportRequestMetrics::start(job.timeframe.to_string(), retries);
            debug!(chunk = index, url = %url, attempt = retries + 1, "Requesting chunk");

            let raw = match self.fetcher.fetch(url).await {
                Ok(raw) => raw,
                Err(e) => {
                    request_metrics.record("transport_error");
                    error!(chunk = index, error = %e, "Chunk request failed");
                    return Err(e.into());
                }
            };

            match classify(&raw, job.timeframe) {
                Outcome::Success(text) => {
                    request_metrics.record("success");
                    return Ok(text);
                }
                Outcome::Failure(err) if err.is_transient() && retries <= job.max_retries => {
                    request_metrics.record(outcome_label(&err));
                    retries += 1;
                    warn!(
                        chunk = index,
                        retry = retries,
                        max_retries = job.max_retries,
                        delay_secs = job.delay_secs,
                        "Provider is still processing the request, retrying"
                    );
                    record_in_progress_retry(index, retries);
                    self.observer.on_retry(index, retries);
                    sleep(job.delay()).await;
                }
                Outcome::Failure(err) => {
                    request_metrics.record(outcome_label(&err));
                    error!(chunk = index, retries = retries, error = %err, "Chunk rejected by provider");
                    return Err(err.into());
                }
            }
        }
    }
}

fn outcome_label(err: &ResponseError) -> &'static str {
    match err {
        ResponseError::RangeTooLong => "range_too_long",
        ResponseError::Throttled => "throttled",
        ResponseError::AlreadyInProgress => "in_progress",
        ResponseError::Malformed(_) => "malformed",
    }
}
