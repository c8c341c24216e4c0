//! Download command implementation

use chrono::NaiveDate;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use super::{parse_market, Cli, CliError, OutputFormat};
use crate::catalog::{InstrumentRecord, LookupQuery};
use crate::downloader::config::{DEFAULT_DELAY_SECS, DEFAULT_MAX_RETRIES};
use crate::downloader::{DownloadError, DownloadJob, DownloadObserver, Exporter};
use crate::interval::DateRange;
use crate::output::{CsvDatasetWriter, DatasetWriter, OutputPathBuilder};
use crate::{Dataset, Timeframe};

/// Arguments for the download command
#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Instrument id
    #[arg(long, conflicts_with = "code", required_unless_present = "code")]
    pub id: Option<i64>,

    /// Instrument code (e.g., GAZP), resolved within --market
    #[arg(long)]
    pub code: Option<String>,

    /// Market name (e.g., shares, futures) or numeric code
    #[arg(long, value_parser = parse_market)]
    pub market: i32,

    /// Timeframe: ticks, 1m, 5m, 10m, 15m, 30m, 1h, 1d, 1w, 1M
    #[arg(long, default_value = "1d")]
    pub timeframe: Timeframe,

    /// First day (YYYY-MM-DD, default: 2007-01-01)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Last day (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Seconds to wait between requests
    #[arg(long, default_value_t = DEFAULT_DELAY_SECS)]
    pub delay: u64,

    /// Retries on the provider's "already processing" answer
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Ask the provider to fill periods without trades
    #[arg(long, default_value_t = false)]
    pub fill_empty: bool,

    /// Output file (default: hierarchical path under --data-dir)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Data root directory for hierarchical file organization
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,
}

/// Progress bar fed by exporter events
struct ProgressObserver {
    bar: ProgressBar,
}

impl DownloadObserver for ProgressObserver {
    fn on_plan(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn on_chunk_start(&self, _index: usize, range: &DateRange) {
        self.bar.set_message(format!("{range}"));
    }

    fn on_retry(&self, _index: usize, retry: u32) {
        self.bar.set_message(format!("provider busy, retry {retry}"));
    }

    fn on_chunk_complete(&self, _index: usize, _rows: usize) {
        self.bar.inc(1);
    }
}

/// Create progress bar with style
fn create_progress_bar(record: &InstrumentRecord, timeframe: Timeframe) -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] {prefix} [{bar:40.cyan/blue}] {pos}/{len} chunks {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_prefix(format!("{} {}", record.code, timeframe));
    pb
}

struct DownloadSummary<'a> {
    record: &'a InstrumentRecord,
    job: &'a DownloadJob,
    range: DateRange,
    output_path: Option<PathBuf>,
}

impl DownloadArgs {
    /// Execute the download command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let exporter = Exporter::new(cli.export_config())?;
        self.run(exporter, cli.output_format).await
    }

    async fn run(&self, exporter: Exporter, format: OutputFormat) -> Result<(), CliError> {
        let record = self.resolve(&exporter).await?;

        let mut job = DownloadJob::new(record.id, record.market, self.timeframe)
            .with_delay_secs(self.delay)
            .with_max_retries(self.max_retries)
            .with_fill_empty(self.fill_empty);
        if let Some(start) = self.start_date {
            job = job.with_start_date(start);
        }
        if let Some(end) = self.end_date {
            job = job.with_end_date(end);
        }
        let range = job.resolved_range().map_err(DownloadError::from)?;
        // pin the end date so the output name matches what was requested
        let job = job.with_end_date(range.end);

        let progress = create_progress_bar(&record, self.timeframe);
        let exporter = exporter.with_observer(Arc::new(ProgressObserver {
            bar: progress.clone(),
        }));

        let result = exporter.download(&job).await;
        progress.finish_and_clear();

        let mut summary = DownloadSummary {
            record: &record,
            job: &job,
            range,
            output_path: None,
        };

        let outcome = match result {
            Ok(dataset) => {
                let path = self.output_path(&record, range)?;
                write_dataset(&path, &dataset)?;
                summary.output_path = Some(path);
                Ok(dataset)
            }
            Err(e) => Err(CliError::from(e)),
        };

        match format {
            OutputFormat::Json => output_json(&summary, &outcome),
            OutputFormat::Human => output_human(&summary, &outcome),
        }

        outcome.map(|_| ())
    }

    /// Catalog record naming the download
    ///
    /// `--code` must select exactly one instrument within `--market`. With
    /// `--id` the first match is used for naming and the exporter itself rejects
    /// ambiguous `(id, market)` pairs.
    async fn resolve(&self, exporter: &Exporter) -> Result<InstrumentRecord, CliError> {
        let query = match (&self.id, &self.code) {
            (Some(id), _) => LookupQuery::new().id(*id),
            (None, Some(code)) => LookupQuery::new().code(code.clone()),
            (None, None) => {
                return Err(CliError::InvalidArgument(
                    "either --id or --code must be given".to_string(),
                ))
            }
        }
        .market(self.market);

        let mut matches = exporter.lookup(&query).await?;
        if self.id.is_none() && matches.len() != 1 {
            return Err(CliError::InvalidArgument(format!(
                "{} instruments match {query}; use --id to pick one",
                matches.len()
            )));
        }

        let record = matches.remove(0);
        info!(id = record.id, code = %record.code, market = record.market, "Resolved instrument");
        Ok(record)
    }

    fn output_path(&self, record: &InstrumentRecord, range: DateRange) -> Result<PathBuf, CliError> {
        if let Some(path) = &self.output {
            return Ok(path.clone());
        }

        Ok(OutputPathBuilder::new(self.data_dir.clone(), record.market, &record.code)
            .with_timeframe(self.timeframe)
            .with_range(range)
            .build()?)
    }
}

fn write_dataset(path: &Path, dataset: &Dataset) -> Result<(), CliError> {
    let mut writer = CsvDatasetWriter::new(path)?;
    writer.write_dataset(dataset)?;
    writer.close()?;
    Ok(())
}

/// Output result as JSON
fn output_json(summary: &DownloadSummary<'_>, result: &Result<Dataset, CliError>) {
    let (success, rows, err) = match result {
        Ok(dataset) => (true, dataset.len(), None),
        Err(e) => (false, 0, Some(e.to_string())),
    };

    let output = serde_json::json!({
        "success": success,
        "id": summary.record.id,
        "code": summary.record.code,
        "name": summary.record.name,
        "market": summary.record.market,
        "timeframe": summary.job.timeframe.to_string(),
        "start_date": summary.range.start.to_string(),
        "end_date": summary.range.end.to_string(),
        "rows": rows,
        "output_path": summary.output_path.as_ref().map(|p| p.display().to_string()),
        "error": err,
    });

    println!("{output}");
}

/// Output result in human-readable format
fn output_human(summary: &DownloadSummary<'_>, result: &Result<Dataset, CliError>) {
    match result {
        Ok(dataset) => {
            println!("\nDownload completed successfully!");
            println!(
                "Instrument: {} ({}) id={} market={}",
                summary.record.code, summary.record.name, summary.record.id, summary.record.market
            );
            println!("Timeframe: {}", summary.job.timeframe);
            println!("Range: {}", summary.range);
            if let Some(path) = &summary.output_path {
                println!("Output: {}", path.display());
            }
            println!("Rows: {}", dataset.len());
        }
        Err(e) => {
            eprintln!("\nDownload failed!");
            eprintln!("Error: {e}");
            error!("Download failed: {}", e);
        }
    }
}
