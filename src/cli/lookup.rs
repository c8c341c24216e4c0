//! Lookup command: search the instrument catalog

use clap::Args;

use super::{parse_market, Cli, CliError, OutputFormat};
use crate::catalog::{InstrumentRecord, LookupComparator, LookupQuery};
use crate::downloader::Exporter;

/// Arguments for the lookup command
///
/// Repeated flags of one kind are OR-combined, different kinds are AND-combined.
#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Instrument id (repeatable)
    #[arg(long = "id")]
    pub ids: Vec<i64>,

    /// Instrument code (repeatable)
    #[arg(long = "code")]
    pub codes: Vec<String>,

    /// Instrument name (repeatable)
    #[arg(long = "name")]
    pub names: Vec<String>,

    /// Market name or numeric code (repeatable)
    #[arg(long = "market", value_parser = parse_market)]
    pub markets: Vec<i32>,

    /// How --name is matched: equals, startswith, contains
    #[arg(long, default_value = "contains")]
    pub name_comparator: LookupComparator,

    /// How --code is matched: equals, startswith, contains
    #[arg(long, default_value = "equals")]
    pub code_comparator: LookupComparator,
}

impl LookupArgs {
    /// Build the catalog query
    pub fn query(&self) -> LookupQuery {
        LookupQuery::new()
            .ids(self.ids.iter().copied())
            .codes(self.codes.iter().cloned())
            .names(self.names.iter().cloned())
            .markets(self.markets.iter().copied())
            .name_comparator(self.name_comparator)
            .code_comparator(self.code_comparator)
    }

    /// Execute the lookup command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let query = self.query();
        if query.is_empty() {
            return Err(CliError::InvalidArgument(
                "at least one of --id, --code, --name or --market is required".to_string(),
            ));
        }

        let exporter = Exporter::new(cli.export_config())?;
        let records = exporter.lookup(&query).await?;

        match cli.output_format {
            OutputFormat::Json => output_json(&records)?,
            OutputFormat::Human => output_human(&records),
        }
        Ok(())
    }
}

fn output_json(records: &[InstrumentRecord]) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(records)
        .map_err(|e| CliError::InvalidArgument(format!("Failed to serialize records: {e}")))?;
    println!("{json}");
    Ok(())
}

fn output_human(records: &[InstrumentRecord]) {
    println!("{:>10}  {:>6}  {:<16}  NAME", "ID", "MARKET", "CODE");
    for record in records {
        println!(
            "{:>10}  {:>6}  {:<16}  {}",
            record.id, record.market, record.code, record.name
        );
    }
    println!("\n{} instrument(s) found", records.len());
}
