//! CLI command implementations

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::str::FromStr;

use crate::downloader::ExportConfig;
use crate::Market;

pub mod download;
pub mod error;
pub mod lookup;
pub mod markets;

pub use download::DownloadArgs;
pub use error::CliError;
pub use lookup::LookupArgs;
pub use markets::MarketsArgs;

/// Finam data downloader CLI
#[derive(Parser, Debug)]
#[command(name = "finam-data-downloader")]
#[command(about = "Download historical market data from the Finam export service", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Export host serving table.csv (default: export.finam.ru)
    #[arg(long, global = true)]
    pub export_host: Option<String>,

    /// Serve Prometheus metrics on this address (e.g., 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Export configuration with CLI overrides applied
    pub fn export_config(&self) -> ExportConfig {
        let config = ExportConfig::default();
        match &self.export_host {
            Some(host) => config.with_export_host(host.clone()),
            None => config,
        }
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a dataset to CSV
    Download(DownloadArgs),

    /// Search the instrument catalog
    Lookup(LookupArgs),

    /// List well-known market codes
    Markets(MarketsArgs),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

/// Parse a market given by name (`shares`, `etf-moex`) or numeric code
///
/// Unknown numeric codes are accepted as-is.
pub fn parse_market(s: &str) -> Result<i32, String> {
    if let Ok(market) = Market::from_str(s) {
        return Ok(market.code());
    }
    s.trim()
        .parse::<i32>()
        .map_err(|_| format!("Invalid market: {s} (use a name like 'shares' or a numeric code)"))
}
