//! Markets command: list well-known market codes

use clap::Args;
use serde_json::json;

use super::{Cli, OutputFormat};
use crate::Market;

/// Arguments for the markets command
#[derive(Args, Debug)]
pub struct MarketsArgs {}

impl MarketsArgs {
    /// Print the known markets
    pub fn execute(&self, cli: &Cli) {
        match cli.output_format {
            OutputFormat::Json => {
                let markets: Vec<_> = Market::all()
                    .iter()
                    .map(|m| json!({ "name": m.to_string(), "code": m.code() }))
                    .collect();
                println!("{}", serde_json::Value::Array(markets));
            }
            OutputFormat::Human => {
                println!("{:>6}  NAME", "CODE");
                for market in Market::all() {
                    println!("{:>6}  {}", market.code(), market);
                }
            }
        }
    }
}
