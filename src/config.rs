//! Command-line / environment configuration.

use std::time::Duration;

use clap::Parser;

use crate::metrics::catalog::DEFAULT_LATENCY_OPS;
use crate::scrape::ReportKind;

/// Prometheus exporter for a single Aerospike node
#[derive(Parser, Debug, Clone)]
#[command(name = "asprom")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Listen address for the metrics endpoint
    #[arg(long, env = "ASPROM_LISTEN", default_value = "0.0.0.0:9145")]
    pub listen: String,

    /// Aerospike node to poll (host:port)
    #[arg(long, env = "ASPROM_NODE", default_value = "127.0.0.1:3000")]
    pub node: String,

    /// Timeout for connecting and for each info request, in milliseconds
    #[arg(long = "timeout-ms", env = "ASPROM_TIMEOUT_MS", default_value_t = 3000)]
    pub timeout_ms: u64,

    /// Latency operations to export
    #[arg(
        long = "latency-ops",
        env = "ASPROM_LATENCY_OPS",
        value_delimiter = ',',
        default_values_t = DEFAULT_LATENCY_OPS.iter().map(|s| s.to_string()).collect::<Vec<_>>()
    )]
    pub latency_ops: Vec<String>,

    /// Report kinds to leave out of every scrape
    #[arg(long, env = "ASPROM_SKIP", value_delimiter = ',', value_enum)]
    pub skip: Vec<ReportKind>,

    /// Verbose (debug) logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
