//! Prometheus exporter for a single Aerospike node.
//!
//! Every `/metrics` request polls the node over its info protocol and
//! converts the replies into labeled metrics:
//!
//!   aerospike_node_*:     node wide statistics, e.g. memory usage, cluster state
//!   aerospike_ns_*:       per namespace, e.g. objects, migrations
//!   aerospike_set_*, aerospike_sindex_*, aerospike_xdr_dc_*
//!   aerospike_latency_*:  read/write/etc latency, raw and as estimated histograms

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

mod config;
mod error;
mod handlers;
mod info;
mod metrics;
mod middleware;
mod scrape;
mod server;

use config::Config;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Polls the node; owns the immutable metric catalog.
    pub scraper: scrape::Scraper,

    /// Bookkeeping about our own scrapes, read by `/api/status`.
    pub stats: Arc<metrics::ScrapeStats>,
}

fn setup_logging(verbose: bool, quiet: bool) -> Result<()> {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")
}

async fn run() -> Result<()> {
    let config = Config::parse();
    setup_logging(config.verbose, config.quiet)?;

    // ── 1. Build the catalog once ───────────────────────────────
    let catalog = Arc::new(metrics::MetricCatalog::new(&config.latency_ops));
    let mut latency_ops: Vec<_> = catalog.latency_operations().collect();
    latency_ops.sort_unstable();
    info!(?latency_ops, "latency operations exported");

    // ── 2. Build shared state ───────────────────────────────────
    let scraper = scrape::Scraper::new(&config.node, config.timeout(), catalog, &config.skip);
    let reports: Vec<_> = scraper.reports().iter().map(|k| k.as_str()).collect();
    info!(node = %config.node, ?reports, "polling node on every scrape");

    let state = Arc::new(AppState {
        scraper,
        stats: Arc::new(metrics::ScrapeStats::new(&config.node)),
    });

    // ── 3. Build Axum router ────────────────────────────────────
    let app = server::create_router(state);

    // ── 4. Bind & serve ─────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;

    info!("starting asprom, listening on http://{}", config.listen);
    axum::serve(listener, app).await.context("server exited with error")
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{:#}", e);
        eprintln!("asprom: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
pub(crate) fn test_state(node: &str, only: &[scrape::ReportKind]) -> Arc<AppState> {
    use std::time::Duration;

    let skip: Vec<_> = scrape::ReportKind::ALL
        .into_iter()
        .filter(|k| !only.contains(k))
        .collect();
    Arc::new(AppState {
        scraper: scrape::Scraper::new(
            node,
            Duration::from_secs(2),
            Arc::new(metrics::MetricCatalog::default()),
            &skip,
        ),
        stats: Arc::new(metrics::ScrapeStats::new(node)),
    })
}
