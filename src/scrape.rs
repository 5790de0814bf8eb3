//! One poll cycle: connect, fetch each report kind, decode, emit.
//!
//! Report kinds are independent. A failure in one is logged and skipped so
//! the rest of the cycle still produces metrics; within a kind it is
//! all-or-nothing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::ValueEnum;
use tracing::{debug, warn};

use crate::error::{InfoError, ScrapeError};
use crate::info::InfoConnection;
use crate::metrics::catalog::{promkey, SYSTEM_NODE};
use crate::metrics::emit::{self, split_list};
use crate::metrics::{MetricCatalog, MetricKind, MetricSample};

/// The info reports a scrape can fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum ReportKind {
    Stats,
    Namespace,
    Latency,
    Sets,
    Sindex,
    Xdr,
}

impl ReportKind {
    pub const ALL: [ReportKind; 6] = [
        ReportKind::Stats,
        ReportKind::Namespace,
        ReportKind::Latency,
        ReportKind::Sets,
        ReportKind::Sindex,
        ReportKind::Xdr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Stats => "stats",
            ReportKind::Namespace => "namespace",
            ReportKind::Latency => "latency",
            ReportKind::Sets => "sets",
            ReportKind::Sindex => "sindex",
            ReportKind::Xdr => "xdr",
        }
    }
}

/// Everything one scrape produced.
#[derive(Debug)]
pub struct ScrapeOutcome {
    pub samples: Vec<MetricSample>,
    /// false when the node could not be reached
    pub up: bool,
    pub errors: Vec<ScrapeError>,
    pub duration: Duration,
}

/// Polls a single node. Holds no per-cycle state, so concurrent scrapes
/// each get their own connection and output.
pub struct Scraper {
    node: String,
    timeout: Duration,
    catalog: Arc<MetricCatalog>,
    reports: Vec<ReportKind>,
}

impl Scraper {
    pub fn new(node: impl Into<String>, timeout: Duration, catalog: Arc<MetricCatalog>, skip: &[ReportKind]) -> Self {
        Self {
            node: node.into(),
            timeout,
            catalog,
            reports: ReportKind::ALL
                .into_iter()
                .filter(|k| !skip.contains(k))
                .collect(),
        }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn reports(&self) -> &[ReportKind] {
        &self.reports
    }

    pub async fn scrape(&self) -> ScrapeOutcome {
        let started = Instant::now();
        let mut samples = Vec::new();
        let mut errors = Vec::new();

        let mut conn = match InfoConnection::connect(&self.node, self.timeout).await {
            Ok(conn) => Some(conn),
            Err(e) => {
                warn!(node = %self.node, "node unreachable: {e}");
                return ScrapeOutcome {
                    samples,
                    up: false,
                    errors,
                    duration: started.elapsed(),
                };
            }
        };

        for &kind in &self.reports {
            // a timed out or broken exchange leaves the old stream unusable
            if conn.is_none() {
                match InfoConnection::connect(&self.node, self.timeout).await {
                    Ok(fresh) => {
                        debug!(node = %self.node, report = kind.as_str(), "reconnected");
                        conn = Some(fresh);
                    }
                    Err(e) => {
                        let e = ScrapeError::info(kind.as_str(), e);
                        warn!("skipping report: {e}");
                        errors.push(e);
                        continue;
                    }
                }
            }
            let Some(active) = conn.as_mut() else {
                continue;
            };

            let t0 = Instant::now();
            match collect(kind, active, &self.catalog).await {
                Ok(found) => {
                    debug!(
                        report = kind.as_str(),
                        samples = found.len(),
                        elapsed_us = t0.elapsed().as_micros() as u64,
                        "report collected"
                    );
                    samples.extend(found);
                }
                Err(e) => {
                    warn!("skipping report: {e}");
                    if e.breaks_connection() {
                        conn = None;
                    }
                    errors.push(e);
                }
            }
        }

        ScrapeOutcome {
            samples,
            up: true,
            errors,
            duration: started.elapsed(),
        }
    }
}

async fn collect(
    kind: ReportKind,
    conn: &mut InfoConnection,
    catalog: &MetricCatalog,
) -> Result<Vec<MetricSample>, ScrapeError> {
    let info = |e: InfoError| ScrapeError::info(kind.as_str(), e);

    match kind {
        ReportKind::Stats => {
            let raw = conn.request_one("statistics").await.map_err(info)?;
            Ok(emit::node_samples(catalog, &raw))
        }
        ReportKind::Namespace => {
            let list = conn.request_one("namespaces").await.map_err(info)?;
            let mut samples = Vec::new();
            for ns in split_list(&list) {
                let raw = conn
                    .request_one(&format!("namespace/{ns}"))
                    .await
                    .map_err(info)?;
                samples.extend(emit::namespace_samples(catalog, ns, &raw));
            }
            Ok(samples)
        }
        ReportKind::Latency => {
            let raw = conn.request_one("latency:").await.map_err(info)?;
            emit::latency_samples(catalog, &raw).map_err(|e| ScrapeError::decode(kind.as_str(), e))
        }
        ReportKind::Sets => {
            let raw = conn.request_one("sets").await.map_err(info)?;
            Ok(emit::set_samples(catalog, &raw))
        }
        ReportKind::Sindex => {
            let list = conn.request_one("sindex").await.map_err(info)?;
            let mut samples = Vec::new();
            for entry in emit::sindex_entries(&list) {
                let raw = conn
                    .request_one(&entry.stats_command())
                    .await
                    .map_err(info)?;
                samples.extend(emit::sindex_samples(catalog, &entry, &raw));
            }
            Ok(samples)
        }
        ReportKind::Xdr => {
            let list = conn.request_one("dcs").await.map_err(info)?;
            let mut samples = Vec::new();
            for dc in split_list(&list) {
                let raw = conn.request_one(&format!("dc/{dc}")).await.map_err(info)?;
                samples.extend(emit::xdr_dc_samples(catalog, dc, &raw));
            }
            Ok(samples)
        }
    }
}

/// The exporter's own `up` and `scrapes_total` metrics.
pub fn self_samples(up: bool, total_scrapes: u64) -> Vec<MetricSample> {
    vec![
        MetricSample::gauge(
            &promkey(SYSTEM_NODE, "up"),
            "Is this node up",
            vec![],
            if up { 1.0 } else { 0.0 },
        ),
        MetricSample {
            name: promkey(SYSTEM_NODE, "scrapes_total"),
            help: "Total number of times Aerospike was scraped for metrics.".to_string(),
            kind: MetricKind::Counter,
            labels: vec![],
            value: total_scrapes as f64,
        },
    ]
}
