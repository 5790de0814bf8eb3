use std::time::{Duration, Instant};

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;

use super::percentiles::PercentileSet;

// ─── Configuration ───────────────────────────────────────────────

/// HdrHistogram range: 1 μs → 60 s, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 60_000_000;
const HIST_SIGFIG: u8 = 3;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe bookkeeping about the exporter's own scrapes.
/// `/metrics` calls `record()`, `/api/status` calls `snapshot()`.
pub struct ScrapeStats {
    node: String,
    inner: Mutex<Inner>,
}

/// Result of one scrape, as far as the bookkeeping is concerned.
#[derive(Debug, Clone)]
pub struct ScrapeRecord {
    pub duration: Duration,
    /// false when the node could not be reached at all
    pub up: bool,
    /// Report kinds that failed during this scrape
    pub report_errors: Vec<String>,
}

/// Read-only view served as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub node: String,
    pub up: bool,
    pub total_scrapes: u64,
    pub failed_scrapes: u64,
    pub report_errors: u64,
    pub last_error: Option<String>,
    pub uptime_secs: f64,
    pub scrape_duration_us: PercentileSet,
}

// ─── Internal state ──────────────────────────────────────────────

struct Inner {
    durations: Histogram<u64>,
    total_scrapes: u64,
    failed_scrapes: u64,
    report_errors: u64,
    last_error: Option<String>,
    up: bool,
    started: Instant,
}

// ─── ScrapeStats impl ────────────────────────────────────────────

impl ScrapeStats {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            inner: Mutex::new(Inner::new()),
        }
    }

    pub fn record(&self, record: ScrapeRecord) {
        self.inner.lock().record(record);
    }

    /// Scrapes so far, including the one in flight once recorded.
    pub fn total_scrapes(&self) -> u64 {
        self.inner.lock().total_scrapes
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let inner = self.inner.lock();
        StatusSnapshot {
            node: self.node.clone(),
            up: inner.up,
            total_scrapes: inner.total_scrapes,
            failed_scrapes: inner.failed_scrapes,
            report_errors: inner.report_errors,
            last_error: inner.last_error.clone(),
            uptime_secs: inner.started.elapsed().as_secs_f64(),
            scrape_duration_us: PercentileSet::from_histogram(&inner.durations),
        }
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

impl Inner {
    fn new() -> Self {
        Self {
            durations: Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG)
                .expect("histogram creation"),
            total_scrapes: 0,
            failed_scrapes: 0,
            report_errors: 0,
            last_error: None,
            up: false,
            started: Instant::now(),
        }
    }

    fn record(&mut self, record: ScrapeRecord) {
        self.total_scrapes += 1;
        self.up = record.up;

        // Clamp into the histogram range
        let us = (record.duration.as_micros() as u64).clamp(HIST_LOW, HIST_HIGH);
        let _ = self.durations.record(us);

        if !record.up {
            self.failed_scrapes += 1;
            self.last_error = Some("node unreachable".to_string());
        }
        if let Some(last) = record.report_errors.last() {
            self.report_errors += record.report_errors.len() as u64;
            self.last_error = Some(last.clone());
        }
    }
}
