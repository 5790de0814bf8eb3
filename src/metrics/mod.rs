pub mod buckets;
pub mod catalog;
pub mod collector;
pub mod emit;
pub mod exposition;
pub mod percentiles;

pub use catalog::{MetricCatalog, MetricKind};
pub use collector::{ScrapeRecord, ScrapeStats, StatusSnapshot};

/// One exported value. This is the "write" side; the emitter creates these
/// from decoded info responses and the exposition layer renders them.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    /// e.g. "aerospike_ns_objects"
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    /// Label name/value pairs, in declaration order
    pub labels: Vec<(&'static str, String)>,
    pub value: f64,
}

impl MetricSample {
    pub fn gauge(name: &str, help: &str, labels: Vec<(&'static str, String)>, value: f64) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            kind: MetricKind::Gauge,
            labels,
            value,
        }
    }

    #[cfg(test)]
    /// Value of label `name`, if present.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}
