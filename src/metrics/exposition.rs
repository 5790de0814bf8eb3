//! Renders one scrape's samples in the Prometheus text format.
//!
//! Samples are constant values read from the node, so a fresh `Registry`
//! is built for every scrape instead of keeping long-lived collectors.

use std::collections::HashMap;

use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use tracing::warn;

use super::{MetricKind, MetricSample};

/// Content type of the rendered text.
pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}

enum Family {
    Gauge(GaugeVec),
    Counter(CounterVec),
}

/// Render samples. Invalid names are skipped, and a sample that conflicts
/// with an earlier one of the same name (different kind or label names) is
/// dropped with a warning. Repeated name + labels keep the last value.
pub fn render(samples: &[MetricSample]) -> Result<String, prometheus::Error> {
    let registry = Registry::new();
    let mut families: HashMap<&str, Family> = HashMap::new();

    for sample in samples {
        if !families.contains_key(sample.name.as_str()) {
            let family = match new_family(sample) {
                Ok(family) => family,
                Err(e) => {
                    warn!("invalid metric {}: {}", sample.name, e);
                    continue;
                }
            };
            match &family {
                Family::Gauge(g) => registry.register(Box::new(g.clone()))?,
                Family::Counter(c) => registry.register(Box::new(c.clone()))?,
            }
            families.insert(sample.name.as_str(), family);
        }

        let values: Vec<&str> = sample.labels.iter().map(|(_, v)| v.as_str()).collect();
        let applied = match (&families[sample.name.as_str()], sample.kind) {
            (Family::Gauge(g), MetricKind::Gauge) => g
                .get_metric_with_label_values(&values)
                .map(|m| m.set(sample.value)),
            (Family::Counter(c), MetricKind::Counter) if sample.value >= 0.0 => c
                .get_metric_with_label_values(&values)
                .map(|m| {
                    m.reset();
                    m.inc_by(sample.value);
                }),
            _ => Err(prometheus::Error::Msg(format!(
                "kind mismatch or negative counter value {}",
                sample.value
            ))),
        };
        if let Err(e) = applied {
            warn!("dropping sample {}: {}", sample.name, e);
        }
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("exposition is not UTF-8: {e}")))
}

fn new_family(sample: &MetricSample) -> Result<Family, prometheus::Error> {
    let help = if sample.help.is_empty() {
        sample.name.clone()
    } else {
        sample.help.clone()
    };
    let opts = Opts::new(sample.name.clone(), help);
    let label_names: Vec<&str> = sample.labels.iter().map(|(k, _)| *k).collect();

    Ok(match sample.kind {
        MetricKind::Gauge => Family::Gauge(GaugeVec::new(opts, &label_names)?),
        MetricKind::Counter => Family::Counter(CounterVec::new(opts, &label_names)?),
    })
}
