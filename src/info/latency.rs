//! Decoder for the paired-line `latency:` report.
//!
//! A report is a `;`-separated sequence of lines that come in pairs:
//!
//! ```text
//! {test}-read:14:08:38-GMT,ops/sec,>1ms,>8ms,>64ms;14:08:48,2586.8,1.58,0.77,0.00
//! ```
//!
//! The first line declares the source and the measured columns, the second
//! carries a timestamp followed by one value per column. Lines starting with
//! `error` are "no data yet" placeholders and never take part in pairing.

use std::fmt;

use crate::error::DecodeError;

/// Prefix of placeholder lines such as `error-no-data-yet-or-back-too-small`.
const PLACEHOLDER_PREFIX: &str = "error";

/// Column holding the aggregate throughput of a source.
pub const OPS_PER_SEC: &str = "ops/sec";

/// One measured latency stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LatencySource {
    /// Absent for node-wide aggregate formats such as `reads:`.
    pub namespace: Option<String>,
    pub operation: String,
}

impl LatencySource {
    /// Parse `{namespace}-operation` or a bare operation token.
    pub fn parse(key: &str) -> Result<Self, DecodeError> {
        let weird = || DecodeError::WeirdSourceKey(key.to_string());

        if let Some(rest) = key.strip_prefix('{') {
            let (namespace, operation) = rest.rsplit_once("}-").ok_or_else(weird)?;
            if namespace.is_empty() || !is_operation_token(operation) {
                return Err(weird());
            }
            return Ok(Self {
                namespace: Some(namespace.to_string()),
                operation: operation.to_string(),
            });
        }

        if !is_operation_token(key) {
            return Err(weird());
        }
        Ok(Self {
            namespace: None,
            operation: key.to_string(),
        })
    }
}

impl fmt::Display for LatencySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}-{}", ns, self.operation),
            None => f.write_str(&self.operation),
        }
    }
}

fn is_operation_token(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// A single `(column label, value)` pair from a data line.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub label: String,
    pub value: f64,
}

/// Columns of one source for one poll cycle, in header order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyBlock {
    pub measurements: Vec<Measurement>,
}

impl LatencyBlock {
    pub fn get(&self, label: &str) -> Option<f64> {
        self.measurements
            .iter()
            .find(|m| m.label == label)
            .map(|m| m.value)
    }

    pub fn ops_per_sec(&self) -> Option<f64> {
        self.get(OPS_PER_SEC)
    }

    /// Every column except `ops/sec`, as `(label, percentage)`.
    pub fn thresholds(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.measurements
            .iter()
            .filter(|m| m.label != OPS_PER_SEC)
            .map(|m| (m.label.as_str(), m.value))
    }
}

/// Decode a full report. Any malformed pair fails the whole report so that
/// a scrape never publishes a partial latency picture.
pub fn decode(raw: &str) -> Result<Vec<(LatencySource, LatencyBlock)>, DecodeError> {
    let mut blocks: Vec<(LatencySource, LatencyBlock)> = Vec::new();
    let mut lines = raw.split(';').filter(|line| !is_skippable(line));

    while let Some(header) = lines.next() {
        let (source, columns) = parse_header(header)?;
        let data = lines
            .next()
            .ok_or_else(|| DecodeError::MissingMeasurements(header.to_string()))?;
        let block = parse_data(&source, header, &columns, data)?;

        match blocks.iter_mut().find(|(s, _)| *s == source) {
            Some(slot) => slot.1 = block,
            None => blocks.push((source, block)),
        }
    }

    Ok(blocks)
}

fn is_skippable(line: &str) -> bool {
    line.trim().is_empty() || line.starts_with(PLACEHOLDER_PREFIX)
}

fn parse_header(line: &str) -> Result<(LatencySource, Vec<&str>), DecodeError> {
    let mut fields = line.split(',');
    let first = fields.next().unwrap_or_default();
    // drop the timestamp glued on after the first ':'
    let key = first.split_once(':').map_or(first, |(key, _)| key);
    let source = LatencySource::parse(key.trim())?;
    Ok((source, fields.map(str::trim).collect()))
}

fn parse_data(
    source: &LatencySource,
    header: &str,
    columns: &[&str],
    data: &str,
) -> Result<LatencyBlock, DecodeError> {
    let values: Vec<&str> = data.split(',').collect();
    if values.len() != columns.len() + 1 {
        return Err(DecodeError::InvalidFormat {
            header: header.to_string(),
            data: data.to_string(),
        });
    }

    let measurements = columns
        .iter()
        .zip(&values[1..])
        .map(|(label, raw)| {
            let value = raw.trim().parse::<f64>().map_err(|_| DecodeError::InvalidValue {
                key: source.to_string(),
                value: raw.to_string(),
            })?;
            Ok(Measurement {
                label: label.to_string(),
                value,
            })
        })
        .collect::<Result<Vec<_>, DecodeError>>()?;

    Ok(LatencyBlock { measurements })
}
