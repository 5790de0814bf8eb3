//! `key=value` record decoding for flat info responses.

use std::collections::HashMap;

/// Field name → raw value, as reported by the node.
pub type KeyValueRecord = HashMap<String, String>;

/// How fields are separated inside one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// `a=1;b=2` (node statistics)
    Flat,
    /// `a=1:b=2;c=3` (namespace, set and sindex records)
    Nested,
}

/// Decode a record set into a map. Never fails: segments without `=` are
/// section markers and get dropped. Later duplicates overwrite earlier ones.
pub fn decode(raw: &str, kind: RecordKind) -> KeyValueRecord {
    let mut record = KeyValueRecord::new();
    for segment in raw.split(';') {
        match kind {
            RecordKind::Flat => insert_pair(&mut record, segment),
            RecordKind::Nested => {
                for field in segment.split(':') {
                    insert_pair(&mut record, field);
                }
            }
        }
    }
    record
}

fn insert_pair(record: &mut KeyValueRecord, field: &str) {
    // values may carry their own '='
    if let Some((key, value)) = field.split_once('=') {
        record.insert(key.to_string(), value.to_string());
    }
}

/// Numeric value of an info field. Booleans map to 1 / 0.
pub fn parse_float_or_bool(value: &str) -> Option<f64> {
    if let Ok(f) = value.parse::<f64>() {
        return Some(f);
    }
    match value {
        "true" => Some(1.0),
        "false" => Some(0.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> KeyValueRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_single_field() {
        assert_eq!(
            decode("type=memory", RecordKind::Flat),
            record(&[("type", "memory")])
        );
    }

    #[test]
    fn test_flat_record() {
        let raw = "type=memory;objects=103;sub-objects=0;master-objects=103";
        assert_eq!(
            decode(raw, RecordKind::Flat),
            record(&[
                ("type", "memory"),
                ("objects", "103"),
                ("sub-objects", "0"),
                ("master-objects", "103"),
            ])
        );
    }

    #[test]
    fn test_embedded_equals_kept_in_value() {
        assert_eq!(
            decode("version=my=version", RecordKind::Flat),
            record(&[("version", "my=version")])
        );
    }

    #[test]
    fn test_nested_record() {
        let raw = "ns=vk:set=user:objects=2501:memory_data_bytes=0:deleting=false";
        assert_eq!(
            decode(raw, RecordKind::Nested),
            record(&[
                ("ns", "vk"),
                ("set", "user"),
                ("objects", "2501"),
                ("memory_data_bytes", "0"),
                ("deleting", "false"),
            ])
        );
    }

    #[test]
    fn test_flat_does_not_split_on_colon() {
        let decoded = decode("uptime=12:34;objects=7", RecordKind::Flat);
        assert_eq!(decoded.get("uptime").map(String::as_str), Some("12:34"));
        assert_eq!(decoded.get("objects").map(String::as_str), Some("7"));
    }

    #[test]
    fn test_segments_without_equals_dropped() {
        let decoded = decode("section;a=1;;b=2;garbage", RecordKind::Nested);
        assert_eq!(decoded, record(&[("a", "1"), ("b", "2")]));
        assert!(decode("", RecordKind::Flat).is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let decoded = decode("a=1;a=2", RecordKind::Flat);
        assert_eq!(decoded.get("a").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_parse_float_or_bool() {
        assert_eq!(parse_float_or_bool("6.12"), Some(6.12));
        assert_eq!(parse_float_or_bool("42"), Some(42.0));
        assert_eq!(parse_float_or_bool("true"), Some(1.0));
        assert_eq!(parse_float_or_bool("false"), Some(0.0));
        assert_eq!(parse_float_or_bool("generation"), None);
    }
}
