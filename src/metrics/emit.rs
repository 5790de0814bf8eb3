//! Walks decoded info responses against the catalog and produces samples.
//!
//! Keys missing from a response are normal (they depend on server version
//! and configuration) and are only logged at debug level.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::buckets;
use super::catalog::{MetricCatalog, MetricDesc};
use super::MetricSample;
use crate::error::DecodeError;
use crate::info::kv::{self, KeyValueRecord, RecordKind};
use crate::info::latency;

/// Mount entries look like `storage-engine.device[0]=/dev/sda`.
const STORAGE_PREFIX: &str = "storage-engine";

type Labels = Vec<(&'static str, String)>;

/// One sample per catalog entry present in `record`.
pub fn info_samples(descs: &[MetricDesc], record: &KeyValueRecord, labels: &Labels) -> Vec<MetricSample> {
    let mut samples = Vec::new();
    for desc in descs {
        let Some(raw) = record.get(desc.key) else {
            debug!(key = desc.key, "key not present");
            continue;
        };
        let Some(value) = kv::parse_float_or_bool(raw) else {
            warn!("{:?} invalid value {:?}", desc.key, raw);
            continue;
        };
        samples.push(MetricSample {
            name: desc.name.clone(),
            help: desc.help.to_string(),
            kind: desc.kind,
            labels: labels.clone(),
            value,
        });
    }
    samples
}

/// Entries of a `;`-separated list reply such as `namespaces` or `dcs`.
pub fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(';').map(str::trim).filter(|s| !s.is_empty())
}

// ─── statistics ──────────────────────────────────────────────────

pub fn node_samples(catalog: &MetricCatalog, raw: &str) -> Vec<MetricSample> {
    let record = kv::decode(raw, RecordKind::Flat);
    info_samples(&catalog.node, &record, &Vec::new())
}

// ─── namespace/<ns> ──────────────────────────────────────────────

/// Per-mount statistics of a namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct MountStats {
    pub mount: String,
    pub stats: KeyValueRecord,
}

/// Separate plain namespace keys from the per-device/file storage keys.
/// `storage-engine.device[0].write_q` is returned as `write_q` under the
/// mount named by `storage-engine.device[0]`.
pub fn split_storage(record: KeyValueRecord) -> (KeyValueRecord, Vec<MountStats>) {
    let mut standard = KeyValueRecord::new();
    let mut storage = KeyValueRecord::new();
    let mut mounts: Vec<(String, String)> = Vec::new();

    for (key, value) in record {
        if !key.starts_with(STORAGE_PREFIX) {
            standard.insert(key, value);
        } else if key.ends_with(']') {
            mounts.push((key, value));
        } else {
            storage.insert(key, value);
        }
    }
    mounts.sort();

    let mounts = mounts
        .into_iter()
        .map(|(prefix, mount)| {
            let prefix = format!("{prefix}.");
            let stats = storage
                .iter()
                .filter_map(|(k, v)| Some((k.strip_prefix(&prefix)?.to_string(), v.clone())))
                .collect();
            MountStats { mount, stats }
        })
        .collect();

    (standard, mounts)
}

pub fn namespace_samples(catalog: &MetricCatalog, namespace: &str, raw: &str) -> Vec<MetricSample> {
    let (standard, mounts) = split_storage(kv::decode(raw, RecordKind::Nested));

    let mut samples = info_samples(
        &catalog.namespace,
        &standard,
        &vec![("namespace", namespace.to_string())],
    );
    for MountStats { mount, stats } in mounts {
        samples.extend(info_samples(
            &catalog.namespace_storage,
            &stats,
            &vec![("namespace", namespace.to_string()), ("mount", mount)],
        ));
    }
    samples
}

// ─── sets ────────────────────────────────────────────────────────

/// `sets` replies hold one `:`-separated record per set.
pub fn set_samples(catalog: &MetricCatalog, raw: &str) -> Vec<MetricSample> {
    split_list(raw)
        .flat_map(|entry| {
            let record = kv::decode(entry, RecordKind::Nested);
            let labels = vec![
                ("namespace", field(&record, &["ns", "ns_name"])),
                ("set", field(&record, &["set", "set_name"])),
            ];
            info_samples(&catalog.set, &record, &labels)
        })
        .collect()
}

// ─── sindex ──────────────────────────────────────────────────────

/// One secondary index from the `sindex` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SindexEntry {
    pub namespace: String,
    pub name: String,
    pub set: String,
    pub bin: String,
    pub kind: String,
    pub index_type: String,
    pub path: String,
}

impl SindexEntry {
    /// Info command returning this index's statistics.
    pub fn stats_command(&self) -> String {
        format!("sindex/{}/{}", self.namespace, self.name)
    }

    fn labels(&self) -> Labels {
        vec![
            ("namespace", self.namespace.clone()),
            ("sindex", self.name.clone()),
            ("set", self.set.clone()),
            ("bin", self.bin.clone()),
            ("type", self.kind.clone()),
            ("indextype", self.index_type.clone()),
            ("path", self.path.clone()),
        ]
    }
}

pub fn sindex_entries(raw: &str) -> Vec<SindexEntry> {
    split_list(raw)
        .map(|entry| {
            let record = kv::decode(entry, RecordKind::Nested);
            SindexEntry {
                namespace: field(&record, &["ns"]),
                name: field(&record, &["indexname"]),
                set: field(&record, &["set"]),
                bin: field(&record, &["bin", "bins"]),
                kind: field(&record, &["type"]),
                index_type: field(&record, &["indextype"]),
                path: field(&record, &["path"]),
            }
        })
        .filter(|e| !e.namespace.is_empty() && !e.name.is_empty())
        .collect()
}

pub fn sindex_samples(catalog: &MetricCatalog, entry: &SindexEntry, raw: &str) -> Vec<MetricSample> {
    let record = kv::decode(raw, RecordKind::Nested);
    info_samples(&catalog.sindex, &record, &entry.labels())
}

// ─── dc/<dc> ─────────────────────────────────────────────────────

pub fn xdr_dc_samples(catalog: &MetricCatalog, dc: &str, raw: &str) -> Vec<MetricSample> {
    let record = kv::decode(raw, RecordKind::Nested);
    info_samples(&catalog.xdr_dc, &record, &vec![("dc", dc.to_string())])
}

// ─── latency: ────────────────────────────────────────────────────

/// Decode a latency report and emit raw percentages, ops/sec and the
/// estimated histogram for every exported operation. A decode failure
/// yields no samples at all.
///
/// Several legacy sources can resolve to the same operation (`writes_master`
/// and `writes` both map to `write`). The first one in the report is kept.
pub fn latency_samples(catalog: &MetricCatalog, raw: &str) -> Result<Vec<MetricSample>, DecodeError> {
    let blocks = latency::decode(raw)?;
    let mut samples = Vec::new();
    let mut emitted: HashSet<(&str, String)> = HashSet::new();

    for (source, block) in &blocks {
        let Some(desc) = catalog.latency(&source.operation) else {
            debug!(%source, "operation not exported");
            continue;
        };
        let op = desc.operation.as_str();
        let ns = source.namespace.clone().unwrap_or_default();
        if !emitted.insert((op, ns.clone())) {
            debug!(%source, operation = op, "already exported by an earlier source, skipping");
            continue;
        }
        let ns_label = || vec![("namespace", ns.clone())];

        for (threshold, pct) in block.thresholds() {
            samples.push(MetricSample::gauge(
                &desc.latency,
                &format!("{op} latency"),
                vec![("namespace", ns.clone()), ("threshold", threshold.to_string())],
                pct,
            ));
        }

        let Some(est) = buckets::estimate_block(block) else {
            debug!(%source, "no ops metric");
            continue;
        };

        samples.push(MetricSample::gauge(
            &desc.ops,
            &format!("{op} ops per second"),
            ns_label(),
            est.ops_per_sec,
        ));
        samples.push(MetricSample::gauge(
            &desc.count,
            &format!("{op} ops per second for histogram"),
            ns_label(),
            est.ops_per_sec,
        ));

        let bucket_help = format!("{op} latency histogram");
        for bucket in &est.buckets {
            samples.push(MetricSample::gauge(
                &desc.bucket,
                &bucket_help,
                vec![("namespace", ns.clone()), ("le", bucket.bound.clone())],
                bucket.leq_count,
            ));
        }
        samples.push(MetricSample::gauge(
            &desc.bucket,
            &bucket_help,
            vec![("namespace", ns.clone()), ("le", "+Inf".to_string())],
            est.overflow_count(),
        ));

        samples.push(MetricSample::gauge(
            &desc.sum,
            &format!("{op} sum of all buckets"),
            ns_label(),
            est.weighted_sum,
        ));
    }

    Ok(samples)
}

/// First present key among `keys`, or an empty label value.
fn field(record: &KeyValueRecord, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| record.get(*k))
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(samples: &'a [MetricSample], name: &str, labels: &[(&str, &str)]) -> Option<&'a MetricSample> {
        samples.iter().find(|s| {
            s.name == name && labels.iter().all(|(k, v)| s.label(k) == Some(*v))
        })
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_node_samples() {
        let catalog = MetricCatalog::default();
        let samples = node_samples(&catalog, "cluster_size=3;objects=42;free-pct-disk=oops;paxos_principal=BB9");
        assert_eq!(samples.len(), 2);

        let size = find(&samples, "aerospike_node_cluster_size", &[]).unwrap();
        assert_eq!(size.value, 3.0);
        assert!(size.labels.is_empty());
        assert!(find(&samples, "aerospike_node_free_pct_disk", &[]).is_none());
    }

    #[test]
    fn test_info_samples_kinds_and_bools() {
        let catalog = MetricCatalog::default();
        let samples = namespace_samples(&catalog, "test", "objects=10:stop_writes=false:hwm_breached=true:client_read_success=99");

        let objects = find(&samples, "aerospike_ns_objects", &[("namespace", "test")]).unwrap();
        assert_eq!(objects.value, 10.0);
        assert_eq!(objects.kind, crate::metrics::MetricKind::Gauge);

        let reads = find(&samples, "aerospike_ns_client_read_success", &[]).unwrap();
        assert_eq!(reads.kind, crate::metrics::MetricKind::Counter);

        assert_eq!(find(&samples, "aerospike_ns_stop_writes", &[]).unwrap().value, 0.0);
        assert_eq!(find(&samples, "aerospike_ns_hwm_breached", &[]).unwrap().value, 1.0);
    }

    #[test]
    fn test_split_storage() {
        let record = kv::decode(
            "objects=1;storage-engine=device;storage-engine.device[0]=/dev/sda;\
             storage-engine.device[0].write_q=4;storage-engine.device[1]=/dev/sdb;\
             storage-engine.device[1].write_q=7;storage-engine.device[10].write_q=99",
            RecordKind::Nested,
        );
        let (standard, mounts) = split_storage(record);
        assert_eq!(standard.len(), 1);
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0].mount, "/dev/sda");
        assert_eq!(mounts[0].stats.get("write_q").map(String::as_str), Some("4"));
        assert_eq!(mounts[0].stats.len(), 1);
        assert_eq!(mounts[1].mount, "/dev/sdb");
        assert_eq!(mounts[1].stats.get("write_q").map(String::as_str), Some("7"));
    }

    #[test]
    fn test_namespace_storage_samples() {
        let catalog = MetricCatalog::default();
        let samples = namespace_samples(
            &catalog,
            "bar",
            "objects=5;storage-engine.file[0]=/opt/bar.dat;storage-engine.file[0].defrag_q=12",
        );
        let defrag = find(&samples, "aerospike_ns_defrag_q", &[("namespace", "bar"), ("mount", "/opt/bar.dat")]).unwrap();
        assert_eq!(defrag.value, 12.0);
        assert!(find(&samples, "aerospike_ns_objects", &[("namespace", "bar")]).is_some());
    }

    #[test]
    fn test_set_samples() {
        let catalog = MetricCatalog::default();
        let raw = "ns=vk:set=user:objects=2501:memory_data_bytes=0:deleting=false;ns=vk:set=item:objects=3;";
        let samples = set_samples(&catalog, raw);
        let users = find(&samples, "aerospike_set_objects", &[("namespace", "vk"), ("set", "user")]).unwrap();
        assert_eq!(users.value, 2501.0);
        let items = find(&samples, "aerospike_set_objects", &[("set", "item")]).unwrap();
        assert_eq!(items.value, 3.0);
        assert_eq!(samples.len(), 3);
    }

    #[test]
    fn test_sindex_entries_and_samples() {
        let raw = "ns=test:set=demo:indexname=idx_age:num_bins=1:bins=age:type=NUMERIC:indextype=NONE:path=age:sync_state=synced;\
                   ns=test:indexname=idx_name:bin=name:type=STRING:indextype=DEFAULT:path=name";
        let entries = sindex_entries(raw);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].bin, "age");
        assert_eq!(entries[0].stats_command(), "sindex/test/idx_age");
        assert_eq!(entries[1].set, "");
        assert_eq!(entries[1].bin, "name");

        let catalog = MetricCatalog::default();
        let samples = sindex_samples(&catalog, &entries[0], "keys=10;entries=20;load_pct=100");
        let keys = find(&samples, "aerospike_sindex_keys", &[("sindex", "idx_age"), ("type", "NUMERIC")]).unwrap();
        assert_eq!(keys.value, 10.0);
        assert_eq!(keys.labels.len(), 7);
    }

    #[test]
    fn test_xdr_dc_samples() {
        let catalog = MetricCatalog::default();
        let samples = xdr_dc_samples(&catalog, "dc1", "dc_state=CLUSTER_UP:dc_timelag=2:dc_ship_success=100");
        assert_eq!(samples.len(), 2);
        assert!(find(&samples, "aerospike_xdr_dc_dc_timelag", &[("dc", "dc1")]).is_some());
    }

    #[test]
    fn test_latency_samples() {
        let catalog = MetricCatalog::default();
        let raw = "error-no-data-yet-or-back-too-small;\
                   {sys}-read:15:26:23-GMT,ops/sec,>1ms,>8ms,>64ms;15:26:33,54.4,1.10,0.55,0.00;\
                   batch-index:15:26:23-GMT,ops/sec,>1ms;15:26:33,1.0,0.0";
        let samples = latency_samples(&catalog, raw).unwrap();
        let ns = ("namespace", "sys");

        let raw_pct = find(&samples, "aerospike_latency_read", &[ns, ("threshold", ">8ms")]).unwrap();
        assert_eq!(raw_pct.value, 0.55);
        assert_eq!(find(&samples, "aerospike_ops_read", &[ns]).unwrap().value, 54.4);
        assert_eq!(find(&samples, "aerospike_latency_hist_read_count", &[ns]).unwrap().value, 54.4);

        let le1 = find(&samples, "aerospike_latency_hist_read_bucket", &[ns, ("le", "1")]).unwrap();
        assert!(approx(le1.value, 53.8016));
        let inf = find(&samples, "aerospike_latency_hist_read_bucket", &[ns, ("le", "+Inf")]).unwrap();
        assert_eq!(inf.value, 54.4);

        let sum = find(&samples, "aerospike_latency_hist_read_sum", &[ns]).unwrap();
        let g1 = 54.4 * 1.10 / 100.0;
        let g8 = 54.4 * 0.55 / 100.0;
        assert!(approx(sum.value, g1 + 0.5 * (54.4 - g1) + 8.0 * g8));

        // batch-index is not in the catalog
        assert!(samples.iter().all(|s| s.label("namespace") == Some("sys")));
    }

    #[test]
    fn test_latency_without_ops_emits_raw_only() {
        let catalog = MetricCatalog::default();
        let samples = latency_samples(&catalog, "{t}-write:1,>1ms,>8ms;2,3.0,1.0").unwrap();
        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(|s| s.name == "aerospike_latency_write"));
    }

    #[test]
    fn test_latency_legacy_aggregate_source() {
        let catalog = MetricCatalog::default();
        let samples = latency_samples(&catalog, "reads:14:08:38-GMT,ops/sec,>1ms;14:08:48,10.0,50.0").unwrap();
        let ops = find(&samples, "aerospike_ops_read", &[("namespace", "")]).unwrap();
        assert_eq!(ops.value, 10.0);
    }

    #[test]
    fn test_latency_aliases_keep_first_source() {
        let catalog = MetricCatalog::default();
        let raw = "writes_master:14:08:38-GMT,ops/sec,>1ms;14:08:48,3.0,10.0;\
                   writes:14:08:38-GMT,ops/sec,>1ms;14:08:48,4.0,20.0";
        let samples = latency_samples(&catalog, raw).unwrap();

        let ops: Vec<_> = samples.iter().filter(|s| s.name == "aerospike_ops_write").collect();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].value, 3.0);
        let pct = find(&samples, "aerospike_latency_write", &[("threshold", ">1ms")]).unwrap();
        assert_eq!(pct.value, 10.0);
        assert_eq!(samples.iter().filter(|s| s.name == "aerospike_latency_write").count(), 1);
    }

    #[test]
    fn test_latency_decode_failure_yields_nothing() {
        let catalog = MetricCatalog::default();
        let raw = "{sys}-read:1,ops/sec;2,1.0;{sys}-write:1,ops/sec,>1ms";
        assert!(matches!(
            latency_samples(&catalog, raw),
            Err(DecodeError::MissingMeasurements(_))
        ));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("test;bar;").collect::<Vec<_>>(), vec!["test", "bar"]);
        assert_eq!(split_list("").count(), 0);
    }
}
