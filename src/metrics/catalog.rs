//! Static metric catalogs and the immutable lookup built from them.
//!
//! The tables list which info keys get exported and how. `MetricCatalog`
//! turns them into ready-to-use descriptors once at startup; every scrape
//! borrows the same catalog.

use std::collections::HashMap;

use serde::Serialize;

/// Prefix shared by every exported metric.
pub const METRIC_PREFIX: &str = "aerospike";

pub const SYSTEM_NODE: &str = "node";
pub const SYSTEM_NAMESPACE: &str = "ns";
pub const SYSTEM_SET: &str = "set";
pub const SYSTEM_SINDEX: &str = "sindex";
pub const SYSTEM_XDR_DC: &str = "xdr_dc";
pub const SYSTEM_LATENCY: &str = "latency";
pub const SYSTEM_LATENCY_HIST: &str = "latency_hist";
pub const SYSTEM_OPS: &str = "ops";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
}

/// One info key we export.
#[derive(Debug, Clone, Copy)]
pub struct InfoMetric {
    pub kind: MetricKind,
    pub key: &'static str,
    pub help: &'static str,
}

const fn gauge(key: &'static str, help: &'static str) -> InfoMetric {
    InfoMetric {
        kind: MetricKind::Gauge,
        key,
        help,
    }
}

const fn counter(key: &'static str, help: &'static str) -> InfoMetric {
    InfoMetric {
        kind: MetricKind::Counter,
        key,
        help,
    }
}

// ─── Tables ──────────────────────────────────────────────────────

/// Keys from `statistics`.
pub const NODE_METRICS: &[InfoMetric] = &[
    gauge("cluster_size", "cluster size, as reported by this node"),
    gauge("free-pct-disk", "disk free %"),
    gauge("free-pct-memory", "memory free %"),
    gauge("migrate_rx_objs", "cluster wide migrate rx objects"),
    gauge("migrate_tx_objs", "cluster wide migrate tx objects"),
    gauge("objects", "objects per node"),
    gauge("client_connections", "client connections per node"),
    gauge("heartbeat_connections", "heartbeat connections per node"),
    gauge("fabric_connections", "fabric connections per node"),
    gauge("system_free_mem_pct", "system free memory %"),
    gauge("process_cpu_pct", "process cpu %"),
    gauge("uptime", "seconds since the node started"),
    counter("stat_evicted_objects", "evicted objects"),
    counter("stat_expired_objects", "expired objects"),
    counter("reaped_fds", "idle client connections closed"),
];

/// Keys from `namespace/<ns>`.
pub const NAMESPACE_METRICS: &[InfoMetric] = &[
    counter("batch_sub_proxy_complete", "batch sub proxy complete"),
    counter("batch_sub_proxy_error", "batch sub proxy error"),
    counter("batch_sub_proxy_timeout", "batch sub proxy timeout"),
    counter("batch_sub_read_error", "batch sub read error"),
    counter("batch_sub_read_not_found", "batch sub read not found"),
    counter("batch_sub_read_success", "batch sub read success"),
    counter("batch_sub_read_timeout", "batch sub read timeout"),
    counter("batch_sub_tsvc_error", "batch sub tsvc error"),
    counter("batch_sub_tsvc_timeout", "batch sub tsvc timeout"),
    counter("client_delete_error", "client delete error"),
    counter("client_delete_not_found", "client delete not found"),
    counter("client_delete_success", "client delete success"),
    counter("client_delete_timeout", "client delete timeout"),
    counter("client_lang_delete_success", "client lang delete success"),
    counter("client_lang_error", "client lang error"),
    counter("client_lang_read_success", "client lang read success"),
    counter("client_lang_write_success", "client lang write success"),
    counter("client_proxy_complete", "client proxy complete"),
    counter("client_proxy_error", "client proxy error"),
    counter("client_proxy_timeout", "client proxy timeout"),
    counter("client_read_error", "client read error"),
    counter("client_read_not_found", "client read not found"),
    counter("client_read_success", "client read success"),
    counter("client_read_timeout", "client read timeout"),
    counter("client_tsvc_error", "client tsvc error"),
    counter("client_tsvc_timeout", "client tsvc timeout"),
    counter("client_udf_complete", "client udf complete"),
    counter("client_udf_error", "client udf error"),
    counter("client_udf_timeout", "client udf timeout"),
    counter("client_write_error", "client write error"),
    counter("client_write_success", "client write success"),
    counter("client_write_timeout", "client write timeout"),
    counter("evicted_objects", "evicted objects"),
    counter("expired_objects", "expired objects"),
    counter("fail_generation", "fail generation"),
    counter("fail_key_busy", "fail key busy"),
    counter("fail_record_too_big", "fail record too big"),
    counter("fail_xdr_forbidden", "fail xdr forbidden"),
    counter("from_proxy_delete_error", "from proxy delete error"),
    counter("from_proxy_delete_not_found", "from proxy delete not found"),
    counter("from_proxy_delete_success", "from proxy delete success"),
    counter("from_proxy_delete_timeout", "from proxy delete timeout"),
    counter("from_proxy_read_error", "from proxy read error"),
    counter("from_proxy_read_not_found", "from proxy read not found"),
    counter("from_proxy_read_success", "from proxy read success"),
    counter("from_proxy_read_timeout", "from proxy read timeout"),
    counter("from_proxy_tsvc_error", "from proxy tsvc error"),
    counter("from_proxy_tsvc_timeout", "from proxy tsvc timeout"),
    counter("from_proxy_write_error", "from proxy write error"),
    counter("from_proxy_write_success", "from proxy write success"),
    counter("from_proxy_write_timeout", "from proxy write timeout"),
    counter("geo_region_query_cells", "geo region query cells"),
    counter("geo_region_query_falsepos", "geo region query falsepos"),
    counter("geo_region_query_points", "geo region query points"),
    counter("geo_region_query_reqs", "geo region query reqs"),
    counter("query_agg_abort", "query agg abort"),
    counter("query_agg_avg_rec_count", "query agg avg rec count"),
    counter("query_agg_error", "query agg error"),
    counter("query_agg_success", "query agg success"),
    counter("query_agg", "query agg"),
    counter("query_fail", "query fail"),
    counter("query_long_queue_full", "query long queue full"),
    counter("query_long_reqs", "query long reqs"),
    counter("query_lookup_abort", "query lookup abort"),
    counter("query_lookup_avg_rec_count", "query lookup avg rec count"),
    counter("query_lookup_error", "query lookup error"),
    counter("query_lookup_success", "query lookup success"),
    counter("query_lookups", "query lookups"),
    counter("query_reqs", "query reqs"),
    counter("query_short_queue_full", "query short queue full"),
    counter("query_short_reqs", "query short reqs"),
    counter("query_udf_bg_failure", "query udf bg failure"),
    counter("query_udf_bg_success", "query udf bg success"),
    counter("retransmit_batch_sub_dup_res", "retransmit batch sub dup res"),
    counter("retransmit_client_delete_dup_res", "retransmit client delete dup res"),
    counter("retransmit_client_delete_repl_write", "retransmit client delete repl write"),
    counter("retransmit_client_read_dup_res", "retransmit client read dup res"),
    counter("retransmit_client_udf_dup_res", "retransmit client udf dup res"),
    counter("retransmit_client_udf_repl_write", "retransmit client udf repl write"),
    counter("retransmit_client_write_dup_res", "retransmit client write dup res"),
    counter("retransmit_client_write_repl_write", "retransmit client write repl write"),
    counter("retransmit_nsup_repl_write", "retransmit nsup repl write"),
    counter("retransmit_udf_sub_dup_res", "retransmit udf sub dup res"),
    counter("retransmit_udf_sub_repl_write", "retransmit udf sub repl write"),
    counter("scan_aggr_abort", "scan aggr abort"),
    counter("scan_aggr_complete", "scan aggr complete"),
    counter("scan_aggr_error", "scan aggr error"),
    counter("scan_basic_abort", "scan basic abort"),
    counter("scan_basic_complete", "scan basic complete"),
    counter("scan_basic_error", "scan basic error"),
    counter("scan_udf_bg_abort", "scan udf bg abort"),
    counter("scan_udf_bg_complete", "scan udf bg complete"),
    counter("scan_udf_bg_error", "scan udf bg error"),
    counter("udf_sub_lang_delete_success", "udf sub lang delete success"),
    counter("udf_sub_lang_error", "udf sub lang error"),
    counter("udf_sub_lang_read_success", "udf sub lang read success"),
    counter("udf_sub_lang_write_success", "udf sub lang write success"),
    counter("udf_sub_tsvc_error", "udf sub tsvc error"),
    counter("udf_sub_tsvc_timeout", "udf sub tsvc timeout"),
    counter("udf_sub_udf_complete", "udf sub udf complete"),
    counter("udf_sub_udf_error", "udf sub udf error"),
    counter("udf_sub_udf_timeout", "udf sub udf timeout"),
    counter("xdr_write_error", "xdr write error"),
    counter("xdr_write_success", "xdr write success"),
    counter("xdr_write_timeout", "xdr write timeout"),
    gauge("available_bin_names", "available bin names"),
    gauge("device_available_pct", "device available pct"),
    gauge("device_compression_ratio", "device compression ratio"),
    gauge("device_free_pct", "device free pct"),
    gauge("device_total_bytes", "device total bytes"),
    gauge("device_used_bytes", "device used bytes"),
    gauge("effective_is_quiesced", "effective is quiesced"),
    gauge("effective_replication_factor", "effective replication factor"),
    gauge("evict-hist-buckets", "evict hist buckets"),
    gauge("evict-tenths-pct", "evict tenths pct"),
    gauge("high-water-disk-pct", "high water disk pct"),
    gauge("high-water-memory-pct", "high water memory pct"),
    gauge("hwm_breached", "hwm breached"),
    gauge("index_flash_used_bytes", "index flash used bytes"),
    gauge("index_flash_used_pct", "index flash used pct"),
    gauge("index-type.mounts-high-water-pct", "index type mounts high water pct"),
    gauge("index-type.mounts-size-limit", "index type mounts size limit"),
    gauge("master_objects", "master objects"),
    gauge("master_tombstones", "master tombstones"),
    gauge("memory_free_pct", "memory free pct"),
    gauge("memory_used_bytes", "memory used bytes"),
    gauge("memory_used_data_bytes", "memory used data bytes"),
    gauge("memory_used_index_bytes", "memory used index bytes"),
    gauge("memory_used_sindex_bytes", "memory used sindex bytes"),
    gauge("memory-size", "memory size"),
    gauge("migrate_record_receives", "migrate record receives"),
    gauge("migrate_record_retransmits", "migrate record retransmits"),
    gauge("migrate_records_skipped", "migrate records skipped"),
    gauge("migrate_records_transmitted", "migrate records transmitted"),
    gauge("migrate_rx_instances", "migrate rx instances"),
    gauge("migrate_rx_partitions_active", "migrate rx partitions active"),
    gauge("migrate_rx_partitions_initial", "migrate rx partitions initial"),
    gauge("migrate_rx_partitions_remaining", "migrate rx partitions remaining"),
    gauge("migrate_signals_active", "migrate signals active"),
    gauge("migrate_signals_remaining", "migrate signals remaining"),
    gauge("migrate_tx_instances", "migrate tx instances"),
    gauge("migrate_tx_partitions_active", "migrate tx partitions active"),
    gauge("migrate_tx_partitions_imbalance", "migrate tx partitions imbalance"),
    gauge("migrate_tx_partitions_initial", "migrate tx partitions initial"),
    gauge("migrate_tx_partitions_remaining", "migrate tx partitions remaining"),
    gauge("n_nodes_quiesced", "n nodes quiesced"),
    gauge("non_expirable_objects", "non expirable objects"),
    gauge("non_replica_objects", "non replica objects"),
    gauge("non_replica_tombstones", "non replica tombstones"),
    gauge("ns_cluster_size", "ns cluster size"),
    gauge("objects", "objects"),
    gauge("pending_quiesce", "pending quiesce"),
    gauge("prole_objects", "prole objects"),
    gauge("prole_tombstones", "prole tombstones"),
    gauge("replication-factor", "replication factor"),
    gauge("stop_writes", "stop writes"),
    gauge("stop-writes-pct", "stop writes pct"),
    gauge("tombstones", "tombstones"),
    gauge("clock_skew_stop_writes", "clock skew stop writes"),
    gauge("dead_partitions", "dead partitions"),
    gauge("unavailable_partitions", "unavailable partitions"),
    gauge("rack-id", "rack id"),
];

/// Per-mount keys under `storage-engine.device[i]` / `storage-engine.file[i]`.
pub const NAMESPACE_STORAGE_METRICS: &[InfoMetric] = &[
    counter("defrag_reads", "defrag reads"),
    counter("defrag_writes", "defrag writes"),
    gauge("shadow_write_q", "shadow write queue"),
    gauge("defrag_q", "defrag queue"),
    gauge("write_q", "write queue"),
];

/// Keys from `sets`.
pub const SET_METRICS: &[InfoMetric] = &[
    gauge("objects", "objects"),
    gauge("tombstones", "tombstones"),
    gauge("memory_data_bytes", "memory data bytes"),
    counter("stop-writes-count", "stop writes count"),
];

/// Keys from `sindex/<ns>/<name>`.
pub const SINDEX_METRICS: &[InfoMetric] = &[
    gauge("keys", "keys"),
    gauge("entries", "entries"),
    gauge("ibtr_memory_used", "ibtr memory used"),
    gauge("nbtr_memory_used", "nbtr memory used"),
    gauge("si_accounted_memory", "si accounted memory"),
    gauge("load_pct", "load pct"),
    counter("loadtime", "loadtime"),
    counter("write_success", "write success"),
    counter("write_error", "write error"),
    counter("delete_success", "delete success"),
    counter("delete_error", "delete error"),
    counter("stat_gc_recs", "stat gc recs"),
    counter("stat_gc_time", "stat gc time"),
    counter("query_reqs", "query reqs"),
    gauge("query_avg_rec_count", "query avg rec count"),
    gauge("query_avg_record_size", "query avg record size"),
    counter("query_agg", "query agg"),
    gauge("query_agg_avg_rec_count", "query agg avg rec count"),
    gauge("query_agg_avg_record_size", "query agg avg record size"),
    counter("query_lookups", "query lookups"),
    gauge("query_lookup_avg_rec_count", "query lookup avg rec count"),
    gauge("query_lookup_avg_record_size", "query lookup avg record size"),
];

/// Keys from `dc/<dc>`.
pub const XDR_DC_METRICS: &[InfoMetric] = &[
    gauge("dc_as_open_conn", "Number of open connection to the Aerospike DC."),
    gauge("dc_as_size", "The cluster size of the destination Aerospike DC."),
    gauge("dc_http_good_locations", "Number of URLs that are considered healthy."),
    gauge("dc_http_locations", "Number of URLs configured for the HTTP destination."),
    counter("dc_ship_attempt", "Number of records that have been attempted to be shipped."),
    counter("dc_ship_bytes", "Number of bytes shipped for this DC."),
    counter("dc_ship_delete_success", "Number of delete transactions that have been successfully shipped."),
    counter("dc_ship_destination_error", "Number of errors from the remote cluster(s) while shipping records for this DC."),
    gauge("dc_ship_idle_avg", "Average number of ms of sleep for each record being shipped."),
    gauge("dc_ship_idle_avg_pct", "Representation in percent of total time spent for dc_ship_idle_avg."),
    gauge("dc_ship_inflight_objects", "Number of records that are inflight."),
    gauge("dc_ship_latency_avg", "Moving average of shipping latency for the specific DC."),
    counter("dc_ship_source_error", "Number of client layer errors while shipping records for this DC."),
    counter("dc_ship_success", "Number of records that have been successfully shipped."),
    gauge("dc_timelag", "Time lag for this specific DC."),
];

/// Default operations exported from the latency report.
pub const DEFAULT_LATENCY_OPS: &[&str] = &["read", "write", "udf", "query", "proxy", "query-rec-count"];

/// Operation names used by older aggregate (`reads:`) reports.
const LATENCY_ALIASES: &[(&str, &str)] = &[
    ("reads", "read"),
    ("writes_master", "write"),
    ("writes", "write"),
    ("udfs", "udf"),
    ("queries", "query"),
    ("proxies", "proxy"),
];

// ─── Descriptors ─────────────────────────────────────────────────

/// A catalog entry with its exported name resolved.
#[derive(Debug, Clone)]
pub struct MetricDesc {
    pub key: &'static str,
    pub name: String,
    pub help: &'static str,
    pub kind: MetricKind,
}

impl MetricDesc {
    fn new(system: &str, m: &InfoMetric) -> Self {
        Self {
            key: m.key,
            name: promkey(system, m.key),
            help: m.help,
            kind: m.kind,
        }
    }
}

/// Names exported for one latency operation.
#[derive(Debug, Clone)]
pub struct LatencyDesc {
    pub operation: String,
    /// Raw percentage per threshold
    pub latency: String,
    pub ops: String,
    pub bucket: String,
    pub count: String,
    pub sum: String,
}

impl LatencyDesc {
    fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            latency: promkey(SYSTEM_LATENCY, operation),
            ops: promkey(SYSTEM_OPS, operation),
            bucket: promkey(SYSTEM_LATENCY_HIST, &format!("{operation}_bucket")),
            count: promkey(SYSTEM_LATENCY_HIST, &format!("{operation}_count")),
            sum: promkey(SYSTEM_LATENCY_HIST, &format!("{operation}_sum")),
        }
    }
}

/// Everything the emitter needs to name metrics, built once.
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    pub node: Vec<MetricDesc>,
    pub namespace: Vec<MetricDesc>,
    pub namespace_storage: Vec<MetricDesc>,
    pub set: Vec<MetricDesc>,
    pub sindex: Vec<MetricDesc>,
    pub xdr_dc: Vec<MetricDesc>,
    latency: HashMap<String, LatencyDesc>,
}

impl MetricCatalog {
    pub fn new<S: AsRef<str>>(latency_ops: &[S]) -> Self {
        let build = |system: &str, table: &[InfoMetric]| -> Vec<MetricDesc> {
            table.iter().map(|m| MetricDesc::new(system, m)).collect()
        };

        Self {
            node: build(SYSTEM_NODE, NODE_METRICS),
            namespace: build(SYSTEM_NAMESPACE, NAMESPACE_METRICS),
            namespace_storage: build(SYSTEM_NAMESPACE, NAMESPACE_STORAGE_METRICS),
            set: build(SYSTEM_SET, SET_METRICS),
            sindex: build(SYSTEM_SINDEX, SINDEX_METRICS),
            xdr_dc: build(SYSTEM_XDR_DC, XDR_DC_METRICS),
            latency: latency_ops
                .iter()
                .map(|op| (op.as_ref().to_string(), LatencyDesc::new(op.as_ref())))
                .collect(),
        }
    }

    /// Descriptor for a reported operation, resolving legacy aliases.
    /// `None` means the operation is not exported.
    pub fn latency(&self, operation: &str) -> Option<&LatencyDesc> {
        if let Some(desc) = self.latency.get(operation) {
            return Some(desc);
        }
        LATENCY_ALIASES
            .iter()
            .find(|(alias, _)| *alias == operation)
            .and_then(|(_, canonical)| self.latency.get(*canonical))
    }

    pub fn latency_operations(&self) -> impl Iterator<Item = &str> {
        self.latency.keys().map(String::as_str)
    }
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY_OPS)
    }
}

/// Exported metric name for an info key: `aerospike_<system>_<key>` with
/// anything outside `[a-zA-Z0-9_]` replaced by `_`.
pub fn promkey(system: &str, key: &str) -> String {
    let key: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("{METRIC_PREFIX}_{system}_{key}")
}
