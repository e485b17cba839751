use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub slow_query_ms: u64,
    pub query_log_path: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        let slow = std::env::var("NEXUS_QUERY_SLOW_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(500);
        Self { slow_query_ms: slow, query_log_path: None }
    }
}

#[derive(Default)]
pub struct Metrics {
    pub requests_total: AtomicU64,
    pub requests_slow_total: AtomicU64,
    pub bulk_requests_total: AtomicU64,
    pub bulk_failures_total: AtomicU64,
    pub scroll_pages_total: AtomicU64,
    pub transport_errors_total: AtomicU64,
}

#[derive(Default)]
pub struct Telemetry {
    pub cfg: RwLock<TelemetryConfig>,
    pub metrics: Metrics,
    // In-memory copy of request log lines, for tests
    request_sink: RwLock<Option<Arc<RwLock<Vec<String>>>>>,
}

pub(crate) static TELEMETRY: std::sync::LazyLock<Telemetry> =
    std::sync::LazyLock::new(Telemetry::default);

pub fn set_query_log(path: PathBuf, slow_query_ms: Option<u64>) {
    let mut w = TELEMETRY.cfg.write();
    w.query_log_path = Some(path);
    if let Some(ms) = slow_query_ms {
        w.slow_query_ms = ms;
    }
}

pub fn clear_query_log() {
    TELEMETRY.cfg.write().query_log_path = None;
}

pub fn set_slow_query_ms(ms: u64) {
    TELEMETRY.cfg.write().slow_query_ms = ms;
}

pub fn set_request_sink_for_tests(sink: Arc<RwLock<Vec<String>>>) {
    *TELEMETRY.request_sink.write() = Some(sink);
}

fn write_line(path: &Path, line: &str) -> std::io::Result<()> {
    use std::io::Write;
    let mut f = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(f, "{line}")
}

fn now_ts() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[must_use]
pub fn sha256_hex(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut h = Sha256::new();
    h.update(input.as_bytes());
    let out = h.finalize();
    hex::encode(out)
}

/// Count one executed request and, when a query log is configured, append a JSON line with
/// the body hash. Returns whether the request counted as slow.
pub fn log_request(operation: &str, index: &str, body: &serde_json::Value, duration_ms: u128) -> bool {
    TELEMETRY.metrics.requests_total.fetch_add(1, Ordering::Relaxed);
    let cfg = TELEMETRY.cfg.read().clone();
    let slow = match u64::try_from(duration_ms) {
        Ok(ms) => ms >= cfg.slow_query_ms,
        Err(_) => true,
    };
    if slow {
        TELEMETRY.metrics.requests_slow_total.fetch_add(1, Ordering::Relaxed);
        log::warn!("slow {operation} on {index}: {duration_ms}ms");
    }
    log::debug!(
        target: crate::logger::METRICS_TARGET,
        "op={operation} index={index} duration_ms={duration_ms} slow={slow}"
    );
    let sink = TELEMETRY.request_sink.read().clone();
    if cfg.query_log_path.is_none() && sink.is_none() {
        return slow;
    }
    let line = serde_json::json!({
        "ts": now_ts(),
        "op": operation,
        "index": index,
        "body_hash": sha256_hex(&body.to_string()),
        "duration_ms": u64::try_from(duration_ms).unwrap_or(u64::MAX),
        "slow": slow
    })
    .to_string();
    if let Some(sink) = sink {
        sink.write().push(line.clone());
    }
    if let Some(path) = cfg.query_log_path.as_ref()
        && let Err(e) = write_line(path, &line)
    {
        log::warn!("query log write to {} failed: {e}", path.display());
    }
    slow
}

pub fn record_bulk(failed: bool) {
    TELEMETRY.metrics.bulk_requests_total.fetch_add(1, Ordering::Relaxed);
    if failed {
        TELEMETRY.metrics.bulk_failures_total.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_scroll_page() {
    TELEMETRY.metrics.scroll_pages_total.fetch_add(1, Ordering::Relaxed);
}

pub fn record_transport_error(operation: &str) {
    TELEMETRY.metrics.transport_errors_total.fetch_add(1, Ordering::Relaxed);
    log::warn!("transport error during {operation}");
}

#[must_use]
pub fn metrics_text() -> String {
    // OpenMetrics/Prometheus exposition format (no types/HELP for brevity)
    let m = &TELEMETRY.metrics;
    format!(
        "nexus_query_requests_total {}\n\
         nexus_query_requests_slow_total {}\n\
         nexus_query_bulk_requests_total {}\n\
         nexus_query_bulk_failures_total {}\n\
         nexus_query_scroll_pages_total {}\n\
         nexus_query_transport_errors_total {}\n",
        m.requests_total.load(Ordering::Relaxed),
        m.requests_slow_total.load(Ordering::Relaxed),
        m.bulk_requests_total.load(Ordering::Relaxed),
        m.bulk_failures_total.load(Ordering::Relaxed),
        m.scroll_pages_total.load(Ordering::Relaxed),
        m.transport_errors_total.load(Ordering::Relaxed),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_hash_is_stable_hex() {
        let a = sha256_hex("{\"query\":{}}");
        assert_eq!(a.len(), 64);
        assert_eq!(a, sha256_hex("{\"query\":{}}"));
        assert_ne!(a, sha256_hex("{}"));
    }

    #[test]
    fn query_log_lines_carry_body_hash() {
        let path = crate::test_support::temp_path("nq_query_log", "jsonl");
        set_query_log(path.clone(), None);
        let body = serde_json::json!({"query": {"match_all": {}}});
        log_request("search", "query_log_hash_idx", &body, 1);
        clear_query_log();
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        let lines: Vec<serde_json::Value> = text
            .lines()
            .filter_map(|l| serde_json::from_str(l).ok())
            .filter(|l: &serde_json::Value| l["index"] == "query_log_hash_idx")
            .collect();
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line["op"], "search");
        assert_eq!(line["body_hash"], sha256_hex(&body.to_string()));
    }

    #[test]
    fn write_line_reports_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_line(dir.path(), "{}").is_err());
        let missing = dir.path().join("no_such_dir").join("q.jsonl");
        assert!(write_line(&missing, "{}").is_err());
        assert!(!missing.exists());
    }

    #[test]
    fn metrics_text_lists_every_counter() {
        record_scroll_page();
        let text = metrics_text();
        for name in [
            "nexus_query_requests_total",
            "nexus_query_requests_slow_total",
            "nexus_query_bulk_requests_total",
            "nexus_query_bulk_failures_total",
            "nexus_query_scroll_pages_total",
            "nexus_query_transport_errors_total",
        ] {
            assert!(text.contains(name), "{name}");
        }
    }
}
