//! Prometheus metrics for the embedded admin API and the core pipeline
//! (spec component P / §4.L).
//!
//! HTTP-surface metrics live here; the domain metrics (candidates
//! evaluated, indexer queries, injections, ...) are defined in
//! `xseed_core::metrics` and folded into this process's registry so
//! `/metrics` serves both from one endpoint.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Registry, TextEncoder,
};

/// Global metrics registry for this process.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "xseed_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new("xseed_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "xseed_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures against the admin API.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new("xseed_auth_failures_total", "Total admin API authentication failures"),
        &["reason"],
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    registry.register(Box::new(HTTP_REQUEST_DURATION.clone())).unwrap();
    registry.register(Box::new(HTTP_REQUESTS_TOTAL.clone())).unwrap();
    registry.register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone())).unwrap();
    registry.register(Box::new(AUTH_FAILURES_TOTAL.clone())).unwrap();

    for metric in xseed_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode every registered metric as Prometheus text format, for the
/// admin API's `/metrics` endpoint.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Replaces path segments that look like ids (infohashes, numeric ids)
/// with placeholders, so per-path HTTP metrics don't create one
/// timeseries per searchee.
pub fn normalize_path(path: &str) -> String {
    let hash_regex = regex_lite::Regex::new(r"[0-9a-fA-F]{40}").unwrap();
    let numeric_regex = regex_lite::Regex::new(r"/\d+(/|$)").unwrap();

    let result = hash_regex.replace_all(path, "{hash}");
    let result = numeric_regex.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_infohash_segments() {
        let path = "/api/v1/indexers/a94a8fe5ccb19ba61c4c0873d391e987982fbbd3";
        assert_eq!(normalize_path(path), "/api/v1/indexers/{hash}");
    }

    #[test]
    fn normalizes_numeric_segments() {
        assert_eq!(normalize_path("/api/v1/indexers/12"), "/api/v1/indexers/{id}");
    }

    #[test]
    fn leaves_plain_paths_alone() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
    }

    #[test]
    fn encode_metrics_returns_prometheus_text_format() {
        HTTP_REQUESTS_TOTAL.with_label_values(&["GET", "/test", "200"]).inc();
        let output = encode_metrics();
        assert!(output.contains("xseed_http_requests_total"));
        assert!(output.contains("# HELP"));
    }
}
