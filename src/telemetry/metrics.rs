//! Prometheus metrics setup and metric definitions

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle> {
    // Seconds; sub-millisecond buckets for cached permission checks
    let buckets = vec![
        0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .context("Failed to set histogram buckets")?
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}

/// Register metric descriptions and emit initial zero values so Prometheus output
/// includes HELP/TYPE lines for all metrics from startup.
pub fn describe_metrics() {
    // HTTP metrics
    describe_counter!("plangate_http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "plangate_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        "plangate_http_requests_in_flight",
        "Number of HTTP requests currently being processed"
    );

    // Permission engine metrics
    describe_counter!(
        "plangate_permission_checks_total",
        "Permission decisions by outcome (allow/deny/error)"
    );
    describe_counter!(
        "plangate_permission_cache_lookups_total",
        "Permission cache lookups by result (hit/miss)"
    );
    describe_counter!(
        "plangate_permission_cache_invalidations_total",
        "Permission cache invalidations by scope"
    );
    describe_counter!(
        "plangate_permission_cache_rejections_total",
        "Decisions not cached because the cache was full"
    );
    describe_gauge!(
        "plangate_permission_cache_entries",
        "Entries held by the permission cache after the last sweep"
    );

    counter!("plangate_permission_checks_total", "outcome" => "error").absolute(0);
    counter!("plangate_permission_cache_lookups_total", "result" => "hit").absolute(0);
    counter!("plangate_permission_cache_lookups_total", "result" => "miss").absolute(0);
    counter!("plangate_permission_cache_invalidations_total", "scope" => "all").absolute(0);
    gauge!("plangate_permission_cache_entries").set(0.0);
    gauge!("plangate_http_requests_in_flight").set(0.0);
}
