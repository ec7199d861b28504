// =============================================================================
// METRICS MODULE
// =============================================================================
// Prometheus metrics for the warehouse ledger.
//
// LEARNING NOTES:
// - Prometheus scrapes GET /metrics; we only keep counters/gauges/histograms
//   in the global recorder installed by setup_metrics()
// - Labels add dimensions (endpoint="/api/v1/items/:id")
// - The HTTP metrics use the *matched* route, never the raw path, so ids in
//   the URL don't explode label cardinality
// =============================================================================

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// METRIC NAMES
// =============================================================================

/// Labels: method, endpoint, status
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";

/// Labels: method, endpoint
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

/// Quantity on hand after the last committed change.
/// Labels: item, floor
pub const GUDANG_STOCK_LEVEL: &str = "gudang_stock_level";

/// Labels: kind (credit/debit/set)
pub const LEDGER_ADJUSTMENTS_TOTAL: &str = "ledger_adjustments_total";

/// Stock that could not be put back while deleting a log, sale or sale item.
/// Labels: operation
pub const STOCK_RESTORE_WARNINGS_TOTAL: &str = "stock_restore_warnings_total";

/// Labels: operation
pub const DB_QUERY_DURATION_SECONDS: &str = "db_query_duration_seconds";

/// Labels: operation (get/set/delete/ping)
pub const REDIS_OPERATION_DURATION_SECONDS: &str = "redis_operation_duration_seconds";

// =============================================================================
// SETUP FUNCTION
// =============================================================================
/// Install the Prometheus recorder and return the handle used by GET /metrics.
pub fn setup_metrics() -> Result<PrometheusHandle> {
    // 1ms .. 10s
    let latency_buckets = &[
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full(DB_QUERY_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full(REDIS_OPERATION_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .install_recorder()?;

    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(HTTP_REQUEST_DURATION_SECONDS, "HTTP request latency in seconds");
    describe_gauge!(GUDANG_STOCK_LEVEL, "Current quantity per item and floor");
    describe_counter!(LEDGER_ADJUSTMENTS_TOTAL, "Stock ledger adjustments by kind");
    describe_counter!(
        STOCK_RESTORE_WARNINGS_TOTAL,
        "Deletions that could not restore stock for a line"
    );
    describe_histogram!(DB_QUERY_DURATION_SECONDS, "Database operation latency in seconds");
    describe_histogram!(REDIS_OPERATION_DURATION_SECONDS, "Redis operation latency in seconds");

    Ok(handle)
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================
// Without an installed recorder these are no-ops, which is what unit tests see.

pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(duration_secs);
}

pub fn set_stock_level(item_id: &str, floor_id: &str, quantity: i32) {
    gauge!(
        GUDANG_STOCK_LEVEL,
        "item" => item_id.to_string(),
        "floor" => floor_id.to_string()
    )
    .set(f64::from(quantity));
}

/// `kind` is one of "credit", "debit" or "set".
pub fn record_ledger_adjustment(kind: &str) {
    counter!(LEDGER_ADJUSTMENTS_TOTAL, "kind" => kind.to_string()).increment(1);
}

pub fn record_restore_warning(operation: &str) {
    counter!(STOCK_RESTORE_WARNINGS_TOTAL, "operation" => operation.to_string()).increment(1);
}

pub fn record_db_query(operation: &str, duration_secs: f64) {
    histogram!(
        DB_QUERY_DURATION_SECONDS,
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}

pub fn record_redis_operation(operation: &str, duration_secs: f64) {
    histogram!(
        REDIS_OPERATION_DURATION_SECONDS,
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}
