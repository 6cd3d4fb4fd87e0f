// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the authgate operator.
//!
//! All metrics live under the `authgate_dev_` prefix (prometheus-safe version
//! of "authgate.dev") and are served from `/metrics` on the metrics address.
//!
//! # Metrics Categories
//!
//! - **Event Metrics** - Authorizator events by kind and outcome
//! - **Managed Object Metrics** - create/replace/delete operations on the managed set
//! - **Proxy Metrics** - management proxy requests and replica calls

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

/// Namespace prefix for all authgate metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "authgate_dev";

/// Global Prometheus metrics registry
///
/// All metrics are registered here and exposed via the `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Event Metrics
// ============================================================================

/// Total number of authorizator events by kind and outcome
///
/// Labels:
/// - `event`: `added`, `modified`, `deleted`
/// - `outcome`: `success`, `rejected`, `error`
pub static EVENTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_events_total"),
        "Total number of authorizator events by kind and outcome",
    );
    let counter = CounterVec::new(opts, &["event", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of event workflows in seconds
///
/// Labels:
/// - `event`: `added`, `modified`, `deleted`
pub static EVENT_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_event_duration_seconds"),
        "Duration of event workflows in seconds by event kind",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]);
    let histogram = HistogramVec::new(opts, &["event"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Managed Object Metrics
// ============================================================================

/// Total operations against managed objects
///
/// Labels:
/// - `kind`: managed object kind (`Deployment`, `Service`, ...)
/// - `op`: `create`, `replace`, `delete`
/// - `outcome`: `success`, `error`
pub static MANAGED_OBJECT_OPS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_managed_object_ops_total"),
        "Total operations against managed objects by kind, op and outcome",
    );
    let counter = CounterVec::new(opts, &["kind", "op", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Proxy Metrics
// ============================================================================

/// Total management proxy requests
///
/// Labels:
/// - `verb`: `get`, `put`, `post`
/// - `mode`: `fan_out`, `single`
/// - `outcome`: `success`, `error`
pub static PROXY_REQUESTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_proxy_requests_total"),
        "Total management proxy requests by verb, mode and outcome",
    );
    let counter = CounterVec::new(opts, &["verb", "mode", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total individual replica calls made during fan-outs
///
/// Labels:
/// - `outcome`: `success`, `error`
pub static REPLICA_CALLS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_replica_calls_total"),
        "Total individual replica calls made during fan-outs by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record an event workflow outcome
pub fn record_event(event: &str, outcome: &str, duration: Duration) {
    EVENTS_TOTAL.with_label_values(&[event, outcome]).inc();
    EVENT_DURATION_SECONDS
        .with_label_values(&[event])
        .observe(duration.as_secs_f64());
}

/// Record an operation against a managed object
pub fn record_managed_op(kind: &str, op: &str, success: bool) {
    let outcome = if success { "success" } else { "error" };
    MANAGED_OBJECT_OPS_TOTAL
        .with_label_values(&[kind, op, outcome])
        .inc();
}

/// Record a management proxy request
pub fn record_proxy_request(verb: &str, fan_out: bool, success: bool) {
    let mode = if fan_out { "fan_out" } else { "single" };
    let outcome = if success { "success" } else { "error" };
    PROXY_REQUESTS_TOTAL
        .with_label_values(&[verb, mode, outcome])
        .inc();
}

/// Record one replica call within a fan-out
pub fn record_replica_call(success: bool) {
    let outcome = if success { "success" } else { "error" };
    REPLICA_CALLS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

/// Serve `/metrics` on the given address until the process exits.
///
/// # Errors
/// Returns error if the listener cannot bind.
pub async fn serve_metrics(addr: &str) -> anyhow::Result<()> {
    async fn metrics_handler() -> (axum::http::StatusCode, String) {
        match gather_metrics() {
            Ok(body) => (axum::http::StatusCode::OK, body),
            Err(e) => (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                format!("metrics encoding failed: {e}"),
            ),
        }
    }

    let app = axum::Router::new().route("/metrics", axum::routing::get(metrics_handler));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_event() {
        record_event("added", "success", Duration::from_millis(500));

        let counter = EVENTS_TOTAL.with_label_values(&["added", "success"]);
        assert!(counter.get() > 0.0);

        let histogram = EVENT_DURATION_SECONDS.with_label_values(&["added"]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_proxy_request() {
        record_proxy_request("post", true, true);

        let counter = PROXY_REQUESTS_TOTAL.with_label_values(&["post", "fan_out", "success"]);
        assert!(counter.get() > 0.0);
    }

    #[test]
    fn test_gather_metrics() {
        record_event("gather-test", "success", Duration::from_millis(100));

        let result = gather_metrics();
        assert!(result.is_ok(), "Gathering metrics should succeed");

        let metrics_text = result.unwrap();
        assert!(
            metrics_text.contains("authgate_dev"),
            "Metrics should contain namespace prefix"
        );
        assert!(
            metrics_text.contains("events_total"),
            "Metrics should contain the event counter"
        );
    }
}
