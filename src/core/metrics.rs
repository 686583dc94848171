//! Prometheus metrics for monitoring the chat gateway.
//!
//! Metrics are observational only; nothing in the request pipeline reads them.

use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::sync::OnceLock;

use crate::core::error_types::ErrorKind;

/// Container for all gateway metrics.
pub struct Metrics {
    /// Total number of requests by endpoint and status code
    pub request_count: IntCounterVec,

    /// Request duration histogram in seconds
    pub request_duration: HistogramVec,

    /// Rejected completion requests by error kind
    pub rejections: IntCounterVec,

    /// Upstream call latency by outcome (`ok`, `upstream_error`, `network_error`)
    pub upstream_duration: HistogramVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Initialize the metrics registry.
///
/// Safe to call repeatedly; registration happens once.
pub fn init_metrics() -> &'static Metrics {
    METRICS.get_or_init(|| {
        let request_count = register_int_counter_vec!(
            "chat_gateway_requests_total",
            "Total number of requests",
            &["endpoint", "status_code"]
        )
        .expect("Failed to register request_count metric");

        let request_duration = register_histogram_vec!(
            "chat_gateway_request_duration_seconds",
            "Request duration in seconds",
            &["endpoint"],
            vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]
        )
        .expect("Failed to register request_duration metric");

        let rejections = register_int_counter_vec!(
            "chat_gateway_rejections_total",
            "Completion requests rejected, by error kind",
            &["kind"]
        )
        .expect("Failed to register rejections metric");

        let upstream_duration = register_histogram_vec!(
            "chat_gateway_upstream_duration_seconds",
            "Upstream provider call duration in seconds",
            &["outcome"],
            vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]
        )
        .expect("Failed to register upstream_duration metric");

        Metrics {
            request_count,
            request_duration,
            rejections,
            upstream_duration,
        }
    })
}

/// Get the metrics registry, initializing it on first use.
pub fn get_metrics() -> &'static Metrics {
    init_metrics()
}

/// Count a rejected completion request.
pub fn record_rejection(kind: ErrorKind) {
    get_metrics()
        .rejections
        .with_label_values(&[kind.as_str()])
        .inc();
}

/// Render all registered metrics in the Prometheus text format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
