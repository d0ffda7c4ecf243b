//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the Prometheus recorder
//! - Count requests and time responses per request path
//! - Render the text exposition for `GET /metrics`
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by path
//! - `http_response_time_seconds` (histogram): response time by path
//!
//! # Design Decisions
//! - Recorder is installed on first use and shared for the process lifetime
//! - Histogram buckets tuned for typical web latencies

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const RESPONSE_TIME_SECONDS: &str = "http_response_time_seconds";

/// Prometheus client defaults.
const RESPONSE_TIME_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global recorder if it is not installed yet.
///
/// When some other recorder already owns the global slot, the returned handle
/// renders an empty exposition.
pub fn init_metrics() -> &'static PrometheusHandle {
    METRICS_HANDLE.get_or_init(|| {
        let builder = match PrometheusBuilder::new().set_buckets_for_metric(
            Matcher::Full(RESPONSE_TIME_SECONDS.to_string()),
            RESPONSE_TIME_BUCKETS,
        ) {
            Ok(builder) => builder,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid histogram buckets, using summaries");
                PrometheusBuilder::new()
            }
        };

        let recorder = builder.build_recorder();
        let handle = recorder.handle();
        if let Err(e) = metrics::set_global_recorder(recorder) {
            tracing::warn!(error = %e, "Metrics recorder already installed");
        }

        register_metric_descriptions();
        handle
    })
}

fn register_metric_descriptions() {
    describe_counter!(REQUESTS_TOTAL, "Number of get requests.");
    describe_histogram!(RESPONSE_TIME_SECONDS, "Duration of HTTP requests.");
}

/// Render all metrics in Prometheus text format.
pub fn render() -> String {
    let handle = init_metrics();
    handle.run_upkeep();
    handle.render()
}

/// Count a request against `path`.
pub fn count_request(path: &str) {
    counter!(REQUESTS_TOTAL, "path" => path.to_string()).increment(1);
}

/// Record how long handling `path` took.
pub fn record_request(path: &str, elapsed: Duration) {
    histogram!(RESPONSE_TIME_SECONDS, "path" => path.to_string()).record(elapsed.as_secs_f64());
}

/// Route layer counting and timing every matched request.
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    count_request(&path);

    let start = Instant::now();
    let response = next.run(req).await;
    record_request(&path, start.elapsed());

    response
}

/// Handler for `GET /metrics`.
pub async fn metrics_handler() -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        render(),
    )
        .into_response()
}
