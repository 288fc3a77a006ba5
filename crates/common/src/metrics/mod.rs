//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all registry metrics
pub const METRICS_PREFIX: &str = "gazette_registry";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 150ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms - P50 target
    0.075,  // 75ms
    0.100,  // 100ms
    0.150,  // 150ms - P99 target
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
];

/// Buckets for document ingestion and assistant calls (typically slower)
pub const INGESTION_BUCKETS: &[f64] = &[
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
    60.00,  // 60s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of gazette searches"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Gazette search latency in seconds"
    );

    // Ingestion metrics
    describe_counter!(
        format!("{}_documents_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total gazette documents processed"
    );

    describe_counter!(
        format!("{}_notices_extracted_total", METRICS_PREFIX),
        Unit::Count,
        "Total notices extracted from gazette text"
    );

    describe_counter!(
        format!("{}_entries_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total gazette entries stored"
    );

    describe_counter!(
        format!("{}_duplicates_skipped_total", METRICS_PREFIX),
        Unit::Count,
        "Total notices suppressed as duplicates"
    );

    describe_counter!(
        format!("{}_extraction_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Total items that could not be parsed or stored"
    );

    describe_histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Gazette document ingestion latency in seconds"
    );

    // Assistant metrics
    describe_counter!(
        format!("{}_assistant_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total assistant chat requests"
    );

    describe_histogram!(
        format!("{}_assistant_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Assistant answer latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record search metrics
pub fn record_search(duration_secs: f64, scope: &str) {
    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "scope" => scope.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        "scope" => scope.to_string()
    )
    .record(duration_secs);
}

/// Helper to record ingestion metrics
pub fn record_ingestion(
    duration_secs: f64,
    notices_found: usize,
    entries_created: usize,
    duplicates_skipped: usize,
    failures: usize,
) {
    counter!(format!("{}_documents_ingested_total", METRICS_PREFIX)).increment(1);

    counter!(format!("{}_notices_extracted_total", METRICS_PREFIX))
        .increment(notices_found as u64);

    counter!(format!("{}_entries_created_total", METRICS_PREFIX))
        .increment(entries_created as u64);

    counter!(format!("{}_duplicates_skipped_total", METRICS_PREFIX))
        .increment(duplicates_skipped as u64);

    counter!(format!("{}_extraction_failures_total", METRICS_PREFIX))
        .increment(failures as u64);

    histogram!(format!("{}_ingestion_duration_seconds", METRICS_PREFIX))
        .record(duration_secs);
}

/// Helper to record assistant metrics
pub fn record_assistant(duration_secs: f64, intent: &str, used_model: bool) {
    let backend = if used_model { "model" } else { "template" };

    counter!(
        format!("{}_assistant_requests_total", METRICS_PREFIX),
        "intent" => intent.to_string(),
        "backend" => backend.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_assistant_duration_seconds", METRICS_PREFIX),
        "backend" => backend.to_string()
    )
    .record(duration_secs);
}
