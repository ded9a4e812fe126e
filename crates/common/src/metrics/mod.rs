//! Metrics and observability utilities
//!
//! Prometheus-style metrics under a common prefix. Recording is a no-op
//! until a recorder (the gateway's Prometheus exporter) is installed.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all ContractForge metrics
pub const METRICS_PREFIX: &str = "contractforge";

/// Histogram buckets for request latency (in seconds); uploads run long
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00, 30.00, 60.00,
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

    // Upload pipeline
    describe_counter!(
        format!("{}_upload_items_total", METRICS_PREFIX),
        Unit::Count,
        "Uploaded files by outcome"
    );

    describe_histogram!(
        format!("{}_upload_item_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Per-file processing latency in seconds"
    );

    describe_counter!(
        format!("{}_chunks_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total retrieval chunks stored"
    );

    // Analysis
    describe_counter!(
        format!("{}_analyses_total", METRICS_PREFIX),
        Unit::Count,
        "Contracts analysed by extraction strategy"
    );

    describe_histogram!(
        format!("{}_contract_score", METRICS_PREFIX),
        Unit::Count,
        "Distribution of contract scores"
    );

    // Embeddings
    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding requests"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    // Read side
    describe_counter!(
        format!("{}_comparisons_total", METRICS_PREFIX),
        Unit::Count,
        "Comparison views served"
    );

    describe_counter!(
        format!("{}_chat_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Chat questions answered"
    );

    describe_histogram!(
        format!("{}_chat_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Chat answer latency in seconds"
    );

    describe_counter!(
        format!("{}_context_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Chat context retrievals that failed and fell back to no context"
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

/// Helper to record one processed upload file
pub fn record_upload_item(duration_secs: f64, status: &str, chunks_created: usize) {
    counter!(
        format!("{}_upload_items_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_upload_item_duration_seconds", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .record(duration_secs);

    if chunks_created > 0 {
        counter!(format!("{}_chunks_created_total", METRICS_PREFIX))
            .increment(chunks_created as u64);
    }
}

/// Helper to record an analysis result
pub fn record_analysis(strategy: &str, score: u8) {
    counter!(
        format!("{}_analyses_total", METRICS_PREFIX),
        "strategy" => strategy.to_string()
    )
    .increment(1);

    histogram!(format!("{}_contract_score", METRICS_PREFIX)).record(f64::from(score));
}

/// Helper to record embedding metrics
pub fn record_embedding(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    }
}

/// Helper to record a comparison view
pub fn record_comparison(mode: &'static str, documents: usize) {
    counter!(
        format!("{}_comparisons_total", METRICS_PREFIX),
        "mode" => mode
    )
    .increment(1);

    tracing::debug!(mode, documents, "Comparison served");
}

/// Helper to record a chat answer
pub fn record_chat(duration_secs: f64, fallback: bool) {
    counter!(
        format!("{}_chat_requests_total", METRICS_PREFIX),
        "fallback" => fallback.to_string()
    )
    .increment(1);

    histogram!(format!("{}_chat_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Helper to record a swallowed context retrieval failure
pub fn record_context_failure() {
    counter!(format!("{}_context_failures_total", METRICS_PREFIX)).increment(1);
}
