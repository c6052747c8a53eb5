//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all TalentForge metrics
pub const METRICS_PREFIX: &str = "talentforge";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 250ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms - P50 target
    0.100,  // 100ms
    0.250,  // 250ms - P99 target
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
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

    // Domain metrics
    describe_counter!(
        format!("{}_mutations_total", METRICS_PREFIX),
        Unit::Count,
        "Total add/update/delete operations applied, by resource"
    );

    describe_counter!(
        format!("{}_bulk_rejections_total", METRICS_PREFIX),
        Unit::Count,
        "Records of bulk requests that could not be added"
    );

    describe_counter!(
        format!("{}_session_plans_generated_total", METRICS_PREFIX),
        Unit::Count,
        "Total batch session plans generated"
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

/// Record a successful add/update/delete
pub fn record_mutation(resource: &'static str, operation: &'static str) {
    counter!(
        format!("{}_mutations_total", METRICS_PREFIX),
        "resource" => resource,
        "operation" => operation
    )
    .increment(1);
}

/// Record records of a bulk request that were not added
pub fn record_bulk_rejections(resource: &'static str, rejected: usize) {
    if rejected == 0 {
        return;
    }

    counter!(
        format!("{}_bulk_rejections_total", METRICS_PREFIX),
        "resource" => resource
    )
    .increment(rejected as u64);
}

/// Record a generated session plan
pub fn record_session_plan(session_count: usize) {
    counter!(format!("{}_session_plans_generated_total", METRICS_PREFIX)).increment(1);
    tracing::debug!(session_count, "Session plan recorded");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }

        assert!(LATENCY_BUCKETS.contains(&0.050));
        assert!(LATENCY_BUCKETS.contains(&0.250));
    }

    #[test]
    fn test_recorders_without_exporter() {
        let metrics = RequestMetrics::start("GET", "/tenant/{tenant_id}/talent");
        metrics.finish(200);
        record_mutation("talent", "add");
        record_bulk_rejections("talent", 2);
        record_session_plan(4);
    }
}
