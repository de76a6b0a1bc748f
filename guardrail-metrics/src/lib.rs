//! The Prometheus metrics contract shared by the orchestrator and the
//! worker services.
//!
//! Names and label sets here are an external contract: the autoscaler keys
//! on the in-flight gauges and alerting keys on `guardrail_circuit_breaker_state`.
//! Do not rename or relabel anything in this module without updating those
//! consumers first.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_gauge_vec_with_registry, Encoder, HistogramVec, IntCounterVec, IntGaugeVec,
    Registry, TextEncoder,
};

const GUARDRAIL_REQUEST_LATENCY_BUCKETS: &[f64] =
    &[0.010, 0.025, 0.050, 0.075, 0.100, 0.150, 0.200, 0.500];

const MODEL_INFERENCE_LATENCY_BUCKETS: &[f64] =
    &[0.010, 0.025, 0.050, 0.075, 0.100, 0.250, 0.500, 1.000];

/// Metrics exported by the orchestrator.
pub struct OrchestratorMetrics {
    pub registry: Registry,
    pub request_latency_seconds: HistogramVec,
    pub request_total: IntCounterVec,
    pub in_flight_requests: IntGaugeVec,
    pub model_call_latency_seconds: HistogramVec,
    pub model_call_retries_total: IntCounterVec,
    pub circuit_breaker_state: IntGaugeVec,
}

impl OrchestratorMetrics {
    pub fn new(pod: &str) -> Self {
        let registry = Registry::new();

        let request_latency_seconds = register_histogram_vec_with_registry!(
            "guardrail_request_latency_seconds",
            "End-to-end latency of a /v1/validate call",
            &[] as &[&str],
            GUARDRAIL_REQUEST_LATENCY_BUCKETS.to_vec(),
            registry
        )
        .expect("metric registration is infallible for fixed, non-duplicate names");
        request_latency_seconds.with_label_values(&[] as &[&str]);

        let request_total = register_int_counter_vec_with_registry!(
            "guardrail_request_total",
            "Completed /v1/validate requests",
            &["status", "flagged"],
            registry
        )
        .expect("metric registration is infallible for fixed, non-duplicate names");

        let in_flight_requests = register_int_gauge_vec_with_registry!(
            "guardrail_in_flight_requests",
            "Requests currently in flight on this replica",
            &["pod"],
            registry
        )
        .expect("metric registration is infallible for fixed, non-duplicate names");
        in_flight_requests.with_label_values(&[pod]).set(0);

        let model_call_latency_seconds = register_histogram_vec_with_registry!(
            "guardrail_model_call_latency_seconds",
            "Latency of a single upstream worker call",
            &["model_name"],
            prometheus::DEFAULT_BUCKETS.to_vec(),
            registry
        )
        .expect("metric registration is infallible for fixed, non-duplicate names");

        let model_call_retries_total = register_int_counter_vec_with_registry!(
            "guardrail_model_call_retries_total",
            "Retries issued against an upstream worker",
            &["model_name", "retry_number"],
            registry
        )
        .expect("metric registration is infallible for fixed, non-duplicate names");

        let circuit_breaker_state = register_int_gauge_vec_with_registry!(
            "guardrail_circuit_breaker_state",
            "Per-worker breaker state: 0=CLOSED, 1=OPEN, 2=HALF_OPEN",
            &["model_name"],
            registry
        )
        .expect("metric registration is infallible for fixed, non-duplicate names");

        Self {
            registry,
            request_latency_seconds,
            request_total,
            in_flight_requests,
            model_call_latency_seconds,
            model_call_retries_total,
            circuit_breaker_state,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        encode(&self.registry)
    }
}

/// Metrics exported by a worker replica.
pub struct WorkerMetrics {
    pub registry: Registry,
    pub model_name: String,
    pub inference_latency_seconds: HistogramVec,
    pub inference_total: IntCounterVec,
    pub in_flight_requests: IntGaugeVec,
    pub http_request_duration_seconds: HistogramVec,
}

impl WorkerMetrics {
    pub fn new(model_name: &str, pod: &str) -> Self {
        let registry = Registry::new();

        let inference_latency_seconds = register_histogram_vec_with_registry!(
            "model_inference_latency_seconds",
            "Wall time spent in the classify path",
            &["model_name"],
            MODEL_INFERENCE_LATENCY_BUCKETS.to_vec(),
            registry
        )
        .expect("metric registration is infallible for fixed, non-duplicate names");

        let inference_total = register_int_counter_vec_with_registry!(
            "model_inference_total",
            "Completed classify calls",
            &["model_name", "status"],
            registry
        )
        .expect("metric registration is infallible for fixed, non-duplicate names");

        let in_flight_requests = register_int_gauge_vec_with_registry!(
            "model_in_flight_requests",
            "Classify calls currently in flight on this replica",
            &["model_name", "pod"],
            registry
        )
        .expect("metric registration is infallible for fixed, non-duplicate names");
        in_flight_requests.with_label_values(&[model_name, pod]).set(0);

        let http_request_duration_seconds = register_histogram_vec_with_registry!(
            "http_request_duration_seconds",
            "Full HTTP request cycle, excluding /metrics",
            &["model_name", "method", "endpoint", "status_code"],
            prometheus::DEFAULT_BUCKETS.to_vec(),
            registry
        )
        .expect("metric registration is infallible for fixed, non-duplicate names");

        Self {
            registry,
            model_name: model_name.to_string(),
            inference_latency_seconds,
            inference_total,
            in_flight_requests,
            http_request_duration_seconds,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        encode(&self.registry)
    }
}

fn encode(registry: &Registry) -> Vec<u8> {
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&metric_families, &mut buffer)
        .expect("text encoding of gathered metric families does not fail");
    buffer
}

/// Process-wide pod identity, read once from `POD_NAME` (falling back to
/// the hostname) and reused across every gauge label on this replica.
pub static POD_NAME: Lazy<String> =
    Lazy::new(|| std::env::var("POD_NAME").unwrap_or_else(|_| "unknown".to_string()));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orchestrator_gauges_initialized_to_zero() {
        let metrics = OrchestratorMetrics::new("pod-a");
        assert_eq!(metrics.in_flight_requests.with_label_values(&["pod-a"]).get(), 0);
    }

    #[test]
    fn worker_gauges_initialized_to_zero() {
        let metrics = WorkerMetrics::new("prompt-guard", "pod-a");
        assert_eq!(
            metrics.in_flight_requests.with_label_values(&["prompt-guard", "pod-a"]).get(),
            0
        );
    }

    #[test]
    fn encode_emits_registered_metric_names() {
        let metrics = OrchestratorMetrics::new("pod-a");
        let text = String::from_utf8(metrics.encode()).unwrap();
        assert!(text.contains("guardrail_in_flight_requests"));
        assert!(text.contains("guardrail_request_latency_seconds"));
    }

    #[test]
    fn circuit_breaker_state_accepts_documented_values() {
        let metrics = OrchestratorMetrics::new("pod-a");
        let gauge = metrics.circuit_breaker_state.with_label_values(&["hate-detect"]);
        gauge.set(0);
        assert_eq!(gauge.get(), 0);
        gauge.set(2);
        assert_eq!(gauge.get(), 2);
    }
}
