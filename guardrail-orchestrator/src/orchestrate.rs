use std::collections::BTreeMap;
use std::time::Instant;

use futures::future::join_all;
use guardrail_types::{flag_reason, Strategy, ValidateResponse, WorkerName, WorkerResult, ALL_WORKERS};

use crate::dispatch::{dispatch, DispatchOutcome};
use crate::state::AppState;

/// RAII guard for the in-flight gauge: incremented on construction,
/// decremented on drop — including on cancellation and panic unwinding,
/// since `Drop` still runs when a future holding this guard is dropped.
struct InFlightGuard {
    gauge: prometheus::IntGauge,
}

impl InFlightGuard {
    fn enter(state: &AppState) -> Self {
        let gauge = state.metrics.in_flight_requests.with_label_values(&[&state.config.pod]);
        gauge.inc();
        Self { gauge }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

/// Runs the full fan-out: dispatch to every enabled worker concurrently,
/// wait for all of them (no early return — every strategy needs the
/// complete vote, and the response body reports every worker's verdict
/// regardless of strategy), then aggregate.
pub async fn validate_text(
    state: &AppState,
    text: &str,
    enabled_workers: &[WorkerName],
    strategy: Strategy,
    request_id: Option<String>,
) -> ValidateResponse {
    let _in_flight = InFlightGuard::enter(state);
    let request_id = request_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let started = Instant::now();

    let enabled: Vec<WorkerName> =
        if enabled_workers.is_empty() { ALL_WORKERS.to_vec() } else { enabled_workers.to_vec() };

    let tasks = enabled.iter().map(|&name| {
        let request_id = request_id.clone();
        async move { (name, dispatch(state, name, text, &request_id).await) }
    });
    let outcomes = join_all(tasks).await;

    let mut model_results: BTreeMap<String, WorkerResult> = BTreeMap::new();
    let mut failed_models = Vec::new();
    for (name, outcome) in outcomes {
        match outcome {
            DispatchOutcome::Success(result) => {
                model_results.insert(name.as_str().to_string(), result);
            }
            DispatchOutcome::BreakerOpen | DispatchOutcome::Exhausted => {
                failed_models.push(name.as_str().to_string());
            }
        }
    }

    let flag_reasons: Vec<String> = model_results
        .iter()
        .filter(|(_, r)| r.flagged)
        .map(|(name, _)| flag_reason(name))
        .collect();

    let results_refs: Vec<&WorkerResult> = model_results.values().collect();
    let flagged = strategy.decide(&results_refs);

    let partial_failure = !failed_models.is_empty();
    let total_latency_ms = started.elapsed().as_millis() as u64;

    // A total outage (every enabled worker failed) records no aggregate
    // latency or outcome sample — the call never produced a verdict, so
    // counting it here would skew the latency histogram and success ratio.
    if failed_models.len() < enabled.len() {
        state
            .metrics
            .request_latency_seconds
            .with_label_values(&[] as &[&str])
            .observe(started.elapsed().as_secs_f64());
        let status = if partial_failure { "partial" } else { "success" };
        state
            .metrics
            .request_total
            .with_label_values(&[status, &flagged.to_string()])
            .inc();
    }

    ValidateResponse {
        request_id,
        flagged,
        flag_reasons,
        model_results,
        partial_failure,
        failed_models,
        total_latency_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrchestratorConfig;

    #[tokio::test]
    async fn all_workers_down_yields_all_failed_and_unflagged() {
        let mut cfg = OrchestratorConfig::from_env();
        cfg.retry_max_attempts = 1;
        cfg.model_timeout = std::time::Duration::from_millis(5);
        // Unroutable addresses guarantee every call fails fast.
        for endpoint in cfg.endpoints.values_mut() {
            endpoint.base_url = "http://127.0.0.1:1".to_string();
        }
        let state = AppState::new(cfg);
        let response =
            validate_text(&state, "hello", &[], Strategy::AnyFlag, Some("req-1".to_string())).await;
        assert!(!response.flagged);
        assert!(response.partial_failure);
        assert_eq!(response.failed_models.len(), 4);
        assert!(response.model_results.is_empty());
    }

    #[tokio::test]
    async fn total_outage_records_no_latency_or_total_sample() {
        let mut cfg = OrchestratorConfig::from_env();
        cfg.retry_max_attempts = 1;
        cfg.model_timeout = std::time::Duration::from_millis(5);
        for endpoint in cfg.endpoints.values_mut() {
            endpoint.base_url = "http://127.0.0.1:1".to_string();
        }
        let state = AppState::new(cfg);
        let before = state.metrics.request_latency_seconds.with_label_values(&[] as &[&str]).get_sample_count();
        let response =
            validate_text(&state, "hello", &[], Strategy::AnyFlag, Some("req-1".to_string())).await;
        assert_eq!(response.failed_models.len(), 4);
        let after = state.metrics.request_latency_seconds.with_label_values(&[] as &[&str]).get_sample_count();
        assert_eq!(before, after, "total outage must not observe an aggregate latency sample");
    }

    #[tokio::test]
    async fn in_flight_gauge_returns_to_baseline_after_request() {
        let mut cfg = OrchestratorConfig::from_env();
        cfg.retry_max_attempts = 1;
        cfg.model_timeout = std::time::Duration::from_millis(5);
        for endpoint in cfg.endpoints.values_mut() {
            endpoint.base_url = "http://127.0.0.1:1".to_string();
        }
        let state = AppState::new(cfg);
        let before = state.metrics.in_flight_requests.with_label_values(&[&state.config.pod]).get();
        let _ = validate_text(&state, "hello", &[], Strategy::AnyFlag, None).await;
        let after = state.metrics.in_flight_requests.with_label_values(&[&state.config.pod]).get();
        assert_eq!(before, after);
    }
}
