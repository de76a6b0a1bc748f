use std::time::Instant;

use guardrail_resilience::Breaker;
use guardrail_types::{PredictRequest, PredictResponse, WorkerName, WorkerResult};

use crate::state::AppState;

pub enum DispatchOutcome {
    Success(WorkerResult),
    /// The breaker rejected the call outright; not a new breaker failure.
    BreakerOpen,
    /// All retry attempts were exhausted.
    Exhausted,
}

/// Runs the breaker-gated retry loop for a single worker and records every
/// metric/breaker side effect the call produces.
///
/// Call order is deliberately breaker-then-retry: the breaker decides once,
/// up front, whether this logical call is admitted at all; retries only
/// operate within an admitted call. This differs from the generic
/// retry-wraps-breaker composition used elsewhere in this workspace, where
/// each individual attempt re-checks the breaker — that composition would
/// let a breaker flip open mid-retry-loop and is not what partial-failure
/// handling here calls for.
pub async fn dispatch(state: &AppState, name: WorkerName, text: &str, request_id: &str) -> DispatchOutcome {
    let breaker: Breaker = state.registry.get(name.as_str());
    if !breaker.admits() {
        return DispatchOutcome::BreakerOpen;
    }

    let config = &state.config;
    let client = state.client_pool.get(name);
    let url = format!("{}/predict", state.config.endpoints[&name].base_url);
    let body = PredictRequest { text: text.to_string(), request_id: request_id.to_string() };
    let max_attempts = config.effective_max_attempts();

    let mut last_elapsed = std::time::Duration::ZERO;
    let mut outcome: Option<PredictResponse> = None;

    for attempt in 1..=max_attempts {
        if attempt > 1 {
            tokio::time::sleep(config.retry_wait).await;
            state
                .metrics
                .model_call_retries_total
                .with_label_values(&[name.as_str(), &attempt.to_string()])
                .inc();
        }

        let started = Instant::now();
        let attempt_result = call_once(&client, &url, &body).await;
        last_elapsed = started.elapsed();

        match attempt_result {
            Some(result) => {
                outcome = Some(result);
                break;
            }
            None if attempt == max_attempts => break,
            None => continue,
        }
    }

    state
        .metrics
        .model_call_latency_seconds
        .with_label_values(&[name.as_str()])
        .observe(last_elapsed.as_secs_f64());

    match outcome {
        Some(predict) => {
            breaker.record_success();
            DispatchOutcome::Success(WorkerResult {
                flagged: predict.flagged,
                score: predict.score,
                details: predict.details,
                latency_ms: predict.latency_ms,
            })
        }
        None => {
            breaker.record_failure();
            DispatchOutcome::Exhausted
        }
    }
}

/// One HTTP attempt. Success requires a 200-class status AND a decodable
/// body; anything else — timeout, non-2xx, connection error, decode
/// failure — is folded into `None` so the retry loop treats them alike.
async fn call_once(client: &reqwest::Client, url: &str, body: &PredictRequest) -> Option<PredictResponse> {
    let response = client.post(url).json(body).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    response.json::<PredictResponse>().await.ok()
}
