use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use guardrail_types::PredictRequest;

use crate::classify;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// RAII guard for the worker's in-flight gauge: incremented on entry,
/// decremented on drop — including on cancellation and panic unwinding,
/// since `Drop` still runs when a future holding this guard is dropped.
struct InFlightGuard {
    gauge: prometheus::IntGauge,
}

impl InFlightGuard {
    fn enter(state: &AppState) -> Self {
        let gauge = state
            .metrics
            .in_flight_requests
            .with_label_values(&[state.config.model_name.as_str(), &state.config.pod]);
        gauge.inc();
        Self { gauge }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

async fn predict(State(state): State<AppState>, Json(req): Json<PredictRequest>) -> Response {
    let model_name = state.config.model_name.as_str();
    let _permit = state.admission.acquire().await;
    let _in_flight = InFlightGuard::enter(&state);

    let result = classify::predict(&state.config, &req.text).await;

    state
        .metrics
        .inference_latency_seconds
        .with_label_values(&[model_name])
        .observe(result.latency_ms as f64 / 1000.0);
    state.metrics.inference_total.with_label_values(&[model_name, "success"]).inc();

    Json(result).into_response()
}

async fn health() -> Response {
    Json(json!({"status": "healthy"})).into_response()
}

async fn ready(State(state): State<AppState>) -> Response {
    if state.is_draining() {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "draining"})))
            .into_response();
    }
    Json(json!({"status": "ready"})).into_response()
}

async fn metrics(State(state): State<AppState>) -> Response {
    let body = state.metrics.encode();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        body,
    )
        .into_response()
}
