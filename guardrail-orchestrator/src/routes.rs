use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use guardrail_types::{ValidateRequest, WorkerName, ALL_WORKERS};

use crate::error::ApiError;
use crate::orchestrate::validate_text;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/validate", post(validate))
        .route("/v1/health", get(health))
        .route("/v1/ready", get(ready))
        .route("/debug/circuit-breakers", get(breaker_snapshot))
        .route("/debug/circuit-breakers/:name/:action", post(breaker_override))
        .route("/metrics", get(metrics))
        .with_state(state)
}

const API_KEY_HEADER: &str = "x-api-key";

async fn validate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ValidateRequest>,
) -> Result<Response, ApiError> {
    let credential = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()).unwrap_or("");
    if credential.is_empty() {
        return Err(ApiError::Unauthorized);
    }
    req.validate()?;

    let enabled: Vec<WorkerName> = ALL_WORKERS.to_vec();
    let response =
        validate_text(&state, &req.text, &enabled, req.strategy, req.request_id.clone()).await;

    if response.failed_models.len() == enabled.len() {
        return Err(ApiError::ServiceUnavailable);
    }

    Ok(Json(response).into_response())
}

async fn health() -> Response {
    Json(json!({"status": "healthy"})).into_response()
}

async fn ready(State(state): State<AppState>) -> Response {
    if state.is_draining() {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "draining"})))
            .into_response();
    }
    if state.registry.any_admitting() == Some(false) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "no_models_available"})))
            .into_response();
    }
    // A worker with no breaker yet has no evidence against it and counts as
    // available; only breakers actually observed OPEN are excluded.
    let open: std::collections::HashSet<String> = state
        .registry
        .snapshot()
        .into_iter()
        .filter(|(_, snap)| snap.state == guardrail_resilience::CircuitState::Open)
        .map(|(name, _)| name)
        .collect();
    let available_models: Vec<&str> =
        ALL_WORKERS.iter().map(|w| w.as_str()).filter(|name| !open.contains(*name)).collect();
    Json(json!({"status": "ready", "available_models": available_models})).into_response()
}

async fn breaker_snapshot(State(state): State<AppState>) -> Response {
    let snapshot = state.registry.snapshot();
    let body: serde_json::Map<String, serde_json::Value> = snapshot
        .into_iter()
        .map(|(name, snap)| {
            (
                name.clone(),
                json!({
                    "name": name,
                    "state": format!("{:?}", snap.state).to_uppercase(),
                    "failure_count": snap.failure_count,
                    "success_count": snap.success_count,
                    "last_failure_time": snap.last_failure_at_millis,
                }),
            )
        })
        .collect();
    Json(body).into_response()
}

async fn breaker_override(
    State(state): State<AppState>,
    Path((name, action)): Path<(String, String)>,
) -> Response {
    if WorkerName::parse(&name).is_none() {
        return (StatusCode::NOT_FOUND, Json(json!({"message": "unknown breaker"}))).into_response();
    }
    match action.as_str() {
        "close" => state.registry.force_close(&name),
        "open" => state.registry.force_open(&name),
        _ => {
            return (StatusCode::BAD_REQUEST, Json(json!({"message": "unknown action"})))
                .into_response()
        }
    };
    Json(json!({"message": format!("breaker {name} {action}d")})).into_response()
}

async fn metrics(State(state): State<AppState>) -> Response {
    let body = state.metrics.encode();
    (StatusCode::OK, [("content-type", "text/plain; version=0.0.4")], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrchestratorConfig;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let mut cfg = OrchestratorConfig::from_env();
        cfg.retry_max_attempts = 1;
        cfg.model_timeout = std::time::Duration::from_millis(5);
        for endpoint in cfg.endpoints.values_mut() {
            endpoint.base_url = "http://127.0.0.1:1".to_string();
        }
        AppState::new(cfg)
    }

    #[tokio::test]
    async fn validate_without_credential_is_401() {
        let app = router(test_state());
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/validate")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"project_id":"p","text":"hi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn validate_with_oversize_text_is_400() {
        let app = router(test_state());
        let text = "a".repeat(guardrail_types::MAX_TEXT_LEN + 1);
        let body = serde_json::to_vec(&serde_json::json!({"project_id": "p", "text": text})).unwrap();
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/validate")
                    .header("content-type", "application/json")
                    .header(API_KEY_HEADER, "secret")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn validate_returns_503_when_all_workers_fail() {
        let app = router(test_state());
        let body = serde_json::to_vec(&serde_json::json!({"project_id": "p", "text": "hi"})).unwrap();
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/validate")
                    .header("content-type", "application/json")
                    .header(API_KEY_HEADER, "secret")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn ready_before_traffic_is_ready() {
        let app = router(test_state());
        let resp = app
            .oneshot(Request::builder().uri("/v1/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_before_traffic_lists_all_workers_available() {
        let app = router(test_state());
        let resp = app
            .oneshot(Request::builder().uri("/v1/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let available = body["available_models"].as_array().unwrap();
        assert_eq!(available.len(), ALL_WORKERS.len());
    }

    #[tokio::test]
    async fn ready_excludes_open_breakers_from_available_models() {
        let state = test_state();
        state.registry.force_open("prompt-guard");
        // Keep at least one breaker admitting so readiness itself stays OK
        // and we're exercising the available_models filter, not the
        // separate no-models-available 503 path.
        state.registry.force_close("pii-detect");
        let app = router(state);
        let resp = app
            .oneshot(Request::builder().uri("/v1/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let available: Vec<&str> = body["available_models"].as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
        assert!(!available.contains(&"prompt-guard"));
    }

    #[tokio::test]
    async fn debug_breaker_override_rejects_unknown_action() {
        let app = router(test_state());
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/debug/circuit-breakers/prompt-guard/pause")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn debug_breaker_override_closes_a_forced_open_breaker() {
        let state = test_state();
        state.registry.force_open("prompt-guard");
        let app = router(state.clone());
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/debug/circuit-breakers/prompt-guard/close")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.registry.get("prompt-guard").state(), guardrail_resilience::CircuitState::Closed);
    }
}
