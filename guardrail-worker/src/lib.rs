//! Classification worker service: a single-in-flight `predict` endpoint
//! fronted by health/ready/metrics routes.

mod admission;
mod classify;
pub mod config;
mod routes;
mod state;

pub use config::WorkerConfig;
pub use routes::router;
pub use state::AppState;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use std::time::Instant;

/// Builds the full service router, including the `http_request_duration_seconds`
/// timing layer over every route except `/metrics`.
pub fn app(state: AppState) -> axum::Router {
    router(state.clone()).route_layer(middleware::from_fn_with_state(state, track_http_duration))
}

async fn track_http_duration(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let endpoint = request.uri().path().to_string();
    if endpoint == "/metrics" {
        return next.run(request).await;
    }
    let method = request.method().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    let model_name = state.config.model_name.as_str();
    state
        .metrics
        .http_request_duration_seconds
        .with_label_values(&[model_name, &method, &endpoint, response.status().as_str()])
        .observe(started.elapsed().as_secs_f64());
    response
}
