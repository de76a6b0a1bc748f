//! Fan-out validation orchestrator: parallel dispatch to the worker fleet,
//! per-upstream breaker-and-retry composition, and policy-driven
//! aggregation of the resulting verdicts.

pub mod client_pool;
pub mod config;
mod dispatch;
mod error;
mod orchestrate;
mod routes;
pub mod state;

pub use config::OrchestratorConfig;
pub use routes::router as app;
pub use state::AppState;
