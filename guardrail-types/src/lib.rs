//! Wire types shared between the guardrail orchestrator and worker services.

mod strategy;
mod validate;
mod worker;

pub use strategy::Strategy;
pub use validate::{
    flag_reason, unaccounted_workers, RequestKind, ValidateRequest, ValidateResponse,
    ValidationError, WorkerResult, MAX_TEXT_LEN,
};
pub use worker::{PredictRequest, PredictResponse, WorkerName, ALL_WORKERS};
