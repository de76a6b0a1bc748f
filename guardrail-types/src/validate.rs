use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strategy::Strategy;
use crate::worker::WorkerName;

/// Upper bound on `text` length accepted by `POST /v1/validate`.
pub const MAX_TEXT_LEN: usize = 50_000;

/// Whether the payload under validation is a model input or a model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    #[default]
    Input,
    Output,
}

/// Body of `POST /v1/validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub request_id: Option<String>,
    pub project_id: String,
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: RequestKind,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    /// Caller-selectable aggregation policy. Defaults to `ANY_FLAG` when
    /// omitted, matching every other optional field on this request.
    #[serde(default)]
    pub strategy: Strategy,
}

/// The outcome of a single worker's predict call, as folded into the
/// aggregate response. Absent entirely when the worker failed or was
/// skipped by its breaker — never present with a placeholder score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResult {
    pub flagged: bool,
    pub score: f64,
    #[serde(default)]
    pub details: Vec<String>,
    pub latency_ms: u64,
}

/// Body of the `POST /v1/validate` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub request_id: String,
    pub flagged: bool,
    pub flag_reasons: Vec<String>,
    pub model_results: std::collections::BTreeMap<String, WorkerResult>,
    pub partial_failure: bool,
    pub failed_models: Vec<String>,
    pub total_latency_ms: u64,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("text must not be empty")]
    EmptyText,
    #[error("text exceeds maximum length of {max} bytes (got {actual})")]
    TextTooLong { actual: usize, max: usize },
    #[error("project_id must not be empty")]
    MissingProjectId,
}

impl ValidateRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.project_id.is_empty() {
            return Err(ValidationError::MissingProjectId);
        }
        if self.text.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        if self.text.len() > MAX_TEXT_LEN {
            return Err(ValidationError::TextTooLong {
                actual: self.text.len(),
                max: MAX_TEXT_LEN,
            });
        }
        Ok(())
    }
}

/// Builds the `<worker>_flagged` label for a worker whose result flagged,
/// in the iteration order of `model_results` (a `BTreeMap`, so lexical by
/// worker name — a stable order, though the spec does not require this
/// particular one).
pub fn flag_reason(worker: &str) -> String {
    format!("{worker}_flagged")
}

/// Returns every worker name that has no entry in `results` and is not
/// listed in `failed_models` — a helper for tests and for the
/// orchestrator's own consistency checks on the response it builds.
pub fn unaccounted_workers(
    results: &std::collections::BTreeMap<String, WorkerResult>,
    failed_models: &[String],
) -> Vec<WorkerName> {
    crate::worker::ALL_WORKERS
        .into_iter()
        .filter(|w| {
            !results.contains_key(w.as_str()) && !failed_models.iter().any(|s| s == w.as_str())
        })
        .collect()
}
