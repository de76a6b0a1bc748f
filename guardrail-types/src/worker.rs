use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of worker kinds the orchestrator knows how to dispatch to.
///
/// New kinds require a code change (a new variant plus its `MODEL_<NAME>_URL`
/// default), matching the spec's "closed set of identifiers".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerName {
    PromptGuard,
    PiiDetect,
    HateDetect,
    Toxicity,
}

pub const ALL_WORKERS: [WorkerName; 4] = [
    WorkerName::PromptGuard,
    WorkerName::PiiDetect,
    WorkerName::HateDetect,
    WorkerName::Toxicity,
];

impl WorkerName {
    /// Stable lowercase identifier used as breaker/metric labels and in
    /// `MODEL_<NAME>_URL` environment lookups.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerName::PromptGuard => "prompt-guard",
            WorkerName::PiiDetect => "pii-detect",
            WorkerName::HateDetect => "hate-detect",
            WorkerName::Toxicity => "toxicity",
        }
    }

    pub fn env_key(self) -> &'static str {
        match self {
            WorkerName::PromptGuard => "MODEL_PROMPT_GUARD_URL",
            WorkerName::PiiDetect => "MODEL_PII_DETECT_URL",
            WorkerName::HateDetect => "MODEL_HATE_DETECT_URL",
            WorkerName::Toxicity => "MODEL_TOXICITY_URL",
        }
    }

    pub fn default_url(self) -> &'static str {
        match self {
            WorkerName::PromptGuard => "http://prompt-guard:8001",
            WorkerName::PiiDetect => "http://pii-detect:8002",
            WorkerName::HateDetect => "http://hate-detect:8003",
            WorkerName::Toxicity => "http://toxicity:8004",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        ALL_WORKERS.into_iter().find(|w| w.as_str() == s)
    }
}

impl fmt::Display for WorkerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body for a worker's `POST /predict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub text: String,
    pub request_id: String,
}

/// Response body for a worker's `POST /predict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub flagged: bool,
    pub score: f64,
    #[serde(default)]
    pub details: Vec<String>,
    pub latency_ms: u64,
}
