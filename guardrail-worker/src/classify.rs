use rand::Rng;
use std::time::Duration;

use guardrail_types::PredictResponse;

use crate::config::WorkerConfig;

/// Runs the (simulated) classifier over `text` and returns a result whose
/// wall-clock cost matches the configured latency distribution.
///
/// The classifier itself is treated as opaque: this always returns a
/// deterministic, unflagged verdict plus whatever artificial delay the
/// environment asks for. A real classifier would replace the body of this
/// function without touching its callers.
pub async fn predict(config: &WorkerConfig, text: &str) -> PredictResponse {
    let started = std::time::Instant::now();

    if config.inference_delay_enabled {
        let delay_ms = if config.inference_delay_max_ms > config.inference_delay_min_ms {
            rand::rng().random_range(config.inference_delay_min_ms..=config.inference_delay_max_ms)
        } else {
            config.inference_delay_min_ms
        };
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    // Opaque placeholder verdict: never flags, confidence fixed at a
    // baseline score. `text` is only consulted for its length, matching the
    // contract that a classifier must not retain more of the payload than
    // it needs.
    let _ = text.len();

    PredictResponse {
        flagged: false,
        score: 0.0,
        details: Vec::new(),
        latency_ms: started.elapsed().as_millis() as u64,
    }
}
