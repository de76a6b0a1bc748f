use std::env;
use std::time::Duration;

use guardrail_types::WorkerName;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Worker process configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub host: String,
    pub port: u16,
    pub model_name: WorkerName,
    pub pod: String,
    pub inference_delay_enabled: bool,
    pub inference_delay_min_ms: u64,
    pub inference_delay_max_ms: u64,
    pub shutdown_grace: Duration,
}

impl WorkerConfig {
    /// `model_name` is fixed per replica: one binary, one classifier kind,
    /// selected at deploy time rather than read from the environment.
    pub fn from_env(model_name: WorkerName) -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env_or("PORT", 8000u16);
        let pod = env::var("POD_NAME").unwrap_or_else(|_| "unknown".to_string());
        let inference_delay_enabled = env::var("INFERENCE_DELAY_ENABLED")
            .ok()
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);
        let inference_delay_min_ms = env_or("INFERENCE_DELAY_MIN_MS", 10u64);
        let inference_delay_max_ms = env_or("INFERENCE_DELAY_MAX_MS", 30u64);

        Self {
            host,
            port,
            model_name,
            pod,
            inference_delay_enabled,
            inference_delay_min_ms,
            inference_delay_max_ms,
            shutdown_grace: Duration::from_secs(5),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
