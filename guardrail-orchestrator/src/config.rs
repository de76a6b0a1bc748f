use std::collections::HashMap;
use std::env;
use std::time::Duration;

use guardrail_types::{WorkerName, ALL_WORKERS};

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_secs_or(key: &str, default: f64) -> Duration {
    let secs = env_or(key, default);
    Duration::from_secs_f64(secs)
}

#[derive(Debug, Clone)]
pub struct WorkerEndpoint {
    pub name: WorkerName,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub host: String,
    pub port: u16,
    pub pod: String,
    pub endpoints: HashMap<WorkerName, WorkerEndpoint>,
    pub model_timeout: Duration,
    pub model_connect_timeout: Duration,
    pub cb_failure_threshold: usize,
    pub cb_recovery_timeout: Duration,
    pub cb_success_threshold: usize,
    pub retry_enabled: bool,
    pub retry_max_attempts: usize,
    pub retry_wait: Duration,
    pub shutdown_grace: Duration,
}

impl OrchestratorConfig {
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env_or("PORT", 8000u16);
        let pod = env::var("POD_NAME").unwrap_or_else(|_| "unknown".to_string());

        let endpoints = ALL_WORKERS
            .into_iter()
            .map(|name| {
                let base_url = env::var(name.env_key()).unwrap_or_else(|_| name.default_url().to_string());
                (name, WorkerEndpoint { name, base_url })
            })
            .collect();

        let model_timeout = env_secs_or("MODEL_TIMEOUT_SECONDS", 0.08);
        let model_connect_timeout = env_secs_or("MODEL_CONNECT_TIMEOUT", 0.02);

        let cb_failure_threshold = env_or("CB_FAILURE_THRESHOLD", 5usize);
        let cb_recovery_timeout = Duration::from_secs(env_or("CB_RECOVERY_TIMEOUT", 30u64));
        let cb_success_threshold = env_or("CB_SUCCESS_THRESHOLD", 3usize);

        let retry_enabled =
            env::var("RETRY_ENABLED").ok().map(|v| v != "false" && v != "0").unwrap_or(true);
        let retry_max_attempts = env_or("RETRY_MAX_ATTEMPTS", 2usize).max(1);
        let retry_wait = Duration::from_millis(env_or("RETRY_WAIT_MS", 5u64));

        Self {
            host,
            port,
            pod,
            endpoints,
            model_timeout,
            model_connect_timeout,
            cb_failure_threshold,
            cb_recovery_timeout,
            cb_success_threshold,
            retry_enabled,
            retry_max_attempts,
            retry_wait,
            shutdown_grace: Duration::from_secs(5),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Per-attempt retry count: 1 when disabled, the configured cap otherwise.
    pub fn effective_max_attempts(&self) -> usize {
        if self.retry_enabled {
            self.retry_max_attempts
        } else {
            1
        }
    }
}
