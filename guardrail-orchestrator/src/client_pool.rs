use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use guardrail_types::WorkerName;
use reqwest::Client;

use crate::config::OrchestratorConfig;

const POOL_MAX_IDLE_PER_HOST: usize = 20;
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// One logical HTTP client per worker, created lazily on first reference and
/// reused for the life of the process. Guarded by a lock only for the
/// find-or-create path; reads afterwards never contend.
pub struct ClientPool {
    model_timeout: Duration,
    connect_timeout: Duration,
    clients: Mutex<HashMap<WorkerName, Client>>,
}

impl ClientPool {
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self {
            model_timeout: config.model_timeout,
            connect_timeout: config.model_connect_timeout,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the pooled client for `name`, building it on first use.
    ///
    /// The per-request deadline applied by callers is `model_timeout +
    /// connect_timeout`; the client itself only enforces `connect_timeout`
    /// at the TCP layer and an overall `.timeout()` standing in for the
    /// response-header deadline reqwest does not expose directly.
    pub fn get(&self, name: WorkerName) -> Client {
        let mut clients = self.clients.lock().expect("client pool lock poisoned");
        if let Some(existing) = clients.get(&name) {
            return existing.clone();
        }
        let client = Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.model_timeout + self.connect_timeout)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .build()
            .expect("static TLS/connector configuration is always valid");
        clients.insert(name, client.clone());
        client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_is_idempotent_per_worker() {
        let config = OrchestratorConfig::from_env();
        let pool = ClientPool::new(&config);
        let a = pool.get(WorkerName::PromptGuard);
        let b = pool.get(WorkerName::PromptGuard);
        // reqwest::Client is an Arc handle internally; cloning the pool's
        // entry twice must not build a second connector.
        assert_eq!(pool.clients.lock().unwrap().len(), 1);
        drop(a);
        drop(b);
    }

    #[test]
    fn get_creates_distinct_entries_per_worker() {
        let config = OrchestratorConfig::from_env();
        let pool = ClientPool::new(&config);
        pool.get(WorkerName::PromptGuard);
        pool.get(WorkerName::PiiDetect);
        assert_eq!(pool.clients.lock().unwrap().len(), 2);
    }
}
