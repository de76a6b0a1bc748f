use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use guardrail_metrics::OrchestratorMetrics;
use guardrail_resilience::{CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState};

use crate::client_pool::ClientPool;
use crate::config::OrchestratorConfig;

pub struct AppStateInner {
    pub config: OrchestratorConfig,
    pub client_pool: ClientPool,
    pub registry: CircuitBreakerRegistry,
    pub metrics: OrchestratorMetrics,
    draining: AtomicBool,
}

#[derive(Clone)]
pub struct AppState(pub Arc<AppStateInner>);

impl AppState {
    pub fn new(config: OrchestratorConfig) -> Self {
        let metrics = OrchestratorMetrics::new(&config.pod);
        let breaker_config = CircuitBreakerConfig {
            failure_threshold: config.cb_failure_threshold,
            success_threshold: config.cb_success_threshold,
            recovery_timeout: config.cb_recovery_timeout,
        };
        let client_pool = ClientPool::new(&config);

        // The gauge callback fires under the breaker's own lock, so the
        // gauge this closure writes can never disagree with the state the
        // caller just observed.
        let gauge = metrics.circuit_breaker_state.clone();
        let registry = CircuitBreakerRegistry::with_gauge(breaker_config, move |name, state| {
            gauge.with_label_values(&[name]).set(state_gauge_value(state));
        });

        Self(Arc::new(AppStateInner {
            config,
            client_pool,
            registry,
            metrics,
            draining: AtomicBool::new(false),
        }))
    }

    pub fn is_draining(&self) -> bool {
        self.0.draining.load(Ordering::SeqCst)
    }

    pub fn start_draining(&self) {
        self.0.draining.store(true, Ordering::SeqCst);
    }

    /// Ready iff not draining AND (no breaker exists yet OR at least one
    /// breaker currently admits traffic).
    pub fn is_ready(&self) -> bool {
        if self.is_draining() {
            return false;
        }
        self.0.registry.any_admitting().unwrap_or(true)
    }
}

impl std::ops::Deref for AppState {
    type Target = AppStateInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn state_gauge_value(state: CircuitState) -> i64 {
    state.as_gauge_value()
}
