//! Per-worker circuit breaker registry.
//!
//! Each named upstream gets its own breaker. State transitions and the
//! associated gauge callback are serialized by a single mutex per breaker so
//! external observers never see the gauge disagree with the state it
//! describes. The registry itself uses a separate, short-lived lock only to
//! find-or-create a breaker; it is never held while a per-breaker lock is
//! acquired.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clock::{Clock, MonotonicClock};

/// Observable state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Numeric encoding used by the `circuit_breaker_state` gauge contract.
    pub fn as_gauge_value(self) -> i64 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

/// Tunables shared by every breaker created through a [`CircuitBreakerRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: usize,
    pub success_threshold: usize,
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

/// Point-in-time copy of a breaker's counters, for readiness/debug surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub failure_count: usize,
    pub success_count: usize,
    pub last_failure_at_millis: Option<u64>,
}

struct Inner {
    state: CircuitState,
    failure_count: usize,
    success_count: usize,
    last_failure_at_millis: Option<u64>,
}

/// A single named breaker. Cheap to clone; clones share the same lock.
#[derive(Clone)]
pub struct Breaker {
    name: Arc<str>,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Arc<Mutex<Inner>>,
    on_state_change: Arc<dyn Fn(&str, CircuitState) + Send + Sync>,
}

impl std::fmt::Debug for Breaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Breaker").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Breaker {
    fn new(
        name: Arc<str>,
        config: CircuitBreakerConfig,
        clock: Arc<dyn Clock>,
        on_state_change: Arc<dyn Fn(&str, CircuitState) + Send + Sync>,
    ) -> Self {
        on_state_change(&name, CircuitState::Closed);
        Self {
            name,
            config,
            clock,
            inner: Arc::new(Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_at_millis: None,
            })),
            on_state_change,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether a call should be let through right now. When the
    /// breaker is `Open` and the recovery timeout has elapsed, this call
    /// itself performs the `Open -> HalfOpen` transition: there is no
    /// background timer promoting breakers.
    pub fn admits(&self) -> bool {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let opened_at = inner.last_failure_at_millis.unwrap_or(0);
                let elapsed = self.clock.now_millis().saturating_sub(opened_at);
                if elapsed >= self.config.recovery_timeout.as_millis() as u64 {
                    inner.state = CircuitState::HalfOpen;
                    inner.success_count = 0;
                    self.notify(inner.state);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call. No-op if the breaker is `Open` (should not
    /// happen, since `admits()` gates calls, but is harmless either way).
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    self.notify(inner.state);
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed call, one logical call at a time (callers must not
    /// record a failure per retry attempt, only once the retry budget for a
    /// single logical call is exhausted).
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        let now = self.clock.now_millis();
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.last_failure_at_millis = Some(now);
                    self.notify(inner.state);
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.last_failure_at_millis = Some(now);
                self.notify(inner.state);
            }
            CircuitState::Open => {
                inner.last_failure_at_millis = Some(now);
            }
        }
    }

    pub fn force_close(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        self.notify(inner.state);
    }

    pub fn force_open(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.state = CircuitState::Open;
        inner.last_failure_at_millis = Some(self.clock.now_millis());
        self.notify(inner.state);
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().expect("breaker lock poisoned").state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock().expect("breaker lock poisoned");
        BreakerSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_failure_at_millis: inner.last_failure_at_millis,
        }
    }

    fn notify(&self, state: CircuitState) {
        (self.on_state_change)(&self.name, state);
    }
}

/// Registry of named breakers, created lazily on first reference.
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    on_state_change: Arc<dyn Fn(&str, CircuitState) + Send + Sync>,
    breakers: Mutex<HashMap<Arc<str>, Breaker>>,
}

impl std::fmt::Debug for CircuitBreakerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerRegistry").field("config", &self.config).finish_non_exhaustive()
    }
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_gauge(config, |_, _| {})
    }

    /// Build a registry that reports every state transition through
    /// `on_state_change(name, state)`, invoked under the breaker's own lock.
    pub fn with_gauge<F>(config: CircuitBreakerConfig, on_state_change: F) -> Self
    where
        F: Fn(&str, CircuitState) + Send + Sync + 'static,
    {
        Self {
            config,
            clock: Arc::new(MonotonicClock::default()),
            on_state_change: Arc::new(on_state_change),
            breakers: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub fn with_clock<C: Clock + 'static>(config: CircuitBreakerConfig, clock: C) -> Self {
        Self {
            config,
            clock: Arc::new(clock),
            on_state_change: Arc::new(|_, _| {}),
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the breaker for `name`, creating it (race-free) on first use.
    pub fn get(&self, name: &str) -> Breaker {
        let mut breakers = self.breakers.lock().expect("registry lock poisoned");
        if let Some(existing) = breakers.get(name) {
            return existing.clone();
        }
        let name: Arc<str> = Arc::from(name);
        let breaker = Breaker::new(
            name.clone(),
            self.config,
            self.clock.clone(),
            self.on_state_change.clone(),
        );
        breakers.insert(name, breaker.clone());
        breaker
    }

    /// Stable snapshot of every breaker created so far, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, BreakerSnapshot)> {
        let breakers = self.breakers.lock().expect("registry lock poisoned");
        let mut entries: Vec<_> =
            breakers.iter().map(|(name, b)| (name.to_string(), b.snapshot())).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// True once at least one breaker exists and is admitting traffic
    /// (`Closed` or `HalfOpen`). Returns `None` if no breaker has been
    /// created yet; callers treat that cold-start case as ready.
    pub fn any_admitting(&self) -> Option<bool> {
        let breakers = self.breakers.lock().expect("registry lock poisoned");
        if breakers.is_empty() {
            return None;
        }
        Some(breakers.values().any(|b| b.state() != CircuitState::Open))
    }

    /// Force the named breaker closed, creating it first if no traffic has
    /// touched it yet — an operator overriding a breaker shouldn't need to
    /// wait for a live call to land before the override takes effect.
    pub fn force_close(&self, name: &str) {
        self.get(name).force_close();
    }

    pub fn force_open(&self, name: &str) {
        self.get(name).force_open();
    }
}
