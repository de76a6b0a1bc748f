//! Convenient re-exports for common resilience types.
pub use crate::{
    backoff::Backoff,
    bulkhead::BulkheadPolicy,
    circuit_breaker::{
        Breaker, BreakerSnapshot, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState,
    },
    error::ResilienceError,
    jitter::Jitter,
    retry::{BuildError, RetryPolicy, RetryPolicyBuilder},
    telemetry::{
        BulkheadEvent, CircuitBreakerEvent, FallbackSink, LogSink, MemorySink, MulticastSink,
        NullSink, PolicyEvent, RequestOutcome, RetryEvent, StreamingSink, TelemetrySink,
        TimeoutEvent,
    },
    timeout::{TimeoutError, TimeoutPolicy, MAX_TIMEOUT},
};
