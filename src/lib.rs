#![forbid(unsafe_code)]

//! Resilience primitives backing the guardrail validation orchestrator:
//! retry with backoff/jitter, a per-worker circuit breaker registry,
//! bulkhead-style admission control, and timeouts.
//!
//! ## Quick start
//!
//! ```rust
//! use guardrail_resilience::{Backoff, BulkheadPolicy, Jitter, ResilienceError, RetryPolicy, TimeoutPolicy};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! async fn flaky(attempts: Arc<AtomicUsize>) -> Result<(), ResilienceError<std::io::Error>> {
//!     let n = attempts.fetch_add(1, Ordering::Relaxed);
//!     if n < 2 {
//!         Err(ResilienceError::Inner(std::io::Error::other("transient failure")))
//!     } else {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), ResilienceError<std::io::Error>> {
//! let attempts = Arc::new(AtomicUsize::new(0));
//! let retry = RetryPolicy::builder()
//!     .max_attempts(3)
//!     .expect("max_attempts > 0")
//!     .backoff(Backoff::constant(Duration::from_millis(5)))
//!     .with_jitter(Jitter::None)
//!     .build();
//! let timeout = TimeoutPolicy::new(Duration::from_millis(80)).expect("valid timeout");
//! let bulkhead = BulkheadPolicy::new(1);
//!
//! retry
//!     .execute(|| {
//!         let attempts = attempts.clone();
//!         let timeout = timeout.clone();
//!         let bulkhead = bulkhead.clone();
//!         async move { bulkhead.execute(|| timeout.execute(|| flaky(attempts.clone()))).await }
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod backoff;
mod bulkhead;
mod circuit_breaker;
mod clock;
mod error;
mod jitter;
mod retry;
mod sleeper;
mod timeout;

pub mod telemetry;

pub use backoff::Backoff;
pub use bulkhead::BulkheadPolicy;
pub use circuit_breaker::{
    Breaker, BreakerSnapshot, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState,
};
pub use clock::{Clock, MonotonicClock};
pub use error::{ResilienceError, MAX_RETRY_FAILURES};
pub use jitter::Jitter;
pub use retry::{BuildError, RetryPolicy, RetryPolicyBuilder};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use timeout::{TimeoutError, TimeoutPolicy, MAX_TIMEOUT};

pub mod prelude;
