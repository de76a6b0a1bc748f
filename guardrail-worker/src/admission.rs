use std::sync::Arc;

use tokio::sync::{Semaphore, SemaphorePermit};

/// Unary admission token bracketing the classifier call.
///
/// Unlike [`guardrail_resilience::BulkheadPolicy`], which rejects immediately
/// via `try_acquire` when saturated, this blocks the caller until the single
/// in-flight classify call releases its permit. A worker replica is a
/// single-server queue, not a load-shedder: concurrent callers wait their
/// turn rather than bouncing off a full bulkhead.
#[derive(Clone)]
pub struct AdmissionToken {
    semaphore: Arc<Semaphore>,
}

impl AdmissionToken {
    pub fn new() -> Self {
        Self { semaphore: Arc::new(Semaphore::new(1)) }
    }

    /// Waits for the single classify slot, releasing it when the returned
    /// guard drops — including on cancellation and panic unwinding.
    pub async fn acquire(&self) -> SemaphorePermit<'_> {
        self.semaphore
            .acquire()
            .await
            .expect("admission semaphore is never closed for the life of the process")
    }
}

impl Default for AdmissionToken {
    fn default() -> Self {
        Self::new()
    }
}
