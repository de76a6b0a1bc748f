use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use guardrail_metrics::WorkerMetrics;

use crate::admission::AdmissionToken;
use crate::config::WorkerConfig;

pub struct AppStateInner {
    pub config: WorkerConfig,
    pub admission: AdmissionToken,
    pub metrics: WorkerMetrics,
    draining: AtomicBool,
}

#[derive(Clone)]
pub struct AppState(pub Arc<AppStateInner>);

impl AppState {
    pub fn new(config: WorkerConfig) -> Self {
        let metrics = WorkerMetrics::new(config.model_name.as_str(), &config.pod);
        Self(Arc::new(AppStateInner {
            config,
            admission: AdmissionToken::new(),
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
}

impl std::ops::Deref for AppState {
    type Target = AppStateInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
