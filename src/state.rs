use std::sync::Arc;

use crate::config::Config;
use crate::middleware::RequestLimiter;
use crate::services::{AnalysisPipeline, CompletionClient, ResultStore};

/// Room for the job description field and multipart framing on top of the
/// résumé file itself.
pub const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Shared application state injected into route handlers via Axum extractors.
/// Collaborators are trait objects so tests can swap in doubles.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
    pub limiter: Arc<RequestLimiter>,
    pub max_file_size_mb: usize,
}

impl AppState {
    pub fn new(
        config: &Config,
        completion: Arc<dyn CompletionClient>,
        store: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            pipeline: Arc::new(AnalysisPipeline::new(completion, store, config.score_policy)),
            limiter: Arc::new(RequestLimiter::new(config.max_concurrent_requests)),
            max_file_size_mb: config.max_file_size_mb,
        }
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }

    /// Cap on the whole request body. The résumé part is checked against
    /// `max_file_size_bytes` separately.
    pub fn body_limit_bytes(&self) -> usize {
        self.max_file_size_bytes() + FORM_OVERHEAD_BYTES
    }
}
