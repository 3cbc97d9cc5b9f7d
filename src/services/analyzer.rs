use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinError;

use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{AnalysisRecord, AnalysisRequest, AnalysisResult};
use crate::services::completion_client::CompletionClient;
use crate::services::prompt_builder::build_prompt;
use crate::services::response_normalizer::{normalize, ScorePolicy};
use crate::services::result_store::{persist_best_effort, ResultStore};
use crate::services::text_extractor::TextExtractor;

/// Runs one résumé through extraction, completion, normalization and the
/// best-effort audit write. Holds no per-request state, so one instance
/// serves all in-flight requests.
pub struct AnalysisPipeline {
    extractor: TextExtractor,
    completion: Arc<dyn CompletionClient>,
    store: Arc<dyn ResultStore>,
    score_policy: ScorePolicy,
}

impl AnalysisPipeline {
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        store: Arc<dyn ResultStore>,
        score_policy: ScorePolicy,
    ) -> Self {
        Self {
            extractor: TextExtractor::new(),
            completion,
            store,
            score_policy,
        }
    }

    pub fn completion(&self) -> &dyn CompletionClient {
        self.completion.as_ref()
    }

    pub fn store(&self) -> &dyn ResultStore {
        self.store.as_ref()
    }

    pub async fn analyze(&self, request: AnalysisRequest, request_id: &str) -> AppResult<AnalysisResult> {
        let start = Instant::now();
        let media_type = request.resume.effective_media_type();

        info!(
            request_id = %request_id,
            file_name = %request.resume.file_name,
            file_size = request.resume.size(),
            media_type = %media_type,
            "Extracting text from resume"
        );

        // Parsers are CPU-bound and synchronous
        let extractor = self.extractor;
        let content = request.resume.content.clone();
        let resume_text = tokio::task::spawn_blocking(move || extractor.extract(&content, &media_type))
            .await
            .map_err(extraction_task_failed)?
            .map_err(|e| {
                error!(request_id = %request_id, error = %e, "Text extraction failed");
                AppError::from(e)
            })?;

        if resume_text.trim().is_empty() {
            warn!(request_id = %request_id, "Resume has no extractable text layer");
        }
        info!(
            request_id = %request_id,
            text_length = resume_text.chars().count(),
            "Text extraction successful"
        );

        let prompt = build_prompt(&resume_text, &request.job_description);

        let reply = self
            .completion
            .complete(&prompt.system, &prompt.user)
            .await
            .map_err(|e| {
                error!(
                    request_id = %request_id,
                    model = self.completion.model(),
                    error = %e,
                    "Completion call failed"
                );
                AppError::from(e)
            })?;

        let result = normalize(&reply, self.score_policy).map_err(|e| {
            warn!(
                request_id = %request_id,
                error = %e,
                raw_reply = e.raw_reply(),
                "Model reply rejected"
            );
            AppError::from(e)
        })?;

        persist_best_effort(Arc::clone(&self.store), AnalysisRecord::from_result(&result)).await;

        info!(
            request_id = %request_id,
            score = result.score,
            missing_keywords = result.missing_keywords.len(),
            total_time_ms = start.elapsed().as_millis() as u64,
            "Analysis completed"
        );

        Ok(result)
    }
}

/// The blocking task died before returning; reported like any other parser
/// failure.
fn extraction_task_failed(err: JoinError) -> AppError {
    AppError::ExtractionFailed {
        message: format!("extraction task aborted: {}", err),
    }
}
