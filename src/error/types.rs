use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::completion_client::CompletionError;
use crate::services::response_normalizer::NormalizeError;
use crate::services::text_extractor::ExtractError;

pub type AppResult<T> = Result<T, AppError>;

/// Caller-visible failure of an analysis request. Storage failures are absent
/// on purpose: they are logged by the persistence step and never reach here.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{message}")]
    InvalidRequest { message: String },

    #[error("Unsupported file type: {media_type}")]
    UnsupportedFormat { media_type: String },

    #[error("Text extraction failed: {message}")]
    ExtractionFailed { message: String },

    #[error("Completion request failed: {message}")]
    CompletionFailed { message: String },

    #[error("Model output could not be parsed: {message}")]
    MalformedModelOutput { message: String },

    #[error("Upload too large: the resume file may be at most {limit}MB")]
    FileTooLarge { limit: usize },

    #[error("Rate limit exceeded: maximum concurrent requests reached")]
    RateLimitExceeded,
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest { .. } => "INVALID_REQUEST",
            AppError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            AppError::ExtractionFailed { .. } => "EXTRACTION_FAILED",
            AppError::CompletionFailed { .. } => "COMPLETION_FAILED",
            AppError::MalformedModelOutput { .. } => "MALFORMED_MODEL_OUTPUT",
            AppError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            AppError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::UnsupportedFormat { .. }
            | AppError::ExtractionFailed { .. }
            | AppError::CompletionFailed { .. }
            | AppError::MalformedModelOutput { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        tracing::error!(
            error_code = error_code,
            status_code = %status,
            error_message = %message,
            "API error occurred"
        );

        // Client errors carry their message directly; downstream failures
        // report a fixed headline and put the cause in `details`.
        let body = if status.is_server_error() {
            json!({
                "error": "Analysis failed",
                "code": error_code,
                "details": message,
            })
        } else {
            json!({
                "error": message,
                "code": error_code,
            })
        };

        (status, Json(body)).into_response()
    }
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::UnsupportedFormat { media_type } => AppError::UnsupportedFormat { media_type },
            ExtractError::ExtractionFailed { message } => AppError::ExtractionFailed { message },
        }
    }
}

impl From<CompletionError> for AppError {
    fn from(err: CompletionError) -> Self {
        AppError::CompletionFailed {
            message: err.to_string(),
        }
    }
}

impl From<NormalizeError> for AppError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::MalformedModelOutput { reason, .. } => AppError::MalformedModelOutput { message: reason },
        }
    }
}

impl AppError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        AppError::InvalidRequest {
            message: message.into(),
        }
    }
}
