use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{HeaderMap, StatusCode},
    response::Json,
};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::middleware::request_id;
use crate::models::{AnalysisRequest, AnalysisResult, UploadedDocument};
use crate::state::AppState;

pub const RESUME_FIELD: &str = "resume";
pub const JOB_DESCRIPTION_FIELD: &str = "jobDescription";

/// POST /api/analyze
pub async fn analyze_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<AnalysisResult>> {
    let request_id = request_id(&headers);
    info!(request_id = %request_id, "Starting resume analysis request");

    let mut multipart = multipart.map_err(|rejection| {
        warn!(request_id = %request_id, error = %rejection.body_text(), "Request body is not multipart");
        AppError::invalid_request("Resume file and Job Description are required")
    })?;

    let request = read_analysis_request(&mut multipart, &state)
        .await
        .map_err(|e| {
            warn!(request_id = %request_id, error = %e, "Rejected analysis request");
            e
        })?;

    let result = state.pipeline.analyze(request, &request_id).await?;
    Ok(Json(result))
}

/// Collects the `resume` file part and the `jobDescription` text field, in
/// whichever order they arrive. Unknown fields are skipped.
async fn read_analysis_request(multipart: &mut Multipart, state: &AppState) -> AppResult<AnalysisRequest> {
    let limit_mb = state.max_file_size_mb;
    let mut resume: Option<UploadedDocument> = None;
    let mut job_description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit_mb))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            RESUME_FIELD if resume.is_none() => {
                let file_name = field.file_name().unwrap_or("resume").to_string();
                let content_type = field.content_type().map(|ct| ct.to_string());
                let data = field.bytes().await.map_err(|e| multipart_error(e, limit_mb))?;
                if data.len() > state.max_file_size_bytes() {
                    return Err(AppError::FileTooLarge { limit: limit_mb });
                }

                let mut document = UploadedDocument::new(file_name, data);
                if let Some(media_type) = content_type {
                    document = document.with_media_type(media_type);
                }

                debug!(
                    "Received resume: {} ({} bytes, type: {})",
                    document.file_name,
                    document.size(),
                    document.media_type
                );
                resume = Some(document);
            }
            JOB_DESCRIPTION_FIELD if job_description.is_none() => {
                let text = field.text().await.map_err(|e| multipart_error(e, limit_mb))?;
                job_description = Some(text);
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    AnalysisRequest::new(resume, job_description)
}

fn multipart_error(err: MultipartError, limit_mb: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::FileTooLarge { limit: limit_mb }
    } else {
        AppError::invalid_request(format!("Failed to read multipart body: {}", err.body_text()))
    }
}
