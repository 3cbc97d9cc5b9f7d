use bytes::Bytes;

use crate::error::{AppError, AppResult};

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const OCTET_STREAM_MIME: &str = "application/octet-stream";

/// Résumé formats the service knows how to turn into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Pdf,
    Docx,
}

impl MediaType {
    /// Matches a declared content type, ignoring parameters and case.
    pub fn parse(declared: &str) -> Option<Self> {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            PDF_MIME => Some(MediaType::Pdf),
            DOCX_MIME => Some(MediaType::Docx),
            _ => None,
        }
    }

    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_lowercase();
        if lower.ends_with(".pdf") {
            Some(MediaType::Pdf)
        } else if lower.ends_with(".docx") {
            Some(MediaType::Docx)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Pdf => PDF_MIME,
            MediaType::Docx => DOCX_MIME,
        }
    }
}

/// A résumé as it arrived in the multipart body. Never persisted.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    pub media_type: String,
    pub content: Bytes,
}

impl UploadedDocument {
    pub fn new(file_name: String, content: Bytes) -> Self {
        Self {
            file_name,
            media_type: OCTET_STREAM_MIME.to_string(),
            content,
        }
    }

    pub fn with_media_type(mut self, media_type: String) -> Self {
        self.media_type = media_type;
        self
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// The media type extraction should dispatch on. A declared type is
    /// trusted as-is; only a missing or generic one is inferred from the
    /// filename or the PDF magic bytes.
    pub fn effective_media_type(&self) -> String {
        let declared = self.media_type.trim();
        let is_generic = declared.is_empty()
            || declared.eq_ignore_ascii_case(OCTET_STREAM_MIME);

        if !is_generic {
            return declared.to_string();
        }

        MediaType::from_file_name(&self.file_name)
            .or_else(|| self.content.starts_with(b"%PDF").then_some(MediaType::Pdf))
            .map(|mt| mt.as_str().to_string())
            .unwrap_or_else(|| declared.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub resume: UploadedDocument,
    pub job_description: String,
}

impl AnalysisRequest {
    /// Enforces that both inputs are present and non-empty.
    pub fn new(resume: Option<UploadedDocument>, job_description: Option<String>) -> AppResult<Self> {
        let (resume, job_description) = match (resume, job_description) {
            (Some(resume), Some(jd)) if !jd.trim().is_empty() => (resume, jd),
            _ => {
                return Err(AppError::invalid_request(
                    "Resume file and Job Description are required",
                ))
            }
        };

        if resume.content.is_empty() {
            return Err(AppError::invalid_request("Resume file is empty"));
        }

        Ok(Self {
            resume,
            job_description,
        })
    }
}
