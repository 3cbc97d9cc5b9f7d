use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role label stored with every record until the job description is parsed
/// for a real title.
pub const DEFAULT_JOB_ROLE: &str = "Extracted from JD";

/// What the caller gets back on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub score: i64,
    pub missing_keywords: Vec<String>,
    pub formatting_issues: Vec<String>,
    pub feedback: String,
}

/// The audited subset of a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub job_role: String,
    pub score: i64,
    pub missing_keywords: Vec<String>,
    pub date: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn from_result(result: &AnalysisResult) -> Self {
        Self {
            job_role: DEFAULT_JOB_ROLE.to_string(),
            score: result.score,
            missing_keywords: result.missing_keywords.clone(),
            date: Utc::now(),
        }
    }
}
