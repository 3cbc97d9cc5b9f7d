use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::models::AnalysisResult;

const FENCE: &str = "```";
const SCORE_RANGE: std::ops::RangeInclusive<i64> = 0..=100;

/// What to do with a model-reported score outside 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScorePolicy {
    /// Treat the reply as malformed.
    #[default]
    Reject,
    /// Pull the score into range.
    Clamp,
    /// Return the score as reported.
    PassThrough,
}

impl FromStr for ScorePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" | "strict" => Ok(ScorePolicy::Reject),
            "clamp" => Ok(ScorePolicy::Clamp),
            "passthrough" | "pass-through" | "pass_through" => Ok(ScorePolicy::PassThrough),
            other => Err(format!(
                "unknown score policy '{}', expected reject, clamp or passthrough",
                other
            )),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// `raw` keeps the untouched reply for diagnostics.
    #[error("Model output could not be parsed: {reason}")]
    MalformedModelOutput { reason: String, raw: String },
}

impl NormalizeError {
    fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        NormalizeError::MalformedModelOutput {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }

    pub fn raw_reply(&self) -> &str {
        match self {
            NormalizeError::MalformedModelOutput { raw, .. } => raw,
        }
    }
}

/// Removes markdown code-fence markers (with or without a language tag)
/// around or between the lines of a reply. Everything else is kept.
pub fn strip_code_fences(reply: &str) -> String {
    let mut text = reply.trim();

    if let Some(rest) = text.strip_prefix(FENCE) {
        text = rest.trim_start_matches(is_fence_tag_char);
    }
    if let Some(rest) = text.trim_end().strip_suffix(FENCE) {
        text = rest;
    }

    text.lines()
        .filter(|line| !is_fence_line(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn is_fence_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+')
}

fn is_fence_line(line: &str) -> bool {
    line.trim()
        .strip_prefix(FENCE)
        .map(|tag| tag.chars().all(is_fence_tag_char))
        .unwrap_or(false)
}

/// Parses a model reply into an `AnalysisResult`, validating every field
/// explicitly. Never panics on arbitrary input.
pub fn normalize(reply: &str, policy: ScorePolicy) -> Result<AnalysisResult, NormalizeError> {
    let cleaned = strip_code_fences(reply);

    let value: Value = serde_json::from_str(&cleaned).map_err(|e| {
        NormalizeError::malformed(format!("reply is not valid JSON: {}", e), reply)
    })?;

    let object = value
        .as_object()
        .ok_or_else(|| NormalizeError::malformed("reply is not a JSON object", reply))?;

    let score = read_score(object, policy).map_err(|reason| NormalizeError::malformed(reason, reply))?;
    let missing_keywords = read_string_list(object, "missingKeywords")
        .map_err(|reason| NormalizeError::malformed(reason, reply))?;
    let formatting_issues = read_string_list(object, "formattingIssues")
        .map_err(|reason| NormalizeError::malformed(reason, reply))?;
    let feedback = match object.get("feedback") {
        Some(Value::String(feedback)) => feedback.clone(),
        Some(_) => return Err(NormalizeError::malformed("field 'feedback' must be a string", reply)),
        None => return Err(NormalizeError::malformed("field 'feedback' is missing", reply)),
    };

    Ok(AnalysisResult {
        score,
        missing_keywords,
        formatting_issues,
        feedback,
    })
}

fn read_score(object: &Map<String, Value>, policy: ScorePolicy) -> Result<i64, String> {
    let number = match object.get("score") {
        Some(Value::Number(number)) => number,
        Some(_) => return Err("field 'score' must be an integer".to_string()),
        None => return Err("field 'score' is missing".to_string()),
    };

    // 72.0 is accepted as 72; 72.5 is not an integer score
    let score = match (number.as_i64(), number.as_f64()) {
        (Some(score), _) => score,
        (None, Some(f)) if f.is_finite() && f.fract() == 0.0 => f as i64,
        _ => return Err(format!("field 'score' must be an integer, got {}", number)),
    };

    if SCORE_RANGE.contains(&score) {
        return Ok(score);
    }

    match policy {
        ScorePolicy::Reject => Err(format!("field 'score' is {}, outside 0-100", score)),
        ScorePolicy::Clamp => {
            let clamped = score.clamp(*SCORE_RANGE.start(), *SCORE_RANGE.end());
            warn!(reported = score, clamped = clamped, "Clamping out-of-range score");
            Ok(clamped)
        }
        ScorePolicy::PassThrough => {
            warn!(reported = score, "Passing through out-of-range score");
            Ok(score)
        }
    }
}

/// Absent or null lists become empty; anything but an array of strings is
/// rejected.
fn read_string_list(object: &Map<String, Value>, field: &str) -> Result<Vec<String>, String> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("field '{}' must contain only strings", field))
            })
            .collect(),
        Some(_) => Err(format!("field '{}' must be an array of strings", field)),
    }
}
