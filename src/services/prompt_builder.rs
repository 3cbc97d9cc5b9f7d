/// Upper bound, in characters, on each text embedded in the prompt.
pub const MAX_SECTION_CHARS: usize = 3000;

/// Fixed system message: assistant role plus the strict-JSON requirement.
pub const ATS_SYSTEM_PROMPT: &str = "You are a helpful ATS assistant. \
    You MUST respond with strict JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Renders the résumé-vs-job evaluation prompt. Pure: identical inputs give
/// identical messages.
pub fn build_prompt(resume_text: &str, job_description: &str) -> Prompt {
    let resume = truncate_chars(resume_text, MAX_SECTION_CHARS);
    let job = truncate_chars(job_description, MAX_SECTION_CHARS);

    let user = format!(
        r#"You are an expert Applicant Tracking System (ATS).
Evaluate this candidate's resume against the Job Description.

RESUME TEXT:
"{resume}"

JOB DESCRIPTION:
"{job}"

Scoring guidance:
- 80-100: strong match, the candidate covers nearly all required skills.
- 50-79: potential match, some required skills are missing.
- Below 50: poor match.
- Weight hard technical skills (languages, frameworks, tools, certifications) above soft skills.
- Only list missing keywords that actually appear in the Job Description. Do not invent skills.

Output strictly in JSON format:
{{
    "score": (integer 0-100),
    "missingKeywords": ["array", "of", "strings"],
    "formattingIssues": ["array", "of", "strings"],
    "feedback": "string"
}}
Do not include markdown formatting (like ```json)."#
    );

    Prompt {
        system: ATS_SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// Prefix of at most `max_chars` characters, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
