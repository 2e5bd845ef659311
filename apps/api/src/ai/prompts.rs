// Prompt text for candidate-fit summaries. Every provider sends the same system + user pair,
// mapped into its own request schema.

/// Job text beyond this many characters is cut before prompting.
pub const JOB_EXCERPT_CHARS: usize = 1200;
/// Candidate text beyond this many characters is cut before prompting.
pub const CANDIDATE_EXCERPT_CHARS: usize = 1500;

pub const SUMMARY_SYSTEM: &str = "You are an expert HR recruiter. \
    Provide specific, professional analysis of how a candidate fits a role. \
    Base every statement on the resume text provided. Do not invent experience.";

/// Prompt used by connection tests. Kept tiny; the reply is discarded.
pub const CONNECTION_TEST_PROMPT: &str = "Test";
pub const CONNECTION_TEST_MAX_TOKENS: u32 = 5;

/// Builds the user prompt for one candidate. Inputs are inserted once and never re-scanned, so
/// braces in job or resume text come through literally.
pub fn summary_prompt(job_text: &str, candidate_name: &str, candidate_text: &str) -> String {
    let job_excerpt = excerpt(job_text, JOB_EXCERPT_CHARS);
    let candidate_excerpt = excerpt(candidate_text, CANDIDATE_EXCERPT_CHARS);

    format!(
        "Job Description:
{job_excerpt}

Resume of {candidate_name}:
{candidate_excerpt}

Write a concise 3-sentence analysis explaining:
1. Why this candidate fits this specific role
2. Their strongest matching qualifications
3. The value they would bring to the position

Format as professional recruiter insights, not a generic summary."
    )
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let text = "é".repeat(10);
        assert_eq!(excerpt(&text, 3), "ééé");
        assert_eq!(excerpt("short", 100), "short");
    }

    #[test]
    fn test_summary_prompt_truncates_inputs() {
        let job = "j".repeat(5000);
        let resume = "r".repeat(5000);
        let prompt = summary_prompt(&job, "Jane Doe", &resume);

        assert!(prompt.contains("Resume of Jane Doe"));
        assert_eq!(prompt.matches('j').count(), JOB_EXCERPT_CHARS);
        assert!(prompt.contains(&"r".repeat(CANDIDATE_EXCERPT_CHARS)));
        assert!(!prompt.contains(&"r".repeat(CANDIDATE_EXCERPT_CHARS + 1)));
    }

    #[test]
    fn test_placeholder_text_in_inputs_is_not_substituted() {
        let prompt = summary_prompt(
            "Role {candidate_excerpt} end",
            "Jane {job_excerpt} Doe",
            "SECRET RESUME BODY",
        );

        assert_eq!(prompt.matches("SECRET RESUME BODY").count(), 1);
        assert!(prompt.contains("Role {candidate_excerpt} end"));
        assert!(prompt.contains("Resume of Jane {job_excerpt} Doe:"));
    }
}
