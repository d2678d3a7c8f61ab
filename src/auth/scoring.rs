//! Candidate profile-completion scoring.
//!
//! Additive and order-independent: each criterion contributes a fixed
//! weight toward 100. Non-candidate accounts always score the maximum.

pub const SCORE_RESUME: u8 = 30;
pub const SCORE_SUMMARY: u8 = 20;
pub const SCORE_EXPERIENCE: u8 = 25;
pub const SCORE_EDUCATION: u8 = 25;

/// Parse a serialized JSON list field. Historic rows carry malformed data;
/// a parse failure scores as an empty list instead of erroring.
pub fn parse_list(raw: Option<&str>) -> Vec<serde_json::Value> {
    raw.and_then(|s| serde_json::from_str::<Vec<serde_json::Value>>(s).ok())
        .unwrap_or_default()
}

pub fn profile_completion(
    resume_url: Option<&str>,
    summary: Option<&str>,
    experience: Option<&str>,
    education: Option<&str>,
) -> u8 {
    let mut score = 0;
    if resume_url.is_some_and(|r| !r.is_empty()) {
        score += SCORE_RESUME;
    }
    if summary.is_some_and(|s| s.trim().len() >= 3) {
        score += SCORE_SUMMARY;
    }
    if !parse_list(experience).is_empty() {
        score += SCORE_EXPERIENCE;
    }
    if !parse_list(education).is_empty() {
        score += SCORE_EDUCATION;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_profile_scores_zero() {
        assert_eq!(profile_completion(None, None, None, None), 0);
    }

    #[test]
    fn full_profile_scores_hundred() {
        assert_eq!(
            profile_completion(
                Some("resumes/jane.pdf"),
                Some("ICU nurse with 10 years of experience"),
                Some(r#"[{"employer":"St. Mary"}]"#),
                Some(r#"[{"school":"UCLA"}]"#),
            ),
            100
        );
    }

    #[test]
    fn resume_and_summary_with_empty_lists_scores_fifty() {
        assert_eq!(
            profile_completion(Some("cv.pdf"), Some("RN."), Some("[]"), Some("[]")),
            50
        );
    }

    #[test]
    fn summary_must_have_three_chars_after_trim() {
        assert_eq!(profile_completion(None, Some("  a  "), None, None), 0);
        assert_eq!(profile_completion(None, Some(" abc "), None, None), SCORE_SUMMARY);
    }

    #[test]
    fn malformed_list_fields_score_as_empty() {
        assert_eq!(profile_completion(None, None, Some("{not json"), Some("12")), 0);
        assert_eq!(parse_list(Some("null")), Vec::<serde_json::Value>::new());
    }

    #[test]
    fn each_criterion_contributes_independently() {
        assert_eq!(profile_completion(Some("cv"), None, None, None), SCORE_RESUME);
        assert_eq!(
            profile_completion(None, None, Some(r#"["x"]"#), None),
            SCORE_EXPERIENCE
        );
        assert_eq!(
            profile_completion(None, None, None, Some(r#"["x"]"#)),
            SCORE_EDUCATION
        );
    }
}
