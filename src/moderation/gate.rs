//! Light moderation gate
//!
//! Synchronous, in-process lexical screening run before anything is
//! persisted. Pure function, no I/O: a case-insensitive substring scan over
//! static phrase lists, first match wins. Deliberately coarse and biased
//! against false negatives - any lexical match is maximum severity at full
//! confidence. Nuance is the heavy path's job.

use serde::Serialize;

use crate::moderation::lexicon::{FLAGGED_PHRASES, SELF_HARM_PHRASES, SUICIDE_PHRASES};

/// Severity assigned to any lexical match
pub const LEXICAL_SEVERITY: i32 = 5;

/// Result of a light moderation check.
///
/// `should_block` is stricter than `flagged`: a blocking verdict prevents
/// storage entirely, a flagged one stores the content and records a flag.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub flagged: bool,
    pub reason: Option<String>,
    pub severity_level: i32,
    pub confidence_score: f64,
    pub should_block: bool,
}

impl Verdict {
    fn clean() -> Self {
        Self {
            flagged: false,
            reason: None,
            severity_level: 0,
            confidence_score: 0.0,
            should_block: false,
        }
    }

    fn matched(reason: String, should_block: bool) -> Self {
        Self {
            flagged: true,
            reason: Some(reason),
            severity_level: LEXICAL_SEVERITY,
            confidence_score: 1.0,
            should_block,
        }
    }
}

/// Screen text against the static phrase lists.
///
/// Blocking categories (suicide and self-harm phrasing) are checked first so
/// a submission that matches both a blocking and a flag phrase is refused,
/// not merely flagged.
pub fn check(text: &str) -> Verdict {
    let lowered = text.to_lowercase();

    for phrase in SUICIDE_PHRASES {
        if lowered.contains(phrase) {
            return Verdict::matched("suicidal_ideation".to_string(), true);
        }
    }

    for phrase in SELF_HARM_PHRASES {
        if lowered.contains(phrase) {
            return Verdict::matched("self_harm".to_string(), true);
        }
    }

    for phrase in FLAGGED_PHRASES {
        if lowered.contains(phrase) {
            return Verdict::matched(format!("contains blocked phrase: '{}'", phrase), false);
        }
    }

    Verdict::clean()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_text_passes_clean() {
        let verdict = check("Hello world, great day!");
        assert!(!verdict.flagged);
        assert!(!verdict.should_block);
        assert_eq!(verdict.confidence_score, 0.0);
        assert!(verdict.reason.is_none());
    }

    #[test]
    fn test_suicide_phrasing_blocks() {
        let verdict = check("I want to kill myself");
        assert!(verdict.flagged);
        assert!(verdict.should_block);
        assert_eq!(verdict.reason.as_deref(), Some("suicidal_ideation"));
        assert_eq!(verdict.severity_level, LEXICAL_SEVERITY);
        assert_eq!(verdict.confidence_score, 1.0);
    }

    #[test]
    fn test_self_harm_phrasing_blocks() {
        let verdict = check("thinking about cutting myself again");
        assert!(verdict.should_block);
        assert_eq!(verdict.reason.as_deref(), Some("self_harm"));
    }

    #[test]
    fn test_abuse_is_flagged_not_blocked() {
        let verdict = check("I hate you");
        assert!(verdict.flagged);
        assert!(!verdict.should_block);
        assert_eq!(verdict.severity_level, LEXICAL_SEVERITY);
        assert_eq!(verdict.confidence_score, 1.0);
        assert!(verdict
            .reason
            .as_deref()
            .unwrap()
            .contains("i hate you"));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert!(check("I WANT TO KILL MYSELF").should_block);
        assert!(check("i HaTe YoU").flagged);
    }

    #[test]
    fn test_match_inside_longer_text() {
        let verdict = check("honestly after today everyone sucks and I mean it");
        assert!(verdict.flagged);
        assert!(!verdict.should_block);
    }

    #[test]
    fn test_blocking_wins_over_flagging() {
        // Contains both a flag phrase and a blocking phrase
        let verdict = check("I hate you and I want to die");
        assert!(verdict.should_block);
        assert_eq!(verdict.reason.as_deref(), Some("suicidal_ideation"));
    }
}
