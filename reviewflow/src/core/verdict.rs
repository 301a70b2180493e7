//! Review verdicts and per-stage verdict vocabularies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A reviewer's decision, using the exact labels reviewers emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// The artifact may advance (review stages).
    Approved,
    /// The artifact must be revised (review stages).
    FeedBack,
    /// The artifact may advance (QA stage).
    Passed,
    /// The artifact must be revised (QA stage).
    Failed,
}

impl Verdict {
    /// Returns the case-sensitive label of the verdict.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::FeedBack => "FeedBack",
            Self::Passed => "Passed",
            Self::Failed => "Failed",
        }
    }

    /// Returns true for the approving labels.
    #[must_use]
    pub const fn is_approval(self) -> bool {
        matches!(self, Self::Approved | Self::Passed)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two labels a stage's reviewer is allowed to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerdictVocabulary {
    /// Label that routes forward.
    pub approve: Verdict,
    /// Label that routes backward.
    pub reject: Verdict,
}

impl VerdictVocabulary {
    /// Vocabulary of the content, design, code, security and test reviewers.
    pub const REVIEW: Self = Self {
        approve: Verdict::Approved,
        reject: Verdict::FeedBack,
    };

    /// Vocabulary of the QA reviewer.
    pub const QA: Self = Self {
        approve: Verdict::Passed,
        reject: Verdict::Failed,
    };

    /// Parses a raw label. Matching is exact and case-sensitive.
    #[must_use]
    pub fn parse(&self, raw: &str) -> Option<Verdict> {
        [self.approve, self.reject]
            .into_iter()
            .find(|verdict| verdict.as_str() == raw)
    }

    /// Returns true if the verdict belongs to this vocabulary.
    #[must_use]
    pub fn contains(&self, verdict: Verdict) -> bool {
        verdict == self.approve || verdict == self.reject
    }

    /// Both labels, approve label first.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        vec![self.approve.to_string(), self.reject.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_labels() {
        assert_eq!(VerdictVocabulary::REVIEW.parse("Approved"), Some(Verdict::Approved));
        assert_eq!(VerdictVocabulary::REVIEW.parse("FeedBack"), Some(Verdict::FeedBack));
        assert_eq!(VerdictVocabulary::QA.parse("Failed"), Some(Verdict::Failed));
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(VerdictVocabulary::REVIEW.parse("approved"), None);
        assert_eq!(VerdictVocabulary::REVIEW.parse("Feedback"), None);
        assert_eq!(VerdictVocabulary::REVIEW.parse(" Approved"), None);
    }

    #[test]
    fn test_vocabularies_do_not_overlap() {
        assert_eq!(VerdictVocabulary::REVIEW.parse("Passed"), None);
        assert_eq!(VerdictVocabulary::QA.parse("Approved"), None);
        assert!(!VerdictVocabulary::QA.contains(Verdict::FeedBack));
    }

    #[test]
    fn test_verdict_serialize() {
        let json = serde_json::to_string(&Verdict::FeedBack).unwrap();
        assert_eq!(json, r#""FeedBack""#);
        let parsed: Verdict = serde_json::from_str(r#""Passed""#).unwrap();
        assert_eq!(parsed, Verdict::Passed);
    }
}
