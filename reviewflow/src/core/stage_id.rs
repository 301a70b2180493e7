//! Stage identifiers and their state key names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::VerdictVocabulary;

/// Identifies one of the six delivery stages.
///
/// The declaration order is the pipeline order, so `Ord` can be used to
/// check that a back-edge points at or before its source stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageId {
    /// Turns the topic into user stories.
    Content,
    /// Turns user stories into a design document.
    Design,
    /// Implements the design.
    Code,
    /// Analyses the code for security issues.
    Security,
    /// Writes test cases for the code.
    Test,
    /// Writes QA scenarios for the test cases.
    #[serde(rename = "QA")]
    Qa,
}

impl StageId {
    /// All stages in pipeline order.
    pub const ALL: [Self; 6] = [
        Self::Content,
        Self::Design,
        Self::Code,
        Self::Security,
        Self::Test,
        Self::Qa,
    ];

    /// Returns the display name of the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Content => "Content",
            Self::Design => "Design",
            Self::Code => "Code",
            Self::Security => "Security",
            Self::Test => "Test",
            Self::Qa => "QA",
        }
    }

    /// Key under which the stage's artifact is stored.
    #[must_use]
    pub const fn artifact_key(self) -> &'static str {
        match self {
            Self::Content => "user_stories",
            Self::Design => "design_document",
            Self::Code => "code",
            Self::Security => "security_review",
            Self::Test => "test_case",
            Self::Qa => "question_answer_testing",
        }
    }

    /// Key under which the stage's latest review feedback is stored.
    #[must_use]
    pub const fn feedback_key(self) -> &'static str {
        match self {
            Self::Content => "product_feedback",
            Self::Design => "design_feedback",
            Self::Code => "code_feedback",
            Self::Security => "security_feedback",
            Self::Test => "test_case_feedback",
            Self::Qa => "question_answer_testing_feedback",
        }
    }

    /// Key under which the stage's latest verdict is stored.
    #[must_use]
    pub const fn approval_key(self) -> &'static str {
        match self {
            Self::Content => "product_approval",
            Self::Design => "design_approval",
            Self::Code => "code_approval",
            Self::Security => "security_approval",
            Self::Test => "test_case_approval",
            Self::Qa => "question_answer_testing_approval",
        }
    }

    /// The verdict labels the stage's reviewer may emit.
    #[must_use]
    pub const fn vocabulary(self) -> VerdictVocabulary {
        match self {
            Self::Qa => VerdictVocabulary::QA,
            _ => VerdictVocabulary::REVIEW,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("Unknown stage: {s}"))
    }
}
