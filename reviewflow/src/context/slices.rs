//! Read-only views of the state handed to capabilities.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::StageId;

/// Whether a generator should write from scratch or revise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// No feedback to act on.
    Create,
    /// Feedback is present and must be incorporated.
    Revise,
}

/// Feedback delivered to an earlier stage through a cross-stage back-edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedFeedback {
    /// The stage whose reviewer rejected.
    pub from: StageId,
    /// That reviewer's feedback.
    pub feedback: String,
}

/// Everything a generator sees for one visit to its stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationContext {
    /// The run this call belongs to.
    pub run_id: Uuid,
    /// The stage being generated.
    pub stage: StageId,
    /// 1-based iteration of the run.
    pub iteration: u32,
    /// 1-based count of visits to this stage in the run.
    pub visit: u32,
    /// The run topic.
    pub topic: String,
    /// The generation input (the topic or an upstream artifact).
    pub input: String,
    /// This stage's artifact from its previous visit.
    pub previous_artifact: Option<String>,
    /// This stage's latest review feedback.
    pub feedback: Option<String>,
    /// Feedback carried by a cross-stage back-edge into this visit.
    pub routed_feedback: Option<RoutedFeedback>,
    /// Create or revise.
    pub mode: GenerationMode,
}

impl GenerationContext {
    /// Returns the stage's own feedback when it is non-empty.
    #[must_use]
    pub fn pending_feedback(&self) -> Option<&str> {
        self.feedback.as_deref().filter(|f| !f.is_empty())
    }

    /// Returns true if the generator must revise.
    #[must_use]
    pub fn is_revision(&self) -> bool {
        self.mode == GenerationMode::Revise
    }
}

/// Everything a reviewer sees for one visit to its stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewContext {
    /// The run this call belongs to.
    pub run_id: Uuid,
    /// The stage being reviewed.
    pub stage: StageId,
    /// 1-based iteration of the run.
    pub iteration: u32,
    /// 1-based count of visits to this stage in the run.
    pub visit: u32,
    /// The run topic.
    pub topic: String,
    /// What the artifact is judged against (the topic or an upstream artifact).
    pub reference: String,
    /// The artifact under review.
    pub artifact: String,
    /// The labels the reviewer may answer with, approve label first.
    pub allowed_verdicts: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(feedback: Option<&str>) -> GenerationContext {
        GenerationContext {
            run_id: Uuid::new_v4(),
            stage: StageId::Code,
            iteration: 3,
            visit: 1,
            topic: "t".to_string(),
            input: "design".to_string(),
            previous_artifact: None,
            feedback: feedback.map(str::to_string),
            routed_feedback: None,
            mode: GenerationMode::Create,
        }
    }

    #[test]
    fn test_pending_feedback_ignores_empty() {
        assert_eq!(context(None).pending_feedback(), None);
        assert_eq!(context(Some("")).pending_feedback(), None);
        assert_eq!(context(Some("add auth")).pending_feedback(), Some("add auth"));
    }

    #[test]
    fn test_mode_serialize() {
        assert_eq!(serde_json::to_string(&GenerationMode::Revise).unwrap(), r#""revise""#);
    }
}
