//! Run results and the per-iteration event log.

use serde::Serialize;
use uuid::Uuid;

use super::Target;
use crate::context::{ArtifactState, StateUpdate};
use crate::core::{StageId, Verdict};

/// One completed iteration: a generation and a review of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunEvent {
    /// 1-based iteration number.
    pub iteration: u32,
    /// The stage that ran.
    pub stage: StageId,
    /// The writes merged during the iteration, generation first.
    pub update: StateUpdate,
    /// The reviewer's verdict.
    pub verdict: Verdict,
    /// Where the verdict sent the run.
    pub next: Target,
}

impl RunEvent {
    /// Returns true if the reviewer rejected the artifact.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        !self.verdict.is_approval()
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "iteration": self.iteration,
            "stage": self.stage,
            "update": self.update.to_dict(),
            "verdict": self.verdict,
            "next": self.next.to_string(),
        })
    }
}

/// The outcome of a run that reached the terminal state.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// The run id.
    pub run_id: Uuid,
    /// The pipeline name.
    pub pipeline: String,
    /// The per-iteration events, in order.
    pub events: Vec<RunEvent>,
    /// The state after the last merge.
    pub final_state: ArtifactState,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
}

impl RunResult {
    /// Returns the number of iterations the run took.
    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.events.last().map_or(0, |event| event.iteration)
    }

    /// Returns the stages in the order they ran.
    #[must_use]
    pub fn visit_order(&self) -> Vec<StageId> {
        self.events.iter().map(|event| event.stage).collect()
    }

    /// Returns how many times `stage` ran.
    #[must_use]
    pub fn visits(&self, stage: StageId) -> usize {
        self.events.iter().filter(|event| event.stage == stage).count()
    }

    /// Returns the number of rejections across the run.
    #[must_use]
    pub fn rejections(&self) -> usize {
        self.events.iter().filter(|event| event.is_rejection()).count()
    }

    /// Returns the verdict that ended the run.
    #[must_use]
    pub fn final_verdict(&self) -> Option<Verdict> {
        self.events.last().map(|event| event.verdict)
    }

    /// Rebuilds the final state by merging every event's update, in order,
    /// into a fresh state for the same topic.
    #[must_use]
    pub fn replay(&self) -> ArtifactState {
        let mut state = ArtifactState::new(self.final_state.topic());
        for event in &self.events {
            state.merge(&event.update);
        }
        state
    }

    /// Renders the final artifacts as a plain-text report.
    #[must_use]
    pub fn report(&self) -> String {
        crate::report::render_report(&self.final_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn event(iteration: u32, stage: StageId, verdict: Verdict, next: Target) -> RunEvent {
        RunEvent {
            iteration,
            stage,
            update: StateUpdate::new()
                .artifact(stage, format!("{stage} v{iteration}"))
                .verdict(stage, verdict)
                .feedback(stage, if verdict.is_approval() { "" } else { "again" }),
            verdict,
            next,
        }
    }

    fn result() -> RunResult {
        let events = vec![
            event(1, StageId::Content, Verdict::FeedBack, Target::Stage(StageId::Content)),
            event(2, StageId::Content, Verdict::Approved, Target::Stage(StageId::Design)),
            event(3, StageId::Design, Verdict::Approved, Target::Terminal),
        ];
        let mut final_state = ArtifactState::new("todo app");
        for e in &events {
            final_state.merge(&e.update);
        }
        RunResult {
            run_id: Uuid::new_v4(),
            pipeline: "test".to_string(),
            events,
            final_state,
            duration_ms: 1.0,
        }
    }

    #[test]
    fn test_counts() {
        let result = result();
        assert_eq!(result.iterations(), 3);
        assert_eq!(result.visits(StageId::Content), 2);
        assert_eq!(result.rejections(), 1);
        assert_eq!(result.final_verdict(), Some(Verdict::Approved));
        assert_eq!(
            result.visit_order(),
            vec![StageId::Content, StageId::Content, StageId::Design]
        );
    }

    #[test]
    fn test_replay_matches_final_state() {
        let result = result();
        assert_eq!(result.replay(), result.final_state);
        assert_eq!(result.replay().artifact(StageId::Content).unwrap(), "Content v2");
    }

    #[test]
    fn test_event_to_dict() {
        let dict = event(4, StageId::Security, Verdict::FeedBack, Target::Stage(StageId::Code)).to_dict();
        assert_eq!(dict["stage"], "Security");
        assert_eq!(dict["next"], "Code");
        assert_eq!(dict["update"]["security_feedback"], "again");
    }
}
