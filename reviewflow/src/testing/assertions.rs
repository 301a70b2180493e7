//! Assertions over run results.

use crate::context::ArtifactState;
use crate::core::{StageId, Verdict};
use crate::pipeline::{RunResult, Target};

/// Asserts the stages ran in exactly this order.
pub fn assert_visit_order(result: &RunResult, expected: &[StageId]) {
    assert_eq!(
        result.visit_order(),
        expected,
        "Unexpected visit order in run {}",
        result.run_id
    );
}

/// Asserts the run ended on the terminal state with the given verdict.
pub fn assert_reached_terminal(result: &RunResult, verdict: Verdict) {
    let last = result
        .events
        .last()
        .unwrap_or_else(|| panic!("Run {} recorded no events", result.run_id));
    assert_eq!(last.next, Target::Terminal, "Last event did not route to Terminal");
    assert_eq!(last.verdict, verdict, "Run ended on an unexpected verdict");
}

/// Asserts every stage of the standard topology has an artifact.
pub fn assert_all_artifacts(state: &ArtifactState) {
    let missing: Vec<StageId> = StageId::ALL
        .into_iter()
        .filter(|stage| !state.has_artifact(*stage))
        .collect();
    assert!(missing.is_empty(), "Missing artifacts for stages: {missing:?}");
}

/// Asserts the events' updates replay to the final state.
pub fn assert_replay_consistent(result: &RunResult) {
    assert_eq!(
        result.replay(),
        result.final_state,
        "Replaying the events does not reproduce the final state"
    );
}
