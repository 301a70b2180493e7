//! Routing of review verdicts.

use serde::{Deserialize, Serialize};

use super::{StageSpec, Target};
use crate::core::{StageId, Verdict, VerdictVocabulary};
use crate::errors::ReviewflowError;

/// Direction a verdict sends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Follow the forward edge.
    Forward,
    /// Follow the backward edge.
    Backward,
}

/// Maps a verdict to a direction.
///
/// Total over `vocabulary`; a verdict from another vocabulary is an error,
/// never a default.
///
/// # Errors
///
/// Returns `InvalidVerdict` if `verdict` is not one of the two labels.
pub fn route(
    stage: StageId,
    vocabulary: &VerdictVocabulary,
    verdict: Verdict,
) -> Result<Route, ReviewflowError> {
    if verdict == vocabulary.approve {
        Ok(Route::Forward)
    } else if verdict == vocabulary.reject {
        Ok(Route::Backward)
    } else {
        Err(ReviewflowError::invalid_verdict(
            stage,
            verdict.as_str(),
            vocabulary.labels(),
        ))
    }
}

/// Maps a verdict to the target named by the spec's edges.
///
/// # Errors
///
/// Returns `InvalidVerdict` if `verdict` is outside the spec's vocabulary.
pub fn resolve(spec: &StageSpec, verdict: Verdict) -> Result<Target, ReviewflowError> {
    Ok(match route(spec.stage, &spec.vocabulary, verdict)? {
        Route::Forward => spec.forward,
        Route::Backward => Target::Stage(spec.backward),
    })
}
