//! Stages: a generation step and a review step over injected capabilities.
//!
//! A [`Stage`] builds the minimal context each capability needs from the
//! run's [`ArtifactState`], calls the capability, and turns its answer into a
//! [`StateUpdate`]. It never writes the state itself.

mod capability;
mod review_output;

pub use capability::{
    CapabilityError, FnGenerator, FnReviewer, GenerateFuture, Generator, RawReview, ReviewFuture,
    Reviewer,
};
pub use review_output::model_feedback_field;

use tracing::debug;
use uuid::Uuid;

use crate::context::{
    ArtifactState, GenerationContext, GenerationMode, ReviewContext, RoutedFeedback, StateUpdate,
};
use crate::core::{StageId, Verdict};
use crate::errors::ReviewflowError;
use crate::pipeline::{InputSource, StageSpec};

/// Position of a stage call within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    /// The run id.
    pub run_id: Uuid,
    /// 1-based iteration of the run.
    pub iteration: u32,
    /// 1-based count of visits to the stage.
    pub visit: u32,
}

/// A runnable stage built from its spec.
#[derive(Debug, Clone)]
pub struct Stage {
    spec: StageSpec,
}

impl Stage {
    /// Creates a stage from its spec.
    #[must_use]
    pub fn new(spec: StageSpec) -> Self {
        Self { spec }
    }

    /// Returns the stage id.
    #[must_use]
    pub fn id(&self) -> StageId {
        self.spec.stage
    }

    /// Returns the stage spec.
    #[must_use]
    pub fn spec(&self) -> &StageSpec {
        &self.spec
    }

    /// Builds the context for the next generation call.
    ///
    /// The mode is `Revise` when the stage's own feedback is non-empty or a
    /// back-edge delivered feedback from a later stage.
    ///
    /// # Errors
    ///
    /// Returns `MissingKey` if the generation input has not been produced.
    pub fn generation_context(
        &self,
        state: &ArtifactState,
        visit: Visit,
        routed_feedback: Option<RoutedFeedback>,
    ) -> Result<GenerationContext, ReviewflowError> {
        let stage = self.id();
        let feedback = state.feedback(stage).map(str::to_string);
        let has_feedback = feedback.as_deref().is_some_and(|f| !f.is_empty());
        let mode = if has_feedback || routed_feedback.is_some() {
            GenerationMode::Revise
        } else {
            GenerationMode::Create
        };

        Ok(GenerationContext {
            run_id: visit.run_id,
            stage,
            iteration: visit.iteration,
            visit: visit.visit,
            topic: state.topic().to_string(),
            input: read_input(state, self.spec.generation_input)?,
            previous_artifact: state.artifact(stage).ok().map(str::to_string),
            feedback,
            routed_feedback,
            mode,
        })
    }

    /// Builds the context for the next review call.
    ///
    /// # Errors
    ///
    /// Returns `MissingKey` if the artifact or the reference is missing.
    pub fn review_context(
        &self,
        state: &ArtifactState,
        visit: Visit,
    ) -> Result<ReviewContext, ReviewflowError> {
        let stage = self.id();
        Ok(ReviewContext {
            run_id: visit.run_id,
            stage,
            iteration: visit.iteration,
            visit: visit.visit,
            topic: state.topic().to_string(),
            reference: read_input(state, self.spec.review_reference)?,
            artifact: state.artifact(stage)?.to_string(),
            allowed_verdicts: self.spec.vocabulary.labels(),
        })
    }

    /// Runs the generation step and returns the artifact write.
    ///
    /// # Errors
    ///
    /// Returns `GenerationFailed` if the capability fails.
    pub async fn generate(
        &self,
        state: &ArtifactState,
        visit: Visit,
        routed_feedback: Option<RoutedFeedback>,
    ) -> Result<StateUpdate, ReviewflowError> {
        let ctx = self.generation_context(state, visit, routed_feedback)?;
        debug!(
            stage = %ctx.stage,
            iteration = ctx.iteration,
            visit = ctx.visit,
            mode = ?ctx.mode,
            "Invoking generator"
        );

        let artifact = self
            .spec
            .generator
            .generate(&ctx)
            .await
            .map_err(|e| ReviewflowError::generation_failed(ctx.stage, e.reason, ctx.iteration))?;

        Ok(StateUpdate::new().artifact(ctx.stage, artifact))
    }

    /// Runs the review step and returns the parsed verdict with its writes.
    ///
    /// # Errors
    ///
    /// Returns `ReviewFailed` if the capability fails and `InvalidVerdict` if
    /// the label is not in the stage's vocabulary.
    pub async fn review(
        &self,
        state: &ArtifactState,
        visit: Visit,
    ) -> Result<(Verdict, StateUpdate), ReviewflowError> {
        let ctx = self.review_context(state, visit)?;
        debug!(
            stage = %ctx.stage,
            iteration = ctx.iteration,
            visit = ctx.visit,
            "Invoking reviewer"
        );

        let raw = self
            .spec
            .reviewer
            .review(&ctx)
            .await
            .map_err(|e| ReviewflowError::review_failed(ctx.stage, e.reason, ctx.iteration))?;

        let verdict = self.parse_verdict(&raw.verdict).map_err(|e| e.at_iteration(ctx.iteration))?;

        let update = StateUpdate::new()
            .verdict(ctx.stage, verdict)
            .feedback(ctx.stage, raw.feedback);
        Ok((verdict, update))
    }

    /// Parses a raw label against the stage's vocabulary.
    ///
    /// # Errors
    ///
    /// Returns `InvalidVerdict` for any label outside the vocabulary.
    pub fn parse_verdict(&self, raw: &str) -> Result<Verdict, ReviewflowError> {
        self.spec.vocabulary.parse(raw).ok_or_else(|| {
            ReviewflowError::invalid_verdict(self.id(), raw, self.spec.vocabulary.labels())
        })
    }
}

fn read_input(state: &ArtifactState, source: InputSource) -> Result<String, ReviewflowError> {
    match source {
        InputSource::Topic => Ok(state.topic().to_string()),
        InputSource::Artifact(stage) => state.artifact(stage).map(str::to_string),
    }
}
