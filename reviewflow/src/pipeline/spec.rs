//! Stage specifications: the topology expressed as data.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::core::{StageId, VerdictVocabulary};
use crate::errors::PipelineValidationError;
use crate::stages::{Generator, Reviewer};

/// Where a routing decision sends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// The generation step of a stage.
    Stage(StageId),
    /// The run is finished.
    Terminal,
}

impl Target {
    /// Returns the stage, unless this is the terminal state.
    #[must_use]
    pub const fn stage(self) -> Option<StageId> {
        match self {
            Self::Stage(stage) => Some(stage),
            Self::Terminal => None,
        }
    }

    /// Returns true for the terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Terminal)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stage(stage) => write!(f, "{stage}"),
            Self::Terminal => write!(f, "Terminal"),
        }
    }
}

/// A piece of state a stage reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputSource {
    /// The run topic.
    Topic,
    /// The latest artifact of a stage.
    Artifact(StageId),
}

impl InputSource {
    /// The stage whose artifact is read, if any.
    #[must_use]
    pub const fn stage(self) -> Option<StageId> {
        match self {
            Self::Topic => None,
            Self::Artifact(stage) => Some(stage),
        }
    }
}

/// Static description of one stage: its capabilities, vocabulary and edges.
#[derive(Debug, Clone)]
pub struct StageSpec {
    /// The stage.
    pub stage: StageId,
    /// Produces the stage's artifact.
    pub generator: Arc<dyn Generator>,
    /// Judges the stage's artifact.
    pub reviewer: Arc<dyn Reviewer>,
    /// The labels the reviewer may emit.
    pub vocabulary: VerdictVocabulary,
    /// Where an approval leads.
    pub forward: Target,
    /// Whose generation step a rejection returns to.
    pub backward: StageId,
    /// What the generator works from.
    pub generation_input: InputSource,
    /// What the reviewer judges against.
    pub review_reference: InputSource,
}

impl StageSpec {
    /// Creates a spec with the default wiring for `stage`: its own vocabulary,
    /// forward to the next stage in pipeline order (terminal after the last),
    /// a self-loop on rejection, and the previous stage's artifact (or the
    /// topic, for the first stage) as input and review reference.
    #[must_use]
    pub fn new(stage: StageId, generator: Arc<dyn Generator>, reviewer: Arc<dyn Reviewer>) -> Self {
        let position = StageId::ALL.iter().position(|s| *s == stage).unwrap_or(0);
        let forward = StageId::ALL
            .get(position + 1)
            .map_or(Target::Terminal, |next| Target::Stage(*next));
        let input = position
            .checked_sub(1)
            .map_or(InputSource::Topic, |prev| InputSource::Artifact(StageId::ALL[prev]));

        Self {
            stage,
            generator,
            reviewer,
            vocabulary: stage.vocabulary(),
            forward,
            backward: stage,
            generation_input: input,
            review_reference: input,
        }
    }

    /// Sets the forward target.
    #[must_use]
    pub fn with_forward(mut self, target: Target) -> Self {
        self.forward = target;
        self
    }

    /// Sets the backward target.
    #[must_use]
    pub fn with_backward(mut self, stage: StageId) -> Self {
        self.backward = stage;
        self
    }

    /// Sets the verdict vocabulary.
    #[must_use]
    pub fn with_vocabulary(mut self, vocabulary: VerdictVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// Sets the generation input.
    #[must_use]
    pub fn with_generation_input(mut self, input: InputSource) -> Self {
        self.generation_input = input;
        self
    }

    /// Sets the review reference.
    #[must_use]
    pub fn with_review_reference(mut self, reference: InputSource) -> Self {
        self.review_reference = reference;
        self
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.stage.as_str()
    }

    /// Returns true if a rejection leaves this stage for an earlier one.
    #[must_use]
    pub fn has_cross_stage_back_edge(&self) -> bool {
        self.backward != self.stage
    }

    /// Validates the edges and inputs of this spec in isolation.
    ///
    /// # Errors
    ///
    /// Returns an error if the backward target is a later stage, the forward
    /// target is not a later stage, or an input reads a stage that does not
    /// run before this one.
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        if self.backward > self.stage {
            return Err(PipelineValidationError::contract(
                "CONTRACT-004-BACK_EDGE",
                format!(
                    "Stage '{}' sends rejections forward to '{}'",
                    self.stage, self.backward
                ),
                vec![self.stage, self.backward],
            ));
        }
        if let Target::Stage(next) = self.forward {
            if next <= self.stage {
                return Err(PipelineValidationError::contract(
                    "CONTRACT-004-FORWARD_EDGE",
                    format!("Stage '{}' sends approvals back to '{}'", self.stage, next),
                    vec![self.stage, next],
                ));
            }
        }
        for input in [self.generation_input, self.review_reference] {
            if let Some(source) = input.stage() {
                if source >= self.stage {
                    return Err(PipelineValidationError::contract(
                        "CONTRACT-004-INPUT_ORDER",
                        format!(
                            "Stage '{}' reads the artifact of '{}', which does not run before it",
                            self.stage, source
                        ),
                        vec![self.stage, source],
                    ));
                }
            }
        }
        Ok(())
    }
}
