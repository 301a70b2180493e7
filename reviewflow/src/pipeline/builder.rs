//! Pipeline builder with validation.

use super::{PipelineGraph, StageSpec, Target};
use crate::core::StageId;
use crate::errors::PipelineValidationError;
use std::collections::{HashMap, HashSet};

/// Builder for creating validated pipeline graphs.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    /// The pipeline name.
    name: String,
    /// The stage specifications.
    stages: HashMap<StageId, StageSpec>,
    /// Insertion order for stages.
    stage_order: Vec<StageId>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: HashMap::new(),
            stage_order: Vec::new(),
        }
    }

    /// Adds a stage to the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec is invalid or the stage was already added.
    pub fn stage(mut self, spec: StageSpec) -> Result<Self, PipelineValidationError> {
        self.add_stage_spec(spec)?;
        Ok(self)
    }

    /// Adds a stage with a specification.
    ///
    /// Edges may name stages that are added later; they are checked by
    /// [`build`](Self::build).
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn add_stage_spec(&mut self, spec: StageSpec) -> Result<(), PipelineValidationError> {
        spec.validate()?;

        if self.stages.contains_key(&spec.stage) {
            return Err(PipelineValidationError::contract(
                "CONTRACT-004-DUPLICATE",
                format!("Stage '{}' was added twice", spec.stage),
                vec![spec.stage],
            ));
        }

        self.stage_order.push(spec.stage);
        self.stages.insert(spec.stage, spec);
        Ok(())
    }

    /// Builds the pipeline graph.
    ///
    /// The entry stage is the earliest stage in pipeline order.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder has no stages, an edge or input names
    /// a stage that was never added, an input reads a stage that is not
    /// approved before the reader on the path from the entry, a stage cannot
    /// be reached from the entry, or the path never reaches the terminal state.
    pub fn build(self) -> Result<PipelineGraph, PipelineValidationError> {
        let Some(entry) = self.stage_order.iter().min().copied() else {
            return Err(PipelineValidationError::contract(
                "CONTRACT-004-EMPTY",
                "Cannot build an empty pipeline",
                Vec::new(),
            ));
        };

        self.check_targets()?;
        self.check_path(entry)?;

        let specs = self
            .stage_order
            .iter()
            .filter_map(|id| self.stages.get(id).cloned())
            .collect();
        Ok(PipelineGraph::new(self.name, specs, entry))
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Walks the approval path from `entry`.
    ///
    /// Rejections only return to stages on the path already walked, so the
    /// path is every stage a run can visit.
    fn check_path(&self, entry: StageId) -> Result<(), PipelineValidationError> {
        let mut visited: HashSet<StageId> = HashSet::new();
        let mut current = Target::Stage(entry);

        while let Target::Stage(id) = current {
            let Some(spec) = self.stages.get(&id) else {
                break;
            };
            for source in [spec.generation_input.stage(), spec.review_reference.stage()]
                .into_iter()
                .flatten()
            {
                if !visited.contains(&source) {
                    return Err(PipelineValidationError::contract(
                        "CONTRACT-004-INPUT_ORDER",
                        format!(
                            "Stage '{}' reads the artifact of '{}', which is not approved before it",
                            id, source
                        ),
                        vec![id, source],
                    ));
                }
            }
            if !visited.insert(id) {
                break;
            }
            current = spec.forward;
        }

        if !current.is_terminal() {
            return Err(PipelineValidationError::contract(
                "CONTRACT-004-NO_TERMINAL",
                format!("Pipeline '{}' never reaches the terminal state", self.name),
                self.stage_order.clone(),
            ));
        }

        if let Some(&orphan) = self.stage_order.iter().find(|id| !visited.contains(id)) {
            return Err(PipelineValidationError::contract(
                "CONTRACT-004-UNREACHABLE",
                format!(
                    "Stage '{}' is never reached from entry stage '{}'",
                    orphan, entry
                ),
                vec![orphan, entry],
            ));
        }
        Ok(())
    }

    fn check_targets(&self) -> Result<(), PipelineValidationError> {
        for id in &self.stage_order {
            let Some(spec) = self.stages.get(id) else {
                continue;
            };
            let referenced = [
                spec.forward.stage(),
                Some(spec.backward),
                spec.generation_input.stage(),
                spec.review_reference.stage(),
            ];
            for target in referenced.into_iter().flatten() {
                if !self.stages.contains_key(&target) {
                    return Err(PipelineValidationError::contract(
                        "CONTRACT-004-MISSING_TARGET",
                        format!("Stage '{}' refers to unknown stage '{}'", spec.stage, target),
                        vec![spec.stage, target],
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::InputSource;
    use crate::testing::{ScriptedGenerator, ScriptedReviewer};
    use std::sync::Arc;

    fn spec(stage: StageId) -> StageSpec {
        StageSpec::new(
            stage,
            Arc::new(ScriptedGenerator::new()),
            Arc::new(ScriptedReviewer::approving(stage)),
        )
    }

    #[test]
    fn test_builder_creation() {
        let builder = PipelineBuilder::new("test");
        assert_eq!(builder.name(), "test");
        assert_eq!(builder.stage_count(), 0);
    }

    #[test]
    fn test_builder_add_stage() {
        let builder = PipelineBuilder::new("test")
            .stage(spec(StageId::Content))
            .unwrap();

        assert_eq!(builder.stage_count(), 1);
    }

    #[test]
    fn test_builder_duplicate_stage() {
        let err = PipelineBuilder::new("test")
            .stage(spec(StageId::Content))
            .unwrap()
            .stage(spec(StageId::Content))
            .unwrap_err();

        assert_eq!(err.code(), Some("CONTRACT-004-DUPLICATE"));
    }

    #[test]
    fn test_builder_empty_build() {
        let err = PipelineBuilder::new("test").build().unwrap_err();
        assert!(err.error_info.is_some());
        assert_eq!(err.error_info.unwrap().code, "CONTRACT-004-EMPTY");
    }

    #[test]
    fn test_builder_missing_forward_target() {
        let err = PipelineBuilder::new("test")
            .stage(spec(StageId::Content))
            .unwrap()
            .build()
            .unwrap_err();

        assert_eq!(err.code(), Some("CONTRACT-004-MISSING_TARGET"));
        assert_eq!(err.stages, vec![StageId::Content, StageId::Design]);
    }

    #[test]
    fn test_builder_missing_input_stage() {
        let err = PipelineBuilder::new("test")
            .stage(spec(StageId::Code).with_forward(Target::Terminal))
            .unwrap()
            .build()
            .unwrap_err();

        assert_eq!(err.code(), Some("CONTRACT-004-MISSING_TARGET"));
        assert!(err.stages.contains(&StageId::Design));
    }

    #[test]
    fn test_builder_rejects_invalid_spec() {
        let err = PipelineBuilder::new("test")
            .stage(spec(StageId::Qa).with_forward(Target::Stage(StageId::Qa)))
            .unwrap_err();

        assert_eq!(err.code(), Some("CONTRACT-004-FORWARD_EDGE"));
    }

    #[test]
    fn test_builder_input_skipped_by_path() {
        // Content approves straight to Code, so Design never runs first.
        let err = PipelineBuilder::new("test")
            .stage(spec(StageId::Content).with_forward(Target::Stage(StageId::Code)))
            .unwrap()
            .stage(spec(StageId::Design))
            .unwrap()
            .stage(spec(StageId::Code).with_forward(Target::Terminal))
            .unwrap()
            .build()
            .unwrap_err();

        assert_eq!(err.code(), Some("CONTRACT-004-INPUT_ORDER"));
        assert_eq!(err.stages, vec![StageId::Code, StageId::Design]);
    }

    #[test]
    fn test_builder_unreachable_stage() {
        let err = PipelineBuilder::new("test")
            .stage(spec(StageId::Content).with_forward(Target::Terminal))
            .unwrap()
            .stage(
                spec(StageId::Design)
                    .with_forward(Target::Terminal)
                    .with_review_reference(InputSource::Topic),
            )
            .unwrap()
            .build()
            .unwrap_err();

        assert_eq!(err.code(), Some("CONTRACT-004-UNREACHABLE"));
        assert_eq!(err.stages, vec![StageId::Design, StageId::Content]);
    }

    #[test]
    fn test_builder_short_pipeline() {
        let graph = PipelineBuilder::new("stories-only")
            .stage(
                spec(StageId::Design)
                    .with_forward(Target::Terminal)
                    .with_review_reference(InputSource::Topic),
            )
            .unwrap()
            .stage(spec(StageId::Content))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(graph.name(), "stories-only");
        assert_eq!(graph.entry(), StageId::Content);
        assert_eq!(graph.order(), vec![StageId::Content, StageId::Design]);
    }
}
