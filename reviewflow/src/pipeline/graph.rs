//! The pipeline graph and the standard software delivery topology.

use std::collections::HashMap;
use std::sync::Arc;

use super::{router, InputSource, PipelineBuilder, StageSpec, Target};
use crate::core::{StageId, Verdict};
use crate::errors::{PipelineValidationError, ReviewflowError};
use crate::stages::{Generator, Reviewer, Stage};

/// The generator and reviewer bound to each stage.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    entries: HashMap<StageId, (Arc<dyn Generator>, Arc<dyn Reviewer>)>,
}

impl Capabilities {
    /// Creates an empty capability set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a generator and a reviewer to `stage`.
    #[must_use]
    pub fn with_stage(
        mut self,
        stage: StageId,
        generator: Arc<dyn Generator>,
        reviewer: Arc<dyn Reviewer>,
    ) -> Self {
        self.entries.insert(stage, (generator, reviewer));
        self
    }

    /// Returns the capabilities bound to `stage`.
    #[must_use]
    pub fn get(&self, stage: StageId) -> Option<(Arc<dyn Generator>, Arc<dyn Reviewer>)> {
        self.entries.get(&stage).cloned()
    }

    /// Returns the stages of the standard topology with nothing bound.
    #[must_use]
    pub fn missing(&self) -> Vec<StageId> {
        StageId::ALL
            .into_iter()
            .filter(|stage| !self.entries.contains_key(stage))
            .collect()
    }
}

/// A validated set of stages with their edges.
///
/// Stages are kept in pipeline order; the entry is the first of them.
#[derive(Debug)]
pub struct PipelineGraph {
    name: String,
    stages: Vec<Stage>,
    index: HashMap<StageId, usize>,
    entry: StageId,
}

impl PipelineGraph {
    /// Creates a graph. Callers go through [`PipelineBuilder`], which validates.
    pub(crate) fn new(name: String, mut specs: Vec<StageSpec>, entry: StageId) -> Self {
        specs.sort_by_key(|spec| spec.stage);
        let stages: Vec<Stage> = specs.into_iter().map(Stage::new).collect();
        let index = stages
            .iter()
            .enumerate()
            .map(|(i, stage)| (stage.id(), i))
            .collect();

        Self {
            name,
            stages,
            index,
            entry,
        }
    }

    /// Builds the six-stage software delivery topology.
    ///
    /// Content → Design → Code → Security → Test → QA → Terminal. Every
    /// rejection loops back to the rejected stage's generator except
    /// Security's, which returns to Code.
    ///
    /// # Errors
    ///
    /// Returns `CONTRACT-004-MISSING_CAPABILITY` if a stage has no capabilities.
    pub fn software_delivery(capabilities: &Capabilities) -> Result<Self, PipelineValidationError> {
        let mut builder = PipelineBuilder::new("software-delivery");
        for spec in software_delivery_specs(capabilities)? {
            builder.add_stage_spec(spec)?;
        }
        builder.build()
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the entry stage.
    #[must_use]
    pub fn entry(&self) -> StageId {
        self.entry
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns the stage ids in pipeline order.
    #[must_use]
    pub fn order(&self) -> Vec<StageId> {
        self.stages.iter().map(Stage::id).collect()
    }

    /// Returns a stage.
    #[must_use]
    pub fn stage(&self, id: StageId) -> Option<&Stage> {
        self.index.get(&id).map(|&i| &self.stages[i])
    }

    /// Returns a stage's spec.
    #[must_use]
    pub fn spec(&self, id: StageId) -> Option<&StageSpec> {
        self.stage(id).map(Stage::spec)
    }

    /// Resolves where `verdict` on `from` sends the run.
    ///
    /// # Errors
    ///
    /// Returns `InvalidVerdict` for a label outside the stage's vocabulary,
    /// and a validation error if `from` is not part of the graph.
    pub fn next(&self, from: StageId, verdict: Verdict) -> Result<Target, ReviewflowError> {
        let spec = self.spec(from).ok_or_else(|| {
            PipelineValidationError::contract(
                "CONTRACT-004-MISSING_TARGET",
                format!("Stage '{from}' is not part of pipeline '{}'", self.name),
                vec![from],
            )
        })?;
        router::resolve(spec, verdict)
    }
}

/// Returns the stage specs of the software delivery topology.
///
/// # Errors
///
/// Returns `CONTRACT-004-MISSING_CAPABILITY` if a stage has no capabilities.
pub fn software_delivery_specs(
    capabilities: &Capabilities,
) -> Result<Vec<StageSpec>, PipelineValidationError> {
    let missing = capabilities.missing();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|s| s.as_str()).collect();
        return Err(PipelineValidationError::contract(
            "CONTRACT-004-MISSING_CAPABILITY",
            format!("No capabilities bound for stages: {}", names.join(", ")),
            missing,
        ));
    }

    let specs = StageId::ALL
        .into_iter()
        .filter_map(|stage| {
            capabilities
                .get(stage)
                .map(|(generator, reviewer)| StageSpec::new(stage, generator, reviewer))
        })
        .map(|spec| match spec.stage {
            StageId::Design => spec.with_review_reference(InputSource::Topic),
            StageId::Security => spec.with_backward(StageId::Code),
            StageId::Test => spec
                .with_generation_input(InputSource::Artifact(StageId::Code))
                .with_review_reference(InputSource::Artifact(StageId::Code)),
            _ => spec,
        })
        .collect();

    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCapabilities;

    fn graph() -> PipelineGraph {
        PipelineGraph::software_delivery(&ScriptedCapabilities::new().capabilities()).unwrap()
    }

    #[test]
    fn test_standard_topology() {
        let graph = graph();
        assert_eq!(graph.name(), "software-delivery");
        assert_eq!(graph.entry(), StageId::Content);
        assert_eq!(graph.order(), StageId::ALL.to_vec());
    }

    #[test]
    fn test_approvals_walk_forward_to_terminal() {
        let graph = graph();
        let mut current = graph.entry();
        let mut path = vec![current];
        loop {
            let approve = graph.spec(current).unwrap().vocabulary.approve;
            match graph.next(current, approve).unwrap() {
                Target::Stage(next) => {
                    path.push(next);
                    current = next;
                }
                Target::Terminal => break,
            }
        }
        assert_eq!(path, StageId::ALL.to_vec());
    }

    #[test]
    fn test_rejections_self_loop_except_security() {
        let graph = graph();
        for stage in StageId::ALL {
            let reject = graph.spec(stage).unwrap().vocabulary.reject;
            let target = graph.next(stage, reject).unwrap();
            if stage == StageId::Security {
                assert_eq!(target, Target::Stage(StageId::Code));
            } else {
                assert_eq!(target, Target::Stage(stage), "{stage} should self-loop");
            }
        }
    }

    #[test]
    fn test_security_rejection_never_targets_security() {
        let graph = graph();
        let target = graph.next(StageId::Security, Verdict::FeedBack).unwrap();
        assert_ne!(target, Target::Stage(StageId::Security));
    }

    #[test]
    fn test_only_qa_pass_terminates() {
        let graph = graph();
        for stage in StageId::ALL {
            let spec = graph.spec(stage).unwrap();
            let forward = graph.next(stage, spec.vocabulary.approve).unwrap();
            assert_eq!(forward.is_terminal(), stage == StageId::Qa);
            assert!(!graph.next(stage, spec.vocabulary.reject).unwrap().is_terminal());
        }
    }

    #[test]
    fn test_standard_inputs() {
        let graph = graph();
        let design = graph.spec(StageId::Design).unwrap();
        assert_eq!(design.generation_input, InputSource::Artifact(StageId::Content));
        assert_eq!(design.review_reference, InputSource::Topic);

        let test = graph.spec(StageId::Test).unwrap();
        assert_eq!(test.generation_input, InputSource::Artifact(StageId::Code));
    }

    #[test]
    fn test_missing_capabilities() {
        let err = PipelineGraph::software_delivery(&Capabilities::new()).unwrap_err();
        assert_eq!(err.code(), Some("CONTRACT-004-MISSING_CAPABILITY"));
        assert_eq!(err.stages.len(), 6);
    }
}
