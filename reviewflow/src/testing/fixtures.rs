//! Ready-made capability sets for pipeline tests.

use std::collections::HashMap;
use std::sync::Arc;

use super::{ScriptedGenerator, ScriptedReviewer};
use crate::core::StageId;
use crate::pipeline::{Capabilities, PipelineGraph};

/// One scripted generator and reviewer per stage, kept so tests can inspect
/// the calls after a run.
///
/// Every reviewer approves unless replaced with [`with_reviewer`](Self::with_reviewer).
#[derive(Debug, Clone)]
pub struct ScriptedCapabilities {
    generators: HashMap<StageId, Arc<ScriptedGenerator>>,
    reviewers: HashMap<StageId, Arc<ScriptedReviewer>>,
}

impl Default for ScriptedCapabilities {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedCapabilities {
    /// Creates an all-approving capability set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            generators: StageId::ALL
                .into_iter()
                .map(|stage| (stage, Arc::new(ScriptedGenerator::new())))
                .collect(),
            reviewers: StageId::ALL
                .into_iter()
                .map(|stage| (stage, Arc::new(ScriptedReviewer::approving(stage))))
                .collect(),
        }
    }

    /// Replaces the generator of `stage`.
    #[must_use]
    pub fn with_generator(mut self, stage: StageId, generator: ScriptedGenerator) -> Self {
        self.generators.insert(stage, Arc::new(generator));
        self
    }

    /// Replaces the reviewer of `stage`.
    #[must_use]
    pub fn with_reviewer(mut self, stage: StageId, reviewer: ScriptedReviewer) -> Self {
        self.reviewers.insert(stage, Arc::new(reviewer));
        self
    }

    /// Returns the generator of `stage`.
    ///
    /// # Panics
    ///
    /// Never for the six standard stages.
    #[must_use]
    pub fn generator(&self, stage: StageId) -> Arc<ScriptedGenerator> {
        Arc::clone(&self.generators[&stage])
    }

    /// Returns the reviewer of `stage`.
    ///
    /// # Panics
    ///
    /// Never for the six standard stages.
    #[must_use]
    pub fn reviewer(&self, stage: StageId) -> Arc<ScriptedReviewer> {
        Arc::clone(&self.reviewers[&stage])
    }

    /// Converts to the capability set a graph is built from.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        StageId::ALL
            .into_iter()
            .fold(Capabilities::new(), |caps, stage| {
                caps.with_stage(stage, self.generator(stage), self.reviewer(stage))
            })
    }

    /// Builds the software delivery graph over these capabilities.
    ///
    /// # Panics
    ///
    /// Never: every stage has capabilities.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn graph(&self) -> Arc<PipelineGraph> {
        Arc::new(
            PipelineGraph::software_delivery(&self.capabilities())
                .expect("scripted capabilities cover every stage"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_stage_is_bound() {
        let caps = ScriptedCapabilities::new();
        assert!(caps.capabilities().missing().is_empty());
        assert_eq!(caps.graph().stage_count(), 6);
    }

    #[test]
    fn test_replaced_reviewer_is_shared_with_graph() {
        let caps = ScriptedCapabilities::new()
            .with_reviewer(StageId::Qa, ScriptedReviewer::new(StageId::Qa).then_reject("flaky"));
        let replaced = caps.reviewer(StageId::Qa);
        assert!(Arc::ptr_eq(&replaced, &caps.reviewer(StageId::Qa)));
    }
}
