//! The executor: drives a graph from its entry stage to the terminal state.
//!
//! One iteration runs a stage's generation, merges the artifact, runs its
//! review, merges the verdict and feedback, and routes. Iterations are
//! strictly sequential; every merge lands in the executor's own
//! [`ArtifactState`] before the next capability call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::{PipelineGraph, RunEvent, RunResult, Target};
use crate::cancellation::CancellationToken;
use crate::config::ExecutorConfig;
use crate::context::{ArtifactState, RoutedFeedback};
use crate::core::{PipelineEvent, StageId};
use crate::errors::{PipelineValidationError, ReviewflowError};
use crate::events::{EventSink, NoOpEventSink};
use crate::observability::artifact_digest;
use crate::stages::Visit;
use crate::utils::{elapsed_ms, generate_run_id};

/// Runs a [`PipelineGraph`] over one topic at a time.
///
/// The executor owns the state of the run it is driving. A new run starts
/// from a fresh state; after a failed run the partial state stays readable
/// through [`state`](Self::state) until the next run starts.
#[derive(Debug)]
pub struct Executor {
    graph: Arc<PipelineGraph>,
    config: ExecutorConfig,
    sink: Arc<dyn EventSink>,
    cancel: Arc<CancellationToken>,
    state: ArtifactState,
}

impl Executor {
    /// Creates an executor with the default configuration and no event sink.
    #[must_use]
    pub fn new(graph: Arc<PipelineGraph>) -> Self {
        Self {
            graph,
            config: ExecutorConfig::default(),
            sink: Arc::new(NoOpEventSink),
            cancel: Arc::new(CancellationToken::new()),
            state: ArtifactState::new(""),
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Shares a cancellation token with the caller.
    #[must_use]
    pub fn with_cancellation_token(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancel = token;
        self
    }

    /// Returns the cancellation token checked between iterations.
    #[must_use]
    pub fn cancellation_token(&self) -> Arc<CancellationToken> {
        Arc::clone(&self.cancel)
    }

    /// Returns the graph.
    #[must_use]
    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Returns the state of the current or most recent run.
    #[must_use]
    pub fn state(&self) -> &ArtifactState {
        &self.state
    }

    /// Runs the pipeline for `topic`.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidBudget` for a zero budget, `BudgetExceeded` if the
    /// terminal state is not reached within `step_budget` iterations,
    /// `Cancelled` if the token fires, and with the first capability or
    /// verdict error otherwise.
    pub async fn run(
        &mut self,
        topic: impl Into<String>,
        step_budget: u32,
    ) -> Result<RunResult, ReviewflowError> {
        self.run_with_progress(topic, step_budget, |_| {}).await
    }

    /// Runs the pipeline with the configured step budget.
    ///
    /// # Errors
    ///
    /// Fails with `Config` if the configuration is invalid, otherwise as
    /// [`run`](Self::run).
    pub async fn run_configured(
        &mut self,
        topic: impl Into<String>,
    ) -> Result<RunResult, ReviewflowError> {
        self.config.validate()?;
        let budget = self.config.step_budget;
        self.run(topic, budget).await
    }

    /// Runs the pipeline, sending each iteration's event over `tx`.
    ///
    /// A dropped receiver does not stop the run.
    ///
    /// # Errors
    ///
    /// As [`run`](Self::run).
    pub async fn run_streaming(
        &mut self,
        topic: impl Into<String>,
        step_budget: u32,
        tx: mpsc::UnboundedSender<RunEvent>,
    ) -> Result<RunResult, ReviewflowError> {
        self.run_with_progress(topic, step_budget, move |event| {
            if tx.send(event.clone()).is_err() {
                debug!(iteration = event.iteration, "Progress receiver dropped");
            }
        })
        .await
    }

    /// Runs the pipeline, calling `observer` after every iteration.
    ///
    /// # Errors
    ///
    /// As [`run`](Self::run).
    pub async fn run_with_progress<F>(
        &mut self,
        topic: impl Into<String>,
        step_budget: u32,
        observer: F,
    ) -> Result<RunResult, ReviewflowError>
    where
        F: FnMut(&RunEvent) + Send,
    {
        if step_budget == 0 {
            return Err(ReviewflowError::InvalidBudget {
                budget: step_budget,
            });
        }

        let run_id = generate_run_id();
        let span = info_span!(
            "run",
            run_id = %run_id,
            pipeline = %self.config.pipeline_name,
        );
        self.drive(run_id, topic.into(), step_budget, observer)
            .instrument(span)
            .await
    }

    async fn drive<F>(
        &mut self,
        run_id: Uuid,
        topic: String,
        step_budget: u32,
        mut observer: F,
    ) -> Result<RunResult, ReviewflowError>
    where
        F: FnMut(&RunEvent) + Send,
    {
        let started = Instant::now();
        let run_key = run_id.to_string();
        self.state = ArtifactState::new(topic);

        info!(step_budget, entry = %self.graph.entry(), "Run started");
        self.emit(PipelineEvent::run_started(
            &run_key,
            &self.config.pipeline_name,
            step_budget,
        ))
        .await;

        let mut current = self.graph.entry();
        let mut events: Vec<RunEvent> = Vec::new();
        let mut visits: HashMap<StageId, u32> = HashMap::new();
        let mut routed: Option<RoutedFeedback> = None;
        let mut iterations = 0u32;

        loop {
            if let Some(reason) = self.cancel.check() {
                warn!(stage = %current, iterations, reason = %reason, "Run cancelled");
                self.emit(PipelineEvent::run_cancelled(&run_key, current, &reason))
                    .await;
                return Err(ReviewflowError::Cancelled {
                    stage: current,
                    iterations,
                    reason,
                });
            }

            let iteration = iterations + 1;
            let event = match self
                .iterate(run_id, current, iteration, &mut visits, &mut routed)
                .await
            {
                Ok(event) => event,
                Err(err) => return Err(self.fail(&run_key, err).await),
            };
            iterations = iteration;

            observer(&event);
            let next = event.next;
            events.push(event);

            match next {
                Target::Terminal => break,
                Target::Stage(stage) => {
                    if iterations >= step_budget {
                        warn!(
                            last_stage = %current,
                            iterations,
                            step_budget,
                            "Step budget exhausted"
                        );
                        let err = ReviewflowError::BudgetExceeded {
                            last_stage: current,
                            iterations,
                            budget: step_budget,
                        };
                        return Err(self.fail(&run_key, err).await);
                    }
                    current = stage;
                }
            }
        }

        let duration_ms = elapsed_ms(started);
        info!(iterations, duration_ms, "Run completed");
        self.emit(PipelineEvent::run_completed(&run_key, iterations, duration_ms))
            .await;

        Ok(RunResult {
            run_id,
            pipeline: self.graph.name().to_string(),
            events,
            final_state: self.state.clone(),
            duration_ms,
        })
    }

    /// Runs one generate, merge, review, merge, route cycle of `stage_id`.
    async fn iterate(
        &mut self,
        run_id: Uuid,
        stage_id: StageId,
        iteration: u32,
        visits: &mut HashMap<StageId, u32>,
        routed: &mut Option<RoutedFeedback>,
    ) -> Result<RunEvent, ReviewflowError> {
        let graph = Arc::clone(&self.graph);
        let stage = graph.stage(stage_id).ok_or_else(|| {
            PipelineValidationError::contract(
                "CONTRACT-004-MISSING_TARGET",
                format!("Stage '{stage_id}' is not part of pipeline '{}'", graph.name()),
                vec![stage_id],
            )
        })?;

        let visit_count = visits.entry(stage_id).or_insert(0);
        *visit_count += 1;
        let visit = Visit {
            run_id,
            iteration,
            visit: *visit_count,
        };

        let generated = stage
            .generate(&self.state, visit, routed.take())
            .await
            .map_err(|e| e.at_iteration(iteration))?;
        self.state.merge(&generated);

        let artifact = self.state.artifact(stage_id)?;
        let digest = artifact_digest(artifact);
        let artifact_len = artifact.len();
        debug!(
            stage = %stage_id,
            iteration,
            artifact_digest = %digest,
            artifact_len,
            "Artifact generated"
        );
        if self.config.log_artifacts {
            debug!(stage = %stage_id, iteration, artifact = %artifact, "Artifact text");
        }
        self.emit(PipelineEvent::stage_generated(
            stage_id,
            iteration,
            &digest,
            artifact_len,
        ))
        .await;

        let (verdict, reviewed) = stage
            .review(&self.state, visit)
            .await
            .map_err(|e| e.at_iteration(iteration))?;
        self.state.merge(&reviewed);
        self.emit(PipelineEvent::stage_reviewed(stage_id, iteration, verdict))
            .await;

        let next = graph
            .next(stage_id, verdict)
            .map_err(|e| e.at_iteration(iteration))?;

        if verdict.is_approval() {
            info!(stage = %stage_id, iteration, verdict = %verdict, next = %next, "Stage approved");
        } else {
            let feedback = self.state.feedback(stage_id).unwrap_or_default().to_string();
            warn!(
                stage = %stage_id,
                iteration,
                verdict = %verdict,
                next = %next,
                feedback_len = feedback.len(),
                "Artifact rejected"
            );
            if let Target::Stage(target) = next {
                if target != stage_id {
                    *routed = Some(RoutedFeedback {
                        from: stage_id,
                        feedback,
                    });
                }
            }
        }
        self.emit(PipelineEvent::stage_routed(
            stage_id,
            iteration,
            &next.to_string(),
        ))
        .await;

        Ok(RunEvent {
            iteration,
            stage: stage_id,
            update: generated.extend(reviewed),
            verdict,
            next,
        })
    }

    async fn fail(&self, run_key: &str, err: ReviewflowError) -> ReviewflowError {
        warn!(
            error = %err,
            kind = err.kind(),
            stage = ?err.stage(),
            iterations = ?err.iterations(),
            "Run failed"
        );
        self.emit(PipelineEvent::run_failed(run_key, err.to_dict()))
            .await;
        err
    }

    async fn emit(&self, event: PipelineEvent) {
        if self.config.emit_events {
            self.sink.emit(&event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Verdict;
    use crate::events::CollectingEventSink;
    use crate::testing::{ScriptedCapabilities, ScriptedReviewer};
    use pretty_assertions::assert_eq;

    fn executor(caps: &ScriptedCapabilities) -> Executor {
        let graph = PipelineGraph::software_delivery(&caps.capabilities()).unwrap();
        Executor::new(Arc::new(graph))
    }

    #[tokio::test]
    async fn test_zero_budget_rejected_before_any_stage() {
        let caps = ScriptedCapabilities::new();
        let err = executor(&caps).run("todo app", 0).await.unwrap_err();

        assert!(matches!(err, ReviewflowError::InvalidBudget { budget: 0 }));
        assert_eq!(caps.generator(StageId::Content).call_count(), 0);
    }

    #[tokio::test]
    async fn test_budget_of_one_stops_after_first_stage() {
        let caps = ScriptedCapabilities::new();
        let mut executor = executor(&caps);
        let err = executor.run("todo app", 1).await.unwrap_err();

        assert!(matches!(
            err,
            ReviewflowError::BudgetExceeded { last_stage: StageId::Content, iterations: 1, budget: 1 }
        ));
        assert!(executor.state().has_artifact(StageId::Content));
        assert!(!executor.state().has_artifact(StageId::Design));
    }

    #[tokio::test]
    async fn test_run_configured_uses_config_budget() {
        let caps = ScriptedCapabilities::new();
        let mut executor = executor(&caps).with_config(ExecutorConfig::new().with_step_budget(3));
        let err = executor.run_configured("todo app").await.unwrap_err();
        assert!(matches!(err, ReviewflowError::BudgetExceeded { iterations: 3, .. }));
    }

    #[tokio::test]
    async fn test_run_configured_rejects_invalid_config() {
        let caps = ScriptedCapabilities::new();
        let mut executor = executor(&caps).with_config(ExecutorConfig::new().with_step_budget(0));
        let err = executor.run_configured("todo app").await.unwrap_err();
        assert!(matches!(err, ReviewflowError::Config(_)));
    }

    #[tokio::test]
    async fn test_events_disabled() {
        let caps = ScriptedCapabilities::new();
        let sink = Arc::new(CollectingEventSink::new());
        let mut executor = executor(&caps)
            .with_config(ExecutorConfig::new().with_emit_events(false))
            .with_event_sink(sink.clone());

        executor.run("todo app", 6).await.unwrap();
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_verdict_aborts_with_iteration() {
        let caps = ScriptedCapabilities::new().with_reviewer(
            StageId::Design,
            ScriptedReviewer::new(StageId::Design).then_raw("Passed", ""),
        );
        let mut executor = executor(&caps);
        let err = executor.run("todo app", 10).await.unwrap_err();

        assert!(matches!(
            err,
            ReviewflowError::InvalidVerdict { stage: StageId::Design, iteration: 2, .. }
        ));
        assert_eq!(caps.generator(StageId::Code).call_count(), 0);
    }

    #[tokio::test]
    async fn test_each_run_starts_from_fresh_state() {
        let caps = ScriptedCapabilities::new();
        let mut executor = executor(&caps);

        let first = executor.run("first topic", 6).await.unwrap();
        let second = executor.run("second topic", 6).await.unwrap();

        assert_ne!(first.run_id, second.run_id);
        assert_eq!(second.final_state.topic(), "second topic");
        assert_eq!(second.iterations(), 6);
        assert_eq!(second.final_verdict(), Some(Verdict::Passed));
    }
}
