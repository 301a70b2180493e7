//! Lifecycle events emitted while a run executes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{StageId, Verdict};

/// A lifecycle event destined for an [`EventSink`](crate::events::EventSink).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// The event type (e.g., "stage.generated", "run.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event occurred (ISO 8601).
    pub timestamp: String,

    /// The event payload data.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl PipelineEvent {
    /// Creates a new event with no data.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: crate::utils::iso_timestamp(),
            data: HashMap::new(),
        }
    }

    /// Adds a data field to the event.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Returns the payload handed to event sinks.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        let mut data: serde_json::Map<String, serde_json::Value> =
            self.data.clone().into_iter().collect();
        data.insert("timestamp".to_string(), serde_json::json!(self.timestamp));
        serde_json::Value::Object(data)
    }

    /// Creates a "run.started" event.
    #[must_use]
    pub fn run_started(run_id: &str, pipeline: &str, step_budget: u32) -> Self {
        Self::new("run.started")
            .add_data("run_id", serde_json::json!(run_id))
            .add_data("pipeline", serde_json::json!(pipeline))
            .add_data("step_budget", serde_json::json!(step_budget))
    }

    /// Creates a "stage.generated" event. Only the artifact digest is carried.
    #[must_use]
    pub fn stage_generated(stage: StageId, iteration: u32, digest: &str, len: usize) -> Self {
        Self::new("stage.generated")
            .add_data("stage", serde_json::json!(stage))
            .add_data("iteration", serde_json::json!(iteration))
            .add_data("artifact_digest", serde_json::json!(digest))
            .add_data("artifact_len", serde_json::json!(len))
    }

    /// Creates a "stage.reviewed" event.
    #[must_use]
    pub fn stage_reviewed(stage: StageId, iteration: u32, verdict: Verdict) -> Self {
        Self::new("stage.reviewed")
            .add_data("stage", serde_json::json!(stage))
            .add_data("iteration", serde_json::json!(iteration))
            .add_data("verdict", serde_json::json!(verdict))
    }

    /// Creates a "stage.routed" event.
    #[must_use]
    pub fn stage_routed(stage: StageId, iteration: u32, next: &str) -> Self {
        Self::new("stage.routed")
            .add_data("stage", serde_json::json!(stage))
            .add_data("iteration", serde_json::json!(iteration))
            .add_data("next", serde_json::json!(next))
    }

    /// Creates a "run.completed" event.
    #[must_use]
    pub fn run_completed(run_id: &str, iterations: u32, duration_ms: f64) -> Self {
        Self::new("run.completed")
            .add_data("run_id", serde_json::json!(run_id))
            .add_data("iterations", serde_json::json!(iterations))
            .add_data("duration_ms", serde_json::json!(duration_ms))
    }

    /// Creates a "run.failed" event from an error report.
    #[must_use]
    pub fn run_failed(run_id: &str, error: HashMap<String, serde_json::Value>) -> Self {
        Self::new("run.failed")
            .add_data("run_id", serde_json::json!(run_id))
            .add_data("error", serde_json::json!(error))
    }

    /// Creates a "run.cancelled" event.
    #[must_use]
    pub fn run_cancelled(run_id: &str, stage: StageId, reason: &str) -> Self {
        Self::new("run.cancelled")
            .add_data("run_id", serde_json::json!(run_id))
            .add_data("stage", serde_json::json!(stage))
            .add_data("reason", serde_json::json!(reason))
    }
}
