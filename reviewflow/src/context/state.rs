//! The artifact store for a single run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{StateKey, StateUpdate, StateValue};
use crate::core::{Approval, StageId, Verdict};
use crate::errors::ReviewflowError;

/// Key name of the run topic.
pub const TOPIC_KEY: &str = "topic";

/// What a run has recorded for one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Latest generated artifact.
    pub artifact: Option<String>,
    /// Latest reviewer feedback.
    pub feedback: Option<String>,
    /// Latest reviewer verdict.
    pub verdict: Option<Verdict>,
}

/// Typed record of everything a run has produced so far.
///
/// Stages write into it only through [`merge`](Self::merge), a shallow
/// last-writer-wins union that never deletes. The store is not synchronized;
/// whoever owns it serializes writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactState {
    topic: String,
    records: BTreeMap<StageId, StageRecord>,
}

impl ArtifactState {
    /// Creates a fresh state for a run on `topic`.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            records: BTreeMap::new(),
        }
    }

    /// Returns the run topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Reads a value.
    ///
    /// # Errors
    ///
    /// Returns `MissingKey` if the run has not written `key` yet.
    pub fn get(&self, key: StateKey) -> Result<StateValue, ReviewflowError> {
        let record = self.records.get(&key.stage());
        let value = match key {
            StateKey::Artifact(_) => record
                .and_then(|r| r.artifact.clone())
                .map(StateValue::Text),
            StateKey::Feedback(_) => record
                .and_then(|r| r.feedback.clone())
                .map(StateValue::Text),
            StateKey::Verdict(_) => record.and_then(|r| r.verdict).map(StateValue::Verdict),
        };
        value.ok_or_else(|| ReviewflowError::missing_key(key.name()))
    }

    /// Reads a value by its external name (`topic` included).
    ///
    /// # Errors
    ///
    /// Returns `MissingKey` for unknown names and for names not written yet.
    pub fn get_by_name(&self, name: &str) -> Result<StateValue, ReviewflowError> {
        if name == TOPIC_KEY {
            return Ok(StateValue::Text(self.topic.clone()));
        }
        let key = StateKey::from_name(name).ok_or_else(|| ReviewflowError::missing_key(name))?;
        self.get(key)
    }

    /// Returns the latest artifact of `stage`.
    ///
    /// # Errors
    ///
    /// Returns `MissingKey` if the stage has not generated anything yet.
    pub fn artifact(&self, stage: StageId) -> Result<&str, ReviewflowError> {
        self.records
            .get(&stage)
            .and_then(|r| r.artifact.as_deref())
            .ok_or_else(|| ReviewflowError::missing_key(stage.artifact_key()))
    }

    /// Returns true once `stage` has generated an artifact.
    #[must_use]
    pub fn has_artifact(&self, stage: StageId) -> bool {
        self.records.get(&stage).is_some_and(|r| r.artifact.is_some())
    }

    /// Returns the latest feedback of `stage`, if it was ever reviewed.
    #[must_use]
    pub fn feedback(&self, stage: StageId) -> Option<&str> {
        self.records.get(&stage).and_then(|r| r.feedback.as_deref())
    }

    /// Returns the latest verdict of `stage`, if it was ever reviewed.
    #[must_use]
    pub fn verdict(&self, stage: StageId) -> Option<Verdict> {
        self.records.get(&stage).and_then(|r| r.verdict)
    }

    /// Returns the approval status of `stage`.
    #[must_use]
    pub fn approval(&self, stage: StageId) -> Approval {
        Approval::from_verdict(self.verdict(stage))
    }

    /// Returns everything recorded for `stage`.
    #[must_use]
    pub fn record(&self, stage: StageId) -> Option<&StageRecord> {
        self.records.get(&stage)
    }

    /// Applies a partial update. Later entries win; untouched keys are kept.
    pub fn merge(&mut self, update: &StateUpdate) {
        for (key, value) in update.iter() {
            let record = self.records.entry(key.stage()).or_default();
            match (key, value) {
                (StateKey::Artifact(_), StateValue::Text(text)) => {
                    record.artifact = Some(text.clone());
                }
                (StateKey::Feedback(_), StateValue::Text(text)) => {
                    record.feedback = Some(text.clone());
                }
                (StateKey::Verdict(_), StateValue::Verdict(verdict)) => {
                    record.verdict = Some(*verdict);
                }
                // StateUpdate's builders never pair a key with the other value kind.
                _ => {}
            }
        }
    }

    /// Converts to a flat JSON object keyed by external key names.
    ///
    /// Keys that were never written are omitted.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert(TOPIC_KEY.to_string(), serde_json::json!(self.topic));
        for (stage, record) in &self.records {
            if let Some(ref artifact) = record.artifact {
                map.insert(stage.artifact_key().to_string(), serde_json::json!(artifact));
            }
            if let Some(ref feedback) = record.feedback {
                map.insert(stage.feedback_key().to_string(), serde_json::json!(feedback));
            }
            if let Some(verdict) = record.verdict {
                map.insert(stage.approval_key().to_string(), serde_json::json!(verdict));
            }
        }
        map
    }
}
