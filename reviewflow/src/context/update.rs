//! Partial state updates produced by stages.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::core::{StageId, Verdict};

/// Addresses one mergeable field of the [`ArtifactState`](super::ArtifactState).
///
/// The topic is deliberately absent: it is set once when the state is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateKey {
    /// The artifact produced by a stage's generator.
    Artifact(StageId),
    /// The latest feedback from a stage's reviewer.
    Feedback(StageId),
    /// The latest verdict from a stage's reviewer.
    Verdict(StageId),
}

impl StateKey {
    /// Returns the external key name (e.g., `design_document`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Artifact(stage) => stage.artifact_key(),
            Self::Feedback(stage) => stage.feedback_key(),
            Self::Verdict(stage) => stage.approval_key(),
        }
    }

    /// Returns the stage the key belongs to.
    #[must_use]
    pub const fn stage(self) -> StageId {
        match self {
            Self::Artifact(stage) | Self::Feedback(stage) | Self::Verdict(stage) => stage,
        }
    }

    /// Looks a key up by its external name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        StageId::ALL.into_iter().find_map(|stage| {
            [Self::Artifact(stage), Self::Feedback(stage), Self::Verdict(stage)]
                .into_iter()
                .find(|key| key.name() == name)
        })
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value stored under a [`StateKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StateValue {
    /// Artifact or feedback text.
    Text(String),
    /// A parsed reviewer verdict.
    Verdict(Verdict),
}

impl StateValue {
    /// Returns the text, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Verdict(_) => None,
        }
    }

    /// Returns the verdict, if this is a verdict value.
    #[must_use]
    pub fn as_verdict(&self) -> Option<Verdict> {
        match self {
            Self::Verdict(verdict) => Some(*verdict),
            Self::Text(_) => None,
        }
    }
}

/// An ordered set of writes produced by one stage step.
///
/// Entries can only be added through the typed builders, so a verdict key
/// always carries a verdict and the text keys always carry text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    entries: Vec<(StateKey, StateValue)>,
}

impl StateUpdate {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly generated artifact.
    #[must_use]
    pub fn artifact(self, stage: StageId, text: impl Into<String>) -> Self {
        self.push(StateKey::Artifact(stage), StateValue::Text(text.into()))
    }

    /// Records reviewer feedback.
    #[must_use]
    pub fn feedback(self, stage: StageId, text: impl Into<String>) -> Self {
        self.push(StateKey::Feedback(stage), StateValue::Text(text.into()))
    }

    /// Records a reviewer verdict.
    #[must_use]
    pub fn verdict(self, stage: StageId, verdict: Verdict) -> Self {
        self.push(StateKey::Verdict(stage), StateValue::Verdict(verdict))
    }

    /// Appends all entries of `other`, keeping order.
    #[must_use]
    pub fn extend(mut self, other: Self) -> Self {
        self.entries.extend(other.entries);
        self
    }

    fn push(mut self, key: StateKey, value: StateValue) -> Self {
        self.entries.push((key, value));
        self
    }

    /// Iterates over the entries in write order.
    pub fn iter(&self) -> impl Iterator<Item = &(StateKey, StateValue)> {
        self.entries.iter()
    }

    /// Returns the last value written for `key`.
    #[must_use]
    pub fn get(&self, key: StateKey) -> Option<&StateValue> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Returns the keys touched by the update.
    #[must_use]
    pub fn keys(&self) -> Vec<StateKey> {
        self.entries.iter().map(|(k, _)| *k).collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the update writes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts to a JSON object keyed by external key names.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Map<String, serde_json::Value> {
        self.entries
            .iter()
            .map(|(key, value)| (key.name().to_string(), serde_json::json!(value)))
            .collect()
    }
}

impl Serialize for StateUpdate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key.name(), value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_key_names_round_trip() {
        for stage in StageId::ALL {
            for key in [StateKey::Artifact(stage), StateKey::Feedback(stage), StateKey::Verdict(stage)] {
                assert_eq!(StateKey::from_name(key.name()), Some(key));
                assert_eq!(key.stage(), stage);
            }
        }
        assert_eq!(StateKey::from_name("topic"), None);
    }

    #[test]
    fn test_update_to_dict() {
        let update = StateUpdate::new()
            .verdict(StageId::Security, Verdict::FeedBack)
            .feedback(StageId::Security, "sql injection in login");

        let dict = update.to_dict();
        assert_eq!(dict["security_approval"], "FeedBack");
        assert_eq!(dict["security_feedback"], "sql injection in login");
        assert_eq!(update.len(), 2);
    }

    #[test]
    fn test_get_returns_last_write() {
        let update = StateUpdate::new()
            .artifact(StageId::Code, "v1")
            .artifact(StageId::Code, "v2");

        assert_eq!(
            update.get(StateKey::Artifact(StageId::Code)).and_then(StateValue::as_text),
            Some("v2")
        );
        assert!(update.get(StateKey::Feedback(StageId::Code)).is_none());
    }

    #[test]
    fn test_extend_keeps_order() {
        let update = StateUpdate::new()
            .artifact(StageId::Test, "cases")
            .extend(StateUpdate::new().verdict(StageId::Test, Verdict::Approved));

        assert_eq!(
            update.keys(),
            vec![StateKey::Artifact(StageId::Test), StateKey::Verdict(StageId::Test)]
        );
    }
}
