//! Parsing of reviewer replies produced by generative models.
//!
//! Models answer with a JSON object, often wrapped in a Markdown fence and
//! surrounded by prose. Both the generic `{"verdict", "feedback"}` shape and
//! the per-stage field names are accepted.

use regex::Regex;
use std::sync::LazyLock;

use super::{CapabilityError, RawReview};
use crate::core::StageId;

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("fenced JSON pattern is valid")
});

/// Field holding the feedback text in a stage-specific model reply.
///
/// The security reviewer reports its findings under `security_review`.
#[must_use]
pub const fn model_feedback_field(stage: StageId) -> &'static str {
    match stage {
        StageId::Security => "security_review",
        other => other.feedback_key(),
    }
}

impl RawReview {
    /// Extracts a review from a model's reply.
    ///
    /// The verdict is taken as-is; checking it against the stage vocabulary
    /// happens when the stage consumes the review.
    ///
    /// # Errors
    ///
    /// Returns a `CapabilityError` if no JSON object can be found or it has
    /// no string verdict.
    pub fn from_model_output(stage: StageId, text: &str) -> Result<Self, CapabilityError> {
        let json = extract_json_object(text).ok_or_else(|| {
            CapabilityError::new(format!("{stage} review output contains no JSON object"))
        })?;
        let value = first_json_value(json).map_err(|e| {
            CapabilityError::new(format!("{stage} review output is not valid JSON: {e}"))
        })?;
        let object = value.as_object().ok_or_else(|| {
            CapabilityError::new(format!("{stage} review output is not a JSON object"))
        })?;

        let verdict = ["verdict", stage.approval_key()]
            .iter()
            .find_map(|field| object.get(*field))
            .ok_or_else(|| CapabilityError::new(format!("{stage} review output has no verdict")))?
            .as_str()
            .ok_or_else(|| CapabilityError::new(format!("{stage} review verdict is not a string")))?;

        let feedback = ["feedback", model_feedback_field(stage)]
            .iter()
            .find_map(|field| object.get(*field))
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            })
            .unwrap_or_default();

        Ok(Self::new(verdict, feedback))
    }
}

/// Returns the text starting at the reply's JSON object. Anything after
/// the object is left for [`first_json_value`] to ignore.
fn extract_json_object(text: &str) -> Option<&str> {
    if let Some(caps) = FENCED_JSON.captures(text) {
        return caps.get(1).map(|m| m.as_str());
    }
    text.find('{').map(|start| &text[start..])
}

fn first_json_value(json: &str) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::Deserializer::from_str(json)
        .into_iter::<serde_json::Value>()
        .next()
        .unwrap_or_else(|| serde_json::from_str(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_generic_shape() {
        let review = RawReview::from_model_output(
            StageId::Code,
            r#"{"verdict": "FeedBack", "feedback": "handle errors"}"#,
        )
        .unwrap();
        assert_eq!(review, RawReview::new("FeedBack", "handle errors"));
    }

    #[test]
    fn test_stage_specific_fields() {
        let review = RawReview::from_model_output(
            StageId::Qa,
            r#"{"question_answer_testing_approval": "Passed", "question_answer_testing_feedback": ""}"#,
        )
        .unwrap();
        assert_eq!(review, RawReview::new("Passed", ""));
    }

    #[test]
    fn test_security_feedback_comes_from_review_field() {
        let review = RawReview::from_model_output(
            StageId::Security,
            r#"{"security_approval": "FeedBack", "security_review": "passwords stored in plain text"}"#,
        )
        .unwrap();
        assert_eq!(review.feedback, "passwords stored in plain text");
    }

    #[test]
    fn test_fenced_reply_with_prose() {
        let text = "Here is my review:\n```json\n{\"design_approval\": \"Approved\", \"design_feedback\": \"ok\"}\n```\nThanks!";
        let review = RawReview::from_model_output(StageId::Design, text).unwrap();
        assert_eq!(review, RawReview::new("Approved", "ok"));
    }

    #[test]
    fn test_bare_object_inside_prose() {
        let text = "Result: {\"verdict\": \"Approved\"} end";
        let review = RawReview::from_model_output(StageId::Test, text).unwrap();
        assert_eq!(review, RawReview::new("Approved", ""));
    }

    #[test]
    fn test_trailing_prose_with_braces_is_ignored() {
        let text = r#"Review: {"verdict": "Approved", "feedback": ""} Note: consider {x}."#;
        let review = RawReview::from_model_output(StageId::Code, text).unwrap();
        assert_eq!(review, RawReview::new("Approved", ""));
    }

    #[test]
    fn test_nested_object_is_kept_whole() {
        let text = r#"{"verdict": "FeedBack", "feedback": {"issues": ["no tests"]}} see {notes}"#;
        let review = RawReview::from_model_output(StageId::Test, text).unwrap();
        assert_eq!(review.verdict, "FeedBack");
        assert_eq!(review.feedback, r#"{"issues":["no tests"]}"#);
    }

    #[test]
    fn test_label_is_not_normalized() {
        let review =
            RawReview::from_model_output(StageId::Code, r#"{"verdict": "approved"}"#).unwrap();
        assert_eq!(review.verdict, "approved");
    }

    #[test]
    fn test_missing_verdict() {
        let err = RawReview::from_model_output(StageId::Code, r#"{"feedback": "x"}"#).unwrap_err();
        assert!(err.reason.contains("no verdict"));
    }

    #[test]
    fn test_no_json() {
        assert!(RawReview::from_model_output(StageId::Content, "looks good to me").is_err());
    }
}
