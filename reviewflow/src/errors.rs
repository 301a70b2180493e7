//! Error types for the reviewflow engine.
//!
//! Run-time failures share one enum so that a caller can always recover the
//! stage and iteration a run stopped at. Graph construction problems are
//! reported separately as [`PipelineValidationError`] with a contract code.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::config::ConfigError;
use crate::core::StageId;

/// The main error type for reviewflow operations.
#[derive(Debug, Error)]
pub enum ReviewflowError {
    /// A state key was read before the run produced it.
    #[error("Missing key '{key}': the run has not produced a value for it yet")]
    MissingKey {
        /// The state key name.
        key: String,
    },

    /// A reviewer returned a label outside its stage's vocabulary.
    #[error("Invalid verdict '{verdict}' from stage '{stage}' (expected one of: {})", expected.join(", "))]
    InvalidVerdict {
        /// The stage whose reviewer misbehaved.
        stage: StageId,
        /// The raw label that was returned.
        verdict: String,
        /// The labels the stage accepts.
        expected: Vec<String>,
        /// The iteration the verdict was received in.
        iteration: u32,
    },

    /// A generation capability reported a failure.
    #[error("Generation failed in stage '{stage}': {reason}")]
    GenerationFailed {
        /// The stage being generated.
        stage: StageId,
        /// The reason given by the capability.
        reason: String,
        /// The iteration the failure happened in.
        iteration: u32,
    },

    /// A review capability reported a failure.
    #[error("Review failed in stage '{stage}': {reason}")]
    ReviewFailed {
        /// The stage being reviewed.
        stage: StageId,
        /// The reason given by the capability.
        reason: String,
        /// The iteration the failure happened in.
        iteration: u32,
    },

    /// The run used up its step budget without reaching the terminal state.
    #[error("Step budget of {budget} exhausted after {iterations} iterations without reaching the end (last stage: '{last_stage}')")]
    BudgetExceeded {
        /// The last stage executed.
        last_stage: StageId,
        /// Completed iterations.
        iterations: u32,
        /// The budget the run was started with.
        budget: u32,
    },

    /// The run was cancelled between iterations.
    #[error("Run cancelled before stage '{stage}' after {iterations} iterations: {reason}")]
    Cancelled {
        /// The stage that would have run next.
        stage: StageId,
        /// Completed iterations.
        iterations: u32,
        /// The cancellation reason.
        reason: String,
    },

    /// A run was requested with a step budget of zero.
    #[error("Step budget must be greater than zero (got {budget})")]
    InvalidBudget {
        /// The rejected budget.
        budget: u32,
    },

    /// The pipeline graph is malformed.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// The executor configuration is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

impl ReviewflowError {
    /// Creates a missing key error.
    #[must_use]
    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingKey { key: key.into() }
    }

    /// Creates an invalid verdict error.
    #[must_use]
    pub fn invalid_verdict(stage: StageId, verdict: impl Into<String>, expected: Vec<String>) -> Self {
        Self::InvalidVerdict {
            stage,
            verdict: verdict.into(),
            expected,
            iteration: 0,
        }
    }

    /// Creates a generation failure.
    #[must_use]
    pub fn generation_failed(stage: StageId, reason: impl Into<String>, iteration: u32) -> Self {
        Self::GenerationFailed {
            stage,
            reason: reason.into(),
            iteration,
        }
    }

    /// Creates a review failure.
    #[must_use]
    pub fn review_failed(stage: StageId, reason: impl Into<String>, iteration: u32) -> Self {
        Self::ReviewFailed {
            stage,
            reason: reason.into(),
            iteration,
        }
    }

    /// Stamps the iteration on errors raised outside the executor loop.
    #[must_use]
    pub fn at_iteration(mut self, n: u32) -> Self {
        match &mut self {
            Self::InvalidVerdict { iteration, .. }
            | Self::GenerationFailed { iteration, .. }
            | Self::ReviewFailed { iteration, .. } => *iteration = n,
            _ => {}
        }
        self
    }

    /// The stage the error is attributed to, if any.
    #[must_use]
    pub fn stage(&self) -> Option<StageId> {
        match self {
            Self::InvalidVerdict { stage, .. }
            | Self::GenerationFailed { stage, .. }
            | Self::ReviewFailed { stage, .. }
            | Self::Cancelled { stage, .. } => Some(*stage),
            Self::BudgetExceeded { last_stage, .. } => Some(*last_stage),
            _ => None,
        }
    }

    /// The iteration count carried by the error, if any.
    #[must_use]
    pub fn iterations(&self) -> Option<u32> {
        match self {
            Self::InvalidVerdict { iteration, .. }
            | Self::GenerationFailed { iteration, .. }
            | Self::ReviewFailed { iteration, .. } => Some(*iteration),
            Self::BudgetExceeded { iterations, .. } | Self::Cancelled { iterations, .. } => {
                Some(*iterations)
            }
            _ => None,
        }
    }

    /// Short machine-readable name of the variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingKey { .. } => "MissingKey",
            Self::InvalidVerdict { .. } => "InvalidVerdict",
            Self::GenerationFailed { .. } => "GenerationFailed",
            Self::ReviewFailed { .. } => "ReviewFailed",
            Self::BudgetExceeded { .. } => "BudgetExceeded",
            Self::Cancelled { .. } => "Cancelled",
            Self::InvalidBudget { .. } => "InvalidBudget",
            Self::Validation(_) => "PipelineValidation",
            Self::Config(_) => "Config",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        if let Some(stage) = self.stage() {
            map.insert("stage".to_string(), serde_json::json!(stage));
        }
        if let Some(iterations) = self.iterations() {
            map.insert("iterations".to_string(), serde_json::json!(iterations));
        }
        if let Self::Validation(err) = self {
            if let Some(ref info) = err.error_info {
                map.insert("code".to_string(), serde_json::json!(info.code));
            }
        }
        map
    }
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "CONTRACT-004-BACK_EDGE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a pipeline graph fails validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<StageId>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates an error carrying a contract code, a summary and the default fix hint.
    ///
    /// The first involved stage is recorded under `stage` in the error
    /// context and the second, if any, under `target`.
    #[must_use]
    pub fn contract(code: &str, message: impl Into<String>, stages: Vec<StageId>) -> Self {
        let message = message.into();
        let mut info = ContractErrorInfo::new(code, message.clone());
        if let Some(hint) = ContractSuggestions::get(code) {
            info = info.with_fix_hint(hint);
        }
        for (key, stage) in ["stage", "target"].into_iter().zip(&stages) {
            info = info.with_context_entry(key, stage.as_str());
        }
        Self {
            message,
            stages,
            error_info: Some(info),
        }
    }

    /// Returns the contract code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// Provides default suggestions for pipeline contract error codes.
pub struct ContractSuggestions;

impl ContractSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            "CONTRACT-004-EMPTY" => Some("Add at least one stage to the pipeline before building."),
            "CONTRACT-004-DUPLICATE" => Some("Each stage may appear only once in a pipeline."),
            "CONTRACT-004-MISSING_TARGET" => Some(
                "Every edge and input must name a stage that is part of the pipeline. \
                 Add the stage or point the edge elsewhere.",
            ),
            "CONTRACT-004-BACK_EDGE" => Some(
                "A rejection may only return to the stage itself or to an earlier stage.",
            ),
            "CONTRACT-004-FORWARD_EDGE" => Some(
                "An approval must advance to a later stage or to the terminal state.",
            ),
            "CONTRACT-004-NO_TERMINAL" => Some(
                "Route at least one stage's approval to the terminal state.",
            ),
            "CONTRACT-004-INPUT_ORDER" => Some(
                "A stage can only read artifacts of stages that run before it.",
            ),
            "CONTRACT-004-UNREACHABLE" => Some(
                "Every stage must lie on the approval path from the entry stage. \
                 Point an earlier stage's forward edge at it or remove it.",
            ),
            "CONTRACT-004-MISSING_CAPABILITY" => Some(
                "Bind a generator and a reviewer to every stage with Capabilities::with_stage.",
            ),
            _ => None,
        }
    }
}
