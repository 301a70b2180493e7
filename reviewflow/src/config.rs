//! Executor configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Environment variable overriding [`ExecutorConfig::step_budget`].
pub const ENV_STEP_BUDGET: &str = "REVIEWFLOW_STEP_BUDGET";
/// Environment variable overriding [`ExecutorConfig::emit_events`].
pub const ENV_EMIT_EVENTS: &str = "REVIEWFLOW_EMIT_EVENTS";
/// Environment variable overriding [`ExecutorConfig::log_artifacts`].
pub const ENV_LOG_ARTIFACTS: &str = "REVIEWFLOW_LOG_ARTIFACTS";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file '{path}': {message}")]
    Read {
        /// The file path.
        path: String,
        /// The underlying IO error message.
        message: String,
    },

    /// The configuration is not valid JSON for this schema.
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value outside its allowed range.
    #[error("Invalid value for '{field}': {message}")]
    Invalid {
        /// The offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Configuration for an [`Executor`](crate::pipeline::Executor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Step budget used by `run_configured`.
    #[serde(default = "default_step_budget")]
    pub step_budget: u32,
    /// Whether lifecycle events are sent to the event sink.
    #[serde(default = "default_emit_events")]
    pub emit_events: bool,
    /// Whether artifact text is included in debug logs (digests are always logged).
    #[serde(default)]
    pub log_artifacts: bool,
    /// Pipeline name used in logs and events.
    #[serde(default = "default_pipeline_name")]
    pub pipeline_name: String,
}

fn default_step_budget() -> u32 {
    100
}

fn default_emit_events() -> bool {
    true
}

fn default_pipeline_name() -> String {
    "software-delivery".to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            step_budget: default_step_budget(),
            emit_events: default_emit_events(),
            log_artifacts: false,
            pipeline_name: default_pipeline_name(),
        }
    }
}

impl ExecutorConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the step budget.
    #[must_use]
    pub fn with_step_budget(mut self, budget: u32) -> Self {
        self.step_budget = budget;
        self
    }

    /// Enables or disables event emission.
    #[must_use]
    pub fn with_emit_events(mut self, emit: bool) -> Self {
        self.emit_events = emit;
        self
    }

    /// Enables or disables artifact text in debug logs.
    #[must_use]
    pub fn with_log_artifacts(mut self, log: bool) -> Self {
        self.log_artifacts = log;
        self
    }

    /// Sets the pipeline name.
    #[must_use]
    pub fn with_pipeline_name(mut self, name: impl Into<String>) -> Self {
        self.pipeline_name = name.into();
        self
    }

    /// Parses and validates a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&contents)
    }

    /// Applies `REVIEWFLOW_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary lookup, keyed by the `REVIEWFLOW_*` names.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_STEP_BUDGET) {
            self.step_budget = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("step_budget", format!("not an integer: {raw}")))?;
        }
        if let Some(raw) = lookup(ENV_EMIT_EVENTS) {
            self.emit_events = parse_flag("emit_events", &raw)?;
        }
        if let Some(raw) = lookup(ENV_LOG_ARTIFACTS) {
            self.log_artifacts = parse_flag("log_artifacts", &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validates field ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step_budget == 0 {
            return Err(ConfigError::invalid("step_budget", "must be greater than zero"));
        }
        if self.pipeline_name.trim().is_empty() {
            return Err(ConfigError::invalid("pipeline_name", "cannot be empty"));
        }
        Ok(())
    }
}

fn parse_flag(field: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(field, format!("not a boolean: {other}"))),
    }
}
