//! Subscriber setup for binaries and tests that embed the engine.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Directive applied when `RUST_LOG` does not mention the crate.
pub const DEFAULT_DIRECTIVE: &str = "reviewflow=info";

/// Environment variable selecting JSON output when set to `1`.
pub const ENV_LOG_JSON: &str = "REVIEWFLOW_LOG_JSON";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Picks the format from `REVIEWFLOW_LOG_JSON`.
    #[must_use]
    pub fn from_env() -> Self {
        if std::env::var(ENV_LOG_JSON).unwrap_or_default() == "1" {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("unknown log format '{other}' (expected 'pretty' or 'json')"),
        }
    }
}

/// Builds the filter: `RUST_LOG` plus the crate's default directive.
///
/// # Errors
///
/// Returns an error if the default directive cannot be parsed.
pub fn env_filter() -> anyhow::Result<EnvFilter> {
    let directive = DEFAULT_DIRECTIVE
        .parse()
        .context("invalid default log directive")?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

/// Installs the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(format: LogFormat) -> anyhow::Result<()> {
    let filter = env_filter()?;
    let installed = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_env_filter_builds() {
        assert!(env_filter().is_ok());
    }

    #[test]
    fn test_second_init_fails() {
        let _ = init_logging(LogFormat::Pretty);
        assert!(init_logging(LogFormat::Json).is_err());
    }
}
