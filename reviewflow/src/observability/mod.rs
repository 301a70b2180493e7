//! Observability utilities.

mod digest;
mod logging;

pub use digest::artifact_digest;
pub use logging::{env_filter, init_logging, LogFormat, DEFAULT_DIRECTIVE, ENV_LOG_JSON};
