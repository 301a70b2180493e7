//! Utility functions for identifiers and timestamps.

pub mod timestamps;

pub use timestamps::{elapsed_ms, iso_timestamp};

use uuid::Uuid;

/// Generates a new run identifier (UUID v4).
#[must_use]
pub fn generate_run_id() -> Uuid {
    Uuid::new_v4()
}
