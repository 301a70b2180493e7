//! Testing utilities for reviewflow pipelines.
//!
//! This module provides:
//! - Scripted generators and reviewers that record their calls
//! - A full capability set for the standard topology
//! - Assertions over run results

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_all_artifacts, assert_reached_terminal, assert_replay_consistent, assert_visit_order,
};
pub use fixtures::ScriptedCapabilities;
pub use mocks::{ScriptedGenerator, ScriptedReviewer};
