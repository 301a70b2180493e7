//! Run state and the views handed to capabilities.
//!
//! This module provides:
//! - The artifact store owned by a run
//! - Typed partial updates merged into it
//! - Read-only generation and review contexts

mod slices;
mod state;
mod update;

pub use slices::{GenerationContext, GenerationMode, ReviewContext, RoutedFeedback};
pub use state::{ArtifactState, StageRecord, TOPIC_KEY};
pub use update::{StateKey, StateUpdate, StateValue};
