//! Core domain model types for reviewflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage identifiers and their state key names
//! - Verdicts, verdict vocabularies and approval status
//! - Lifecycle events

mod event;
mod stage_id;
mod status;
mod verdict;

pub use event::PipelineEvent;
pub use stage_id::StageId;
pub use status::Approval;
pub use verdict::{Verdict, VerdictVocabulary};
