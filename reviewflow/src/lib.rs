//! # Reviewflow
//!
//! An orchestration engine for generate-and-review pipelines.
//!
//! A run walks six stages (Content, Design, Code, Security, Test, QA). Each
//! stage generates an artifact through an injected [`Generator`], has it
//! judged by an injected [`Reviewer`], and routes on the verdict: an approval
//! moves forward, a rejection sends the run back for revision with the
//! reviewer's feedback. Security rejections go back to Code. A step budget
//! bounds the number of iterations.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reviewflow::prelude::*;
//! use reviewflow::testing::ScriptedCapabilities;
//!
//! # async fn demo() -> Result<(), ReviewflowError> {
//! let caps = ScriptedCapabilities::new();
//! let graph = PipelineGraph::software_delivery(&caps.capabilities())?;
//!
//! let mut executor = Executor::new(Arc::new(graph));
//! let result = executor.run("a todo list app", 20).await?;
//! println!("{}", result.report());
//! # Ok(())
//! # }
//! ```
//!
//! [`Generator`]: stages::Generator
//! [`Reviewer`]: stages::Reviewer

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{ConfigError, ExecutorConfig};
    pub use crate::context::{
        ArtifactState, GenerationContext, GenerationMode, ReviewContext, RoutedFeedback,
        StateKey, StateUpdate,
    };
    pub use crate::core::{Approval, PipelineEvent, StageId, Verdict, VerdictVocabulary};
    pub use crate::errors::{PipelineValidationError, ReviewflowError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_logging, LogFormat};
    pub use crate::pipeline::{
        Capabilities, Executor, InputSource, PipelineBuilder, PipelineGraph, RunEvent,
        RunResult, StageSpec, Target,
    };
    pub use crate::report::render_report;
    pub use crate::stages::{
        CapabilityError, FnGenerator, FnReviewer, Generator, RawReview, Reviewer,
    };
}
