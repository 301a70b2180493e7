//! Pipeline building and execution.
//!
//! This module provides:
//! - Stage specifications: edges, vocabularies and inputs as data
//! - Pipeline builder with contract validation
//! - The verdict router and the pipeline graph
//! - The executor that drives a run to the terminal state

mod builder;
mod executor;
mod graph;
mod result;
mod router;
mod spec;

pub use builder::PipelineBuilder;
pub use executor::Executor;
pub use graph::{software_delivery_specs, Capabilities, PipelineGraph};
pub use result::{RunEvent, RunResult};
pub use router::{resolve, route, Route};
pub use spec::{InputSource, StageSpec, Target};
