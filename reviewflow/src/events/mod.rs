//! Event sinks for run observability.
//!
//! The executor reports lifecycle events (`run.started`, `stage.generated`,
//! `stage.reviewed`, `stage.routed`, and the terminal `run.*` event) to one
//! [`EventSink`]. Sinks are attached per executor; there is no global sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
