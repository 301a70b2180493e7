//! Cooperative cancellation of runs.

mod token;

pub use token::{CancelCallback, CancellationToken, DEFAULT_CANCEL_REASON};
