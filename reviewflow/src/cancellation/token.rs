//! Cancellation token for cooperative cancellation.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A callback invoked once when cancellation is requested.
pub type CancelCallback = Box<dyn Fn() + Send + Sync>;

/// Reason reported when a token is cancelled without one.
pub const DEFAULT_CANCEL_REASON: &str = "cancelled by caller";

/// A token the caller flips to stop a run between iterations.
///
/// The executor checks the token before each stage; a stage already in
/// flight is allowed to finish. The first reason wins.
#[derive(Default)]
pub struct CancellationToken {
    cancelled: AtomicBool,
    reason: RwLock<Option<String>>,
    callbacks: RwLock<Vec<CancelCallback>>,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Later calls are ignored.
    ///
    /// Registered callbacks run on the calling thread; a panicking callback
    /// is logged and does not stop the others.
    pub fn cancel(&self, reason: impl Into<String>) {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let reason = reason.into();
        debug!(reason = %reason, "Cancellation requested");
        *self.reason.write() = Some(reason);

        for callback in self.callbacks.read().iter() {
            run_callback(callback.as_ref());
        }
    }

    /// Cancels the token once `delay` has elapsed.
    ///
    /// Requires a running tokio runtime.
    pub fn cancel_after(self: &Arc<Self>, delay: Duration, reason: impl Into<String>) {
        let token = Arc::clone(self);
        let reason = reason.into();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            token.cancel(reason);
        });
    }

    /// Registers a callback. Runs it immediately if already cancelled.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        if self.is_cancelled() {
            run_callback(&callback);
        } else {
            self.callbacks.write().push(Box::new(callback));
        }
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Returns the reason to report if the token is cancelled.
    #[must_use]
    pub fn check(&self) -> Option<String> {
        self.is_cancelled().then(|| {
            self.reason()
                .unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string())
        })
    }
}

fn run_callback(callback: &(dyn Fn() + Send + Sync)) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(callback)) {
        warn!("Cancellation callback panicked: {:?}", e);
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_token_default_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.reason().is_none());
        assert!(token.check().is_none());
    }

    #[test]
    fn test_first_reason_wins() {
        let token = CancellationToken::new();
        token.cancel("user pressed stop");
        token.cancel("deadline");

        assert!(token.is_cancelled());
        assert_eq!(token.check(), Some("user pressed stop".to_string()));
    }

    #[test]
    fn test_callbacks_run_once() {
        let token = CancellationToken::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        token.on_cancel(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        token.cancel("a");
        token.cancel("b");
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let c = counter.clone();
        token.on_cancel(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panicking_callback_is_contained() {
        let token = CancellationToken::new();
        token.on_cancel(|| panic!("boom"));
        token.cancel("test");
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_after() {
        let token = Arc::new(CancellationToken::new());
        token.cancel_after(Duration::from_millis(5), "deadline");
        assert!(!token.is_cancelled());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(token.reason(), Some("deadline".to_string()));
    }
}
