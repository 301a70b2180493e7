//! Scripted capabilities for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::context::{GenerationContext, ReviewContext};
use crate::core::StageId;
use crate::stages::{CapabilityError, Generator, RawReview, Reviewer};

/// A generator that records every context and answers deterministically.
///
/// The artifact for the n-th call is `"<stage> artifact #n"`.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    calls: Mutex<Vec<GenerationContext>>,
    failures: HashMap<usize, String>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    /// Creates a generator that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the `call`-th invocation (1-based) with `reason`.
    #[must_use]
    pub fn fail_on_call(mut self, call: usize, reason: impl Into<String>) -> Self {
        self.failures.insert(call, reason.into());
        self
    }

    /// Sleeps before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the recorded contexts, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<GenerationContext> {
        self.calls.lock().clone()
    }

    /// Returns the number of invocations.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, ctx: &GenerationContext) -> Result<String, CapabilityError> {
        let call = {
            let mut calls = self.calls.lock();
            calls.push(ctx.clone());
            calls.len()
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.get(&call) {
            Some(reason) => Err(CapabilityError::new(reason.clone())),
            None => Ok(format!("{} artifact #{call}", ctx.stage)),
        }
    }
}

#[derive(Debug, Clone)]
enum ScriptedAnswer {
    Review(RawReview),
    Fail(String),
}

/// A reviewer that plays back a script, then approves.
#[derive(Debug)]
pub struct ScriptedReviewer {
    stage: StageId,
    script: Mutex<VecDeque<ScriptedAnswer>>,
    calls: Mutex<Vec<ReviewContext>>,
}

impl ScriptedReviewer {
    /// Creates a reviewer with an empty script.
    #[must_use]
    pub fn new(stage: StageId) -> Self {
        Self {
            stage,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a reviewer that approves every time.
    #[must_use]
    pub fn approving(stage: StageId) -> Self {
        Self::new(stage)
    }

    /// Queues an approval.
    #[must_use]
    pub fn then_approve(self) -> Self {
        let label = self.stage.vocabulary().approve.to_string();
        self.then_raw(label, "")
    }

    /// Queues a rejection with `feedback`.
    #[must_use]
    pub fn then_reject(self, feedback: impl Into<String>) -> Self {
        let label = self.stage.vocabulary().reject.to_string();
        self.then_raw(label, feedback)
    }

    /// Queues an arbitrary label, valid or not.
    #[must_use]
    pub fn then_raw(self, verdict: impl Into<String>, feedback: impl Into<String>) -> Self {
        self.script
            .lock()
            .push_back(ScriptedAnswer::Review(RawReview::new(verdict, feedback)));
        self
    }

    /// Queues a capability failure.
    #[must_use]
    pub fn then_fail(self, reason: impl Into<String>) -> Self {
        self.script.lock().push_back(ScriptedAnswer::Fail(reason.into()));
        self
    }

    /// Returns the recorded contexts, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<ReviewContext> {
        self.calls.lock().clone()
    }

    /// Returns the number of invocations.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Reviewer for ScriptedReviewer {
    async fn review(&self, ctx: &ReviewContext) -> Result<RawReview, CapabilityError> {
        self.calls.lock().push(ctx.clone());
        let next = self.script.lock().pop_front();
        match next {
            Some(ScriptedAnswer::Review(review)) => Ok(review),
            Some(ScriptedAnswer::Fail(reason)) => Err(CapabilityError::new(reason)),
            None => Ok(RawReview::new(self.stage.vocabulary().approve.as_str(), "")),
        }
    }
}
