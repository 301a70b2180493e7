//! Capability traits injected into stages.
//!
//! A generator turns a [`GenerationContext`] into artifact text; a reviewer
//! turns a [`ReviewContext`] into a [`RawReview`]. Both may call slow external
//! services. Neither is retried by the engine.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

use crate::context::{GenerationContext, ReviewContext};

/// Failure reported by a capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct CapabilityError {
    /// Human-readable reason, surfaced unchanged in the run error.
    pub reason: String,
}

impl CapabilityError {
    /// Creates a new capability error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<anyhow::Error> for CapabilityError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

/// A reviewer's answer before its verdict label is checked.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawReview {
    /// The verdict label as emitted.
    pub verdict: String,
    /// Feedback for the generator; may be empty on approval.
    #[serde(default)]
    pub feedback: String,
}

impl RawReview {
    /// Creates a raw review.
    #[must_use]
    pub fn new(verdict: impl Into<String>, feedback: impl Into<String>) -> Self {
        Self {
            verdict: verdict.into(),
            feedback: feedback.into(),
        }
    }
}

/// Produces a stage's artifact.
#[async_trait]
pub trait Generator: Send + Sync + Debug {
    /// Generates the artifact for one visit to the stage.
    ///
    /// When `ctx.mode` is `Revise` the feedback in `ctx` must be incorporated.
    async fn generate(&self, ctx: &GenerationContext) -> Result<String, CapabilityError>;
}

/// Judges a stage's artifact.
#[async_trait]
pub trait Reviewer: Send + Sync + Debug {
    /// Reviews the artifact in `ctx`.
    ///
    /// The verdict must be one of `ctx.allowed_verdicts`.
    async fn review(&self, ctx: &ReviewContext) -> Result<RawReview, CapabilityError>;
}

/// Future returned by [`FnGenerator`] closures.
pub type GenerateFuture = BoxFuture<'static, Result<String, CapabilityError>>;

/// Future returned by [`FnReviewer`] closures.
pub type ReviewFuture = BoxFuture<'static, Result<RawReview, CapabilityError>>;

/// A closure-based generator.
pub struct FnGenerator<F>
where
    F: Fn(GenerationContext) -> GenerateFuture + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnGenerator<F>
where
    F: Fn(GenerationContext) -> GenerateFuture + Send + Sync,
{
    /// Creates a new closure-based generator.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnGenerator<F>
where
    F: Fn(GenerationContext) -> GenerateFuture + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnGenerator")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<F> Generator for FnGenerator<F>
where
    F: Fn(GenerationContext) -> GenerateFuture + Send + Sync,
{
    async fn generate(&self, ctx: &GenerationContext) -> Result<String, CapabilityError> {
        (self.func)(ctx.clone()).await
    }
}

/// A closure-based reviewer.
pub struct FnReviewer<F>
where
    F: Fn(ReviewContext) -> ReviewFuture + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnReviewer<F>
where
    F: Fn(ReviewContext) -> ReviewFuture + Send + Sync,
{
    /// Creates a new closure-based reviewer.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnReviewer<F>
where
    F: Fn(ReviewContext) -> ReviewFuture + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnReviewer")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<F> Reviewer for FnReviewer<F>
where
    F: Fn(ReviewContext) -> ReviewFuture + Send + Sync,
{
    async fn review(&self, ctx: &ReviewContext) -> Result<RawReview, CapabilityError> {
        (self.func)(ctx.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GenerationMode;
    use crate::core::StageId;
    use futures::FutureExt;
    use uuid::Uuid;

    fn generation_context() -> GenerationContext {
        GenerationContext {
            run_id: Uuid::new_v4(),
            stage: StageId::Design,
            iteration: 2,
            visit: 1,
            topic: "chat app".to_string(),
            input: "stories".to_string(),
            previous_artifact: None,
            feedback: None,
            routed_feedback: None,
            mode: GenerationMode::Create,
        }
    }

    #[tokio::test]
    async fn test_fn_generator() {
        let generator = FnGenerator::new("echo", |ctx: GenerationContext| {
            async move { Ok(format!("design for {}", ctx.input)) }.boxed()
        });

        let artifact = generator.generate(&generation_context()).await.unwrap();
        assert_eq!(artifact, "design for stories");
        assert!(format!("{generator:?}").contains("echo"));
    }

    #[tokio::test]
    async fn test_fn_reviewer() {
        let reviewer = FnReviewer::new("strict", |ctx: ReviewContext| {
            async move { Ok(RawReview::new(ctx.allowed_verdicts[1].clone(), "again")) }.boxed()
        });

        let ctx = ReviewContext {
            run_id: Uuid::new_v4(),
            stage: StageId::Qa,
            iteration: 6,
            visit: 1,
            topic: "t".to_string(),
            reference: "cases".to_string(),
            artifact: "scenarios".to_string(),
            allowed_verdicts: vec!["Passed".to_string(), "Failed".to_string()],
        };
        let review = reviewer.review(&ctx).await.unwrap();
        assert_eq!(review, RawReview::new("Failed", "again"));
    }

    #[test]
    fn test_capability_error_from_anyhow() {
        let err: CapabilityError = anyhow::anyhow!("connection reset")
            .context("calling model")
            .into();
        assert_eq!(err.reason, "calling model: connection reset");
    }
}
