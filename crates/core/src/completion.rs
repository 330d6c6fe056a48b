//! Seam between the validator and the progress tracker.

use async_trait::async_trait;

/// Failure reported by a [`CompletionTarget`].
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct CompletionError(pub String);

/// Something the validator can mark steps complete on.
#[async_trait]
pub trait CompletionTarget: Send {
    /// Mark a step done. Unknown steps are a no-op.
    async fn complete_step(
        &mut self,
        step: &str,
        score: Option<f64>,
        notes: &str,
    ) -> Result<(), CompletionError>;

    /// Record the auto-grading result for the whole lab.
    async fn record_overall_score(&mut self, score: f64) -> Result<(), CompletionError>;
}
