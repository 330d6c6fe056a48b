//! The validator: check outcomes, completion hand-off and history.

use labtrack_core::{CompletionTarget, DisplaySurface, NullDisplay, Time, ValidationFeedback};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::scoring::ScoringRules;

/// Shared handle to whatever a validator marks complete.
pub type SharedTarget = Arc<Mutex<dyn CompletionTarget>>;

/// One scored validation, kept in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    /// Rule name
    pub rule: String,
    /// Score in [0, 100]
    pub score: f64,
    /// Whether the rule passed
    pub success: bool,
    /// When it ran
    pub timestamp: Time,
}

/// Checks student values, reports outcomes and grades scoring rules.
///
/// With a tracker attached, passing step validations mark the step done and
/// auto-grading records the overall score.
pub struct LabValidator {
    pub(crate) tracker: Option<SharedTarget>,
    pub(crate) display: Arc<dyn DisplaySurface>,
    pub(crate) last_result: Option<bool>,
    pub(crate) rules: ScoringRules,
    pub(crate) history: Vec<ValidationRecord>,
}

impl Default for LabValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl LabValidator {
    /// Create a validator with no tracker and no display.
    pub fn new() -> Self {
        Self {
            tracker: None,
            display: Arc::new(NullDisplay),
            last_result: None,
            rules: ScoringRules::default(),
            history: Vec::new(),
        }
    }

    /// Attach a tracker.
    pub fn with_tracker(mut self, tracker: SharedTarget) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Report outcomes to `display`.
    pub fn with_display(mut self, display: Arc<dyn DisplaySurface>) -> Self {
        self.display = display;
        self
    }

    /// Outcome of the most recent check.
    pub fn last_result(&self) -> Option<bool> {
        self.last_result
    }

    /// Scored validations, oldest first.
    pub fn validation_history(&self) -> &[ValidationRecord] {
        &self.history
    }

    /// Record and show an outcome, returning `success`.
    pub(crate) fn report(&mut self, success: bool, message: &str, details: &str) -> bool {
        self.display.show_validation(&ValidationFeedback {
            success,
            message: message.to_string(),
            details: details.to_string(),
        });
        tracing::debug!(success, "Validation: {}", message);
        self.last_result = Some(success);
        success
    }

    /// Generic check with caller-supplied messages.
    pub fn validate_custom(
        &mut self,
        condition: bool,
        success_msg: &str,
        failure_msg: &str,
        details: &str,
    ) -> bool {
        if condition {
            self.report(true, success_msg, "")
        } else {
            self.report(false, failure_msg, details)
        }
    }

    /// Check `condition` and, if it holds and a tracker is attached, mark `step` done.
    ///
    /// A tracker that fails to record the completion is logged; the check
    /// result is returned either way.
    pub async fn validate_and_mark_complete(
        &mut self,
        step: &str,
        condition: bool,
        success_msg: &str,
        failure_msg: &str,
    ) -> bool {
        let result = self.validate_custom(condition, success_msg, failure_msg, "");
        if result {
            if let Some(tracker) = &self.tracker {
                if let Err(e) = tracker.lock().await.complete_step(step, None, "").await {
                    tracing::warn!("Could not mark {} complete: {}", step, e);
                }
            }
        }
        result
    }

    /// Validator bound to one step.
    pub fn step_validator(&mut self, step: impl Into<String>) -> StepValidator<'_> {
        StepValidator {
            validator: self,
            step: step.into(),
        }
    }
}

/// Validator for a single step, from [`LabValidator::step_validator`].
pub struct StepValidator<'a> {
    validator: &'a mut LabValidator,
    step: String,
}

impl StepValidator<'_> {
    /// Check with the default messages: "{step} completed!" / "{step} not yet complete".
    pub async fn check(&mut self, condition: bool) -> bool {
        let success = format!("{} completed!", self.step);
        let failure = format!("{} not yet complete", self.step);
        self.check_with(condition, &success, &failure).await
    }

    /// Check with custom messages.
    pub async fn check_with(&mut self, condition: bool, success_msg: &str, failure_msg: &str) -> bool {
        self.validator
            .validate_and_mark_complete(&self.step, condition, success_msg, failure_msg)
            .await
    }
}
