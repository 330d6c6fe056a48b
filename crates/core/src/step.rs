//! Step model - one record per lab step.

use serde::{Deserialize, Serialize};
use crate::Time;

/// Progress state of a single lab step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepState {
    /// Whether the step is done
    #[serde(default)]
    pub completed: bool,

    /// When the step was completed
    #[serde(default, with = "crate::time::flexible_option")]
    pub timestamp: Option<Time>,

    /// How many attempts were recorded
    #[serde(default)]
    pub attempts: u32,

    /// Score given on completion
    #[serde(default)]
    pub score: Option<f64>,

    /// Free-form notes
    #[serde(default)]
    pub notes: String,

    /// Fraction of the step done, always within [0, 1]
    #[serde(default)]
    pub partial_progress: f64,

    /// Named checkpoints, append-only
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
}

impl Default for StepState {
    fn default() -> Self {
        Self {
            completed: false,
            timestamp: None,
            attempts: 0,
            score: None,
            notes: String::new(),
            partial_progress: 0.0,
            checkpoints: Vec::new(),
        }
    }
}

impl StepState {
    /// Mark the step completed at `at`. Empty notes keep the existing ones.
    pub fn complete(&mut self, at: Time, score: Option<f64>, notes: &str) {
        self.completed = true;
        self.timestamp = Some(at);
        self.score = score;
        if !notes.is_empty() {
            self.notes = notes.to_string();
        }
    }

    /// Store partial progress, clamped to [0, 1].
    pub fn set_partial(&mut self, progress: f64) {
        self.partial_progress = clamp_progress(progress);
    }

    /// Append a checkpoint.
    pub fn push_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.checkpoints.push(checkpoint);
    }

    /// Back to the zero state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Derived display status.
    pub fn status(&self) -> StepStatus {
        if self.completed {
            StepStatus::Completed
        } else if self.partial_progress > 0.0 {
            StepStatus::InProgress(self.partial_progress)
        } else {
            StepStatus::Pending
        }
    }

    /// Repair records that violate the model's invariants.
    ///
    /// Returns true if anything changed.
    pub fn normalize(&mut self, fallback_completion: Time) -> bool {
        let mut changed = false;
        let clamped = clamp_progress(self.partial_progress);
        if clamped != self.partial_progress {
            self.partial_progress = clamped;
            changed = true;
        }
        if self.completed && self.timestamp.is_none() {
            self.timestamp = Some(fallback_completion);
            changed = true;
        }
        changed
    }
}

/// Clamp a progress value into [0, 1]. NaN becomes 0.
pub fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

/// A named checkpoint within a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Checkpoint name
    pub name: String,

    /// Progress at the checkpoint, clamped to [0, 1]
    pub progress: f64,

    /// When it was reached
    #[serde(with = "crate::time::flexible")]
    pub timestamp: Time,
}

/// Display status of a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepStatus {
    /// Done
    Completed,
    /// Started, with the fraction done
    InProgress(f64),
    /// Not started
    Pending,
}

impl StepStatus {
    /// Short label for text output.
    pub fn label(&self) -> String {
        match self {
            StepStatus::Completed => "Completed".to_string(),
            StepStatus::InProgress(p) => format!("{:.0}% Complete", p * 100.0),
            StepStatus::Pending => "Pending".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_progress() {
        assert_eq!(clamp_progress(1.5), 1.0);
        assert_eq!(clamp_progress(-0.2), 0.0);
        assert_eq!(clamp_progress(0.4), 0.4);
        assert_eq!(clamp_progress(f64::NAN), 0.0);
    }

    #[test]
    fn test_complete_keeps_notes_when_empty() {
        let mut step = StepState {
            notes: "started late".to_string(),
            ..Default::default()
        };
        step.complete(crate::time::now(), Some(80.0), "");
        assert!(step.completed);
        assert!(step.timestamp.is_some());
        assert_eq!(step.notes, "started late");
        assert_eq!(step.status(), StepStatus::Completed);
    }

    #[test]
    fn test_legacy_record_gets_defaults() {
        let json = r#"{"completed": false, "timestamp": null, "attempts": 2, "score": null, "notes": ""}"#;
        let step: StepState = serde_json::from_str(json).unwrap();
        assert_eq!(step.attempts, 2);
        assert_eq!(step.partial_progress, 0.0);
        assert!(step.checkpoints.is_empty());
    }

    #[test]
    fn test_normalize_repairs_invariants() {
        let mut step = StepState {
            completed: true,
            partial_progress: 7.0,
            ..Default::default()
        };
        assert!(step.normalize(crate::time::now()));
        assert!(step.timestamp.is_some());
        assert_eq!(step.partial_progress, 1.0);
        assert!(!step.normalize(crate::time::now()));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(StepStatus::InProgress(0.25).label(), "25% Complete");
        assert_eq!(StepStatus::Pending.label(), "Pending");
    }
}
