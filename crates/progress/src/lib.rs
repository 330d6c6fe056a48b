//! Progress Tracking
//!
//! Step completion, partial progress and checkpoints for a lab session,
//! with analytics, exports, shell steps and resume.

#![warn(missing_docs)]

pub mod analytics;
pub mod config;
pub mod error;
pub mod export;
pub mod guidance;
pub mod shell;
pub mod tracker;

pub use analytics::{AnalyticsSummary, StepAnalytics};
pub use config::TrackerConfig;
pub use error::{ProgressError, Result};
pub use guidance::StepGuidance;
pub use shell::{sub_command_name, SequenceOptions, ShellStepOptions};
pub use tracker::{LabProgress, LabProgressBuilder};
