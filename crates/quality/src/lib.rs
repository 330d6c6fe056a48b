//! Lab Validation
//!
//! Checks over student values, step validators that mark progress, and
//! weighted auto-grading.

#![warn(missing_docs)]

pub mod checks;
pub mod error;
pub mod grading;
pub mod namespace;
pub mod scoring;
pub mod validator;

pub use checks::{values_match, DEFAULT_TOLERANCE};
pub use error::{QualityError, Result};
pub use grading::{score_to_grade, GradingReport, RuleResult};
pub use namespace::{Binding, Namespace, ValueType};
pub use scoring::{CheckFn, CheckSpec, Checker, RuleOutcome, ScoringRule, ScoringRules};
pub use validator::{LabValidator, SharedTarget, StepValidator, ValidationRecord};
