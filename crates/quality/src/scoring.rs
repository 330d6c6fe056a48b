//! Scoring rules for auto-grading.

use labtrack_core::time;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::checks::DEFAULT_TOLERANCE;
use crate::namespace::{Namespace, ValueType};
use crate::validator::{LabValidator, ValidationRecord};

/// What a checker reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleOutcome {
    /// Pass or fail, scored 100 or 0
    Pass(bool),
    /// Pass or fail with an explicit score
    Scored {
        /// Whether the rule passed
        success: bool,
        /// Score in [0, 100]
        score: f64,
    },
}

impl RuleOutcome {
    fn into_parts(self) -> (bool, f64) {
        match self {
            RuleOutcome::Pass(success) => (success, if success { 100.0 } else { 0.0 }),
            RuleOutcome::Scored { success, score } => (success, score),
        }
    }
}

impl From<bool> for RuleOutcome {
    fn from(success: bool) -> Self {
        RuleOutcome::Pass(success)
    }
}

/// Closure checker over the namespace.
pub type CheckFn = dyn Fn(&Namespace) -> anyhow::Result<RuleOutcome> + Send + Sync;

/// Declarative checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckSpec {
    /// A variable is bound, optionally with a type
    VariableExists {
        /// Variable name
        var_name: String,
        /// Required type
        #[serde(default)]
        expected_type: Option<ValueType>,
    },
    /// A variable's value matches an expected value
    OutputMatch {
        /// Variable holding the actual value
        var_name: String,
        /// Expected value
        expected: Value,
        /// Numeric tolerance
        #[serde(default = "default_tolerance")]
        tolerance: f64,
    },
    /// A checker type this version does not know; always fails
    #[serde(other)]
    Unsupported,
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

/// How a rule is checked.
#[derive(Clone)]
pub enum Checker {
    /// Closure over the namespace
    Func(Arc<CheckFn>),
    /// Declarative check
    Spec(CheckSpec),
}

impl Checker {
    /// Wrap a closure.
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&Namespace) -> anyhow::Result<RuleOutcome> + Send + Sync + 'static,
    {
        Checker::Func(Arc::new(f))
    }
}

impl From<CheckSpec> for Checker {
    fn from(spec: CheckSpec) -> Self {
        Checker::Spec(spec)
    }
}

impl fmt::Debug for Checker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checker::Func(_) => f.write_str("Checker::Func(..)"),
            Checker::Spec(spec) => f.debug_tuple("Checker::Spec").field(spec).finish(),
        }
    }
}

/// A weighted grading rule.
#[derive(Debug, Clone)]
pub struct ScoringRule {
    /// Rule name
    pub name: String,
    /// Weight in the final score
    pub weight: f64,
    /// How it is checked
    pub checker: Checker,
    /// What it checks
    pub description: String,
    /// Whether scores between 0 and 100 are kept
    pub partial_credit: bool,
    /// Score from the last run
    pub last_score: Option<f64>,
    /// Outcome of the last run
    pub last_result: Option<bool>,
}

/// Rules in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ScoringRules {
    rules: Vec<ScoringRule>,
}

impl ScoringRules {
    /// Add a rule, replacing one with the same name in place.
    pub fn insert(&mut self, rule: ScoringRule) {
        match self.rules.iter_mut().find(|r| r.name == rule.name) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    /// Rule by name.
    pub fn get(&self, name: &str) -> Option<&ScoringRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut ScoringRule> {
        self.rules.iter_mut().find(|r| r.name == name)
    }

    /// Rule names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.name.clone()).collect()
    }

    /// Rules in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ScoringRule> {
        self.rules.iter()
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl LabValidator {
    /// Register a scoring rule.
    pub fn add_scoring_rule(
        &mut self,
        name: impl Into<String>,
        weight: f64,
        checker: impl Into<Checker>,
        description: impl Into<String>,
        partial_credit: bool,
    ) {
        self.rules.insert(ScoringRule {
            name: name.into(),
            weight,
            checker: checker.into(),
            description: description.into(),
            partial_credit,
            last_score: None,
            last_result: None,
        });
    }

    /// Registered rules.
    pub fn scoring_rules(&self) -> &ScoringRules {
        &self.rules
    }

    /// Run one rule and return `(success, score)`.
    ///
    /// An unknown rule gives `(false, 0)`. A checker that errors or panics
    /// scores 0 and is not added to the history. Without partial credit the
    /// score is forced to 0 or 100.
    pub fn validate_with_score(&mut self, rule_name: &str, namespace: &Namespace) -> (bool, f64) {
        let Some(rule) = self.rules.get(rule_name) else {
            tracing::warn!("Unknown scoring rule: {}", rule_name);
            return (false, 0.0);
        };
        let checker = rule.checker.clone();
        let partial_credit = rule.partial_credit;

        let outcome = match checker {
            Checker::Func(f) => match catch_unwind(AssertUnwindSafe(|| f(namespace))) {
                Ok(Ok(outcome)) => Some(outcome.into_parts()),
                Ok(Err(e)) => {
                    tracing::warn!("Scoring rule {} failed: {}", rule_name, e);
                    None
                }
                Err(_) => {
                    tracing::warn!("Scoring rule {} panicked", rule_name);
                    None
                }
            },
            Checker::Spec(spec) => {
                let success = self.run_spec(&spec, namespace);
                Some((success, if success { 100.0 } else { 0.0 }))
            }
        };

        let Some((success, mut score)) = outcome else {
            if let Some(rule) = self.rules.get_mut(rule_name) {
                rule.last_score = Some(0.0);
                rule.last_result = Some(false);
            }
            return (false, 0.0);
        };

        if !partial_credit {
            score = if success { 100.0 } else { 0.0 };
        }
        if let Some(rule) = self.rules.get_mut(rule_name) {
            rule.last_score = Some(score);
            rule.last_result = Some(success);
        }
        self.history.push(ValidationRecord {
            rule: rule_name.to_string(),
            score,
            success,
            timestamp: time::now(),
        });
        (success, score)
    }

    fn run_spec(&mut self, spec: &CheckSpec, namespace: &Namespace) -> bool {
        match spec {
            CheckSpec::VariableExists {
                var_name,
                expected_type,
            } => self.validate_variable_exists(var_name, namespace, *expected_type),
            CheckSpec::OutputMatch {
                var_name,
                expected,
                tolerance,
            } => {
                let actual = namespace.value(var_name).cloned().unwrap_or(Value::Null);
                self.validate_output(&actual, expected, *tolerance)
            }
            CheckSpec::Unsupported => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn namespace() -> Namespace {
        let mut ns = Namespace::new();
        ns.set("accuracy", 0.92).set("model", "forest");
        ns
    }

    #[test]
    fn test_unknown_rule() {
        let mut v = LabValidator::new();
        assert_eq!(v.validate_with_score("nope", &namespace()), (false, 0.0));
        assert!(v.validation_history().is_empty());
    }

    #[test]
    fn test_closure_rule_with_partial_credit() {
        let mut v = LabValidator::new();
        v.add_scoring_rule(
            "accuracy",
            1.0,
            Checker::func(|ns| {
                let acc = ns.value("accuracy").and_then(Value::as_f64).unwrap_or(0.0);
                Ok(RuleOutcome::Scored {
                    success: acc > 0.9,
                    score: acc * 100.0,
                })
            }),
            "Model accuracy",
            true,
        );

        let (success, score) = v.validate_with_score("accuracy", &namespace());
        assert!(success);
        assert!((score - 92.0).abs() < 1e-9);

        let rule = v.scoring_rules().get("accuracy").unwrap();
        assert_eq!(rule.last_result, Some(true));
        assert_eq!(v.validation_history().len(), 1);
        assert_eq!(v.validation_history()[0].rule, "accuracy");
    }

    #[test]
    fn test_no_partial_credit_forces_all_or_nothing() {
        let mut v = LabValidator::new();
        let half = |_: &Namespace| -> anyhow::Result<RuleOutcome> {
            Ok(RuleOutcome::Scored {
                success: true,
                score: 50.0,
            })
        };
        v.add_scoring_rule("strict", 1.0, Checker::func(half), "", false);
        v.add_scoring_rule("lenient", 1.0, Checker::func(half), "", true);

        assert_eq!(v.validate_with_score("strict", &namespace()), (true, 100.0));
        assert_eq!(v.validate_with_score("lenient", &namespace()), (true, 50.0));
    }

    #[test]
    fn test_failing_checker_scores_zero() {
        let mut v = LabValidator::new();
        v.add_scoring_rule(
            "errors",
            1.0,
            Checker::func(|_| anyhow::bail!("missing dataframe")),
            "",
            true,
        );
        v.add_scoring_rule(
            "panics",
            1.0,
            Checker::func(|_| panic!("checker bug")),
            "",
            true,
        );

        assert_eq!(v.validate_with_score("errors", &namespace()), (false, 0.0));
        assert_eq!(v.validate_with_score("panics", &namespace()), (false, 0.0));
        assert_eq!(v.scoring_rules().get("panics").unwrap().last_score, Some(0.0));
        assert!(v.validation_history().is_empty());
    }

    #[test]
    fn test_spec_rules() {
        let mut v = LabValidator::new();
        v.add_scoring_rule(
            "has_model",
            0.5,
            CheckSpec::VariableExists {
                var_name: "model".to_string(),
                expected_type: Some(ValueType::Str),
            },
            "",
            true,
        );
        v.add_scoring_rule(
            "accuracy_value",
            0.5,
            CheckSpec::OutputMatch {
                var_name: "accuracy".to_string(),
                expected: json!(0.92),
                tolerance: DEFAULT_TOLERANCE,
            },
            "",
            true,
        );

        assert_eq!(v.validate_with_score("has_model", &namespace()), (true, 100.0));
        assert_eq!(v.validate_with_score("accuracy_value", &namespace()), (true, 100.0));
        assert_eq!(v.last_result(), Some(true));
    }

    #[test]
    fn test_spec_from_json() {
        let spec: CheckSpec =
            serde_json::from_value(json!({"type": "variable_exists", "var_name": "df"})).unwrap();
        assert_eq!(
            spec,
            CheckSpec::VariableExists {
                var_name: "df".to_string(),
                expected_type: None,
            }
        );

        let spec: CheckSpec =
            serde_json::from_value(json!({"type": "output_match", "var_name": "x", "expected": 3}))
                .unwrap();
        assert!(matches!(spec, CheckSpec::OutputMatch { tolerance, .. } if tolerance == DEFAULT_TOLERANCE));

        let spec: CheckSpec = serde_json::from_value(json!({"type": "dataframe"})).unwrap();
        assert_eq!(spec, CheckSpec::Unsupported);
    }

    #[test]
    fn test_rule_replaced_in_place() {
        let mut v = LabValidator::new();
        v.add_scoring_rule("a", 1.0, Checker::func(|_| Ok(true.into())), "", true);
        v.add_scoring_rule("b", 1.0, Checker::func(|_| Ok(true.into())), "", true);
        v.add_scoring_rule("a", 2.0, Checker::func(|_| Ok(false.into())), "second", true);

        assert_eq!(v.scoring_rules().names(), vec!["a", "b"]);
        assert_eq!(v.scoring_rules().get("a").unwrap().weight, 2.0);
    }
}
