//! Value checks over the student namespace.
//!
//! Every check shows its outcome on the display surface, records it as the
//! validator's last result and returns whether it passed.

use regex::Regex;
use serde_json::Value;
use std::path::Path;

use crate::namespace::{Binding, Namespace, ValueType};
use crate::validator::LabValidator;

/// Default tolerance for numeric comparisons.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Relative tolerance used for element-wise array comparison.
const RELATIVE_TOLERANCE: f64 = 1e-5;

/// Failing items listed in a list check's details.
const MAX_LISTED_FAILURES: usize = 3;

fn numbers(values: &[Value]) -> Option<Vec<f64>> {
    values.iter().map(Value::as_f64).collect()
}

/// Compare two values: numbers within `tolerance`, numeric arrays
/// element-wise, anything else by equality.
pub fn values_match(actual: &Value, expected: &Value, tolerance: f64) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(e)) => match (a.as_f64(), e.as_f64()) {
            (Some(a), Some(e)) => (a - e).abs() < tolerance,
            _ => a == e,
        },
        (Value::Array(a), Value::Array(e)) => match (numbers(a), numbers(e)) {
            (Some(a), Some(e)) => {
                a.len() == e.len()
                    && a
                        .iter()
                        .zip(&e)
                        .all(|(a, e)| (a - e).abs() <= tolerance + RELATIVE_TOLERANCE * e.abs())
            }
            _ => actual == expected,
        },
        _ => actual == expected,
    }
}

impl LabValidator {
    /// Check that `name` is bound, optionally to a value of `expected_type`.
    pub fn validate_variable_exists(
        &mut self,
        name: &str,
        namespace: &Namespace,
        expected_type: Option<ValueType>,
    ) -> bool {
        let Some(binding) = namespace.get(name) else {
            return self.report(
                false,
                &format!("Variable '{name}' not found"),
                "Make sure you've run the cell that creates this variable.",
            );
        };

        if let Some(expected) = expected_type {
            let actual = binding.value_type();
            if !expected.accepts(actual) {
                return self.report(
                    false,
                    &format!("Type mismatch for '{name}'"),
                    &format!("Expected {expected}, got {actual}"),
                );
            }
        }
        self.report(true, &format!("Variable '{name}' validated successfully"), "")
    }

    /// Check that `name` is a function taking at least `expected_params`.
    pub fn validate_function_exists(
        &mut self,
        name: &str,
        namespace: &Namespace,
        expected_params: &[&str],
    ) -> bool {
        let params = match namespace.get(name) {
            None => {
                return self.report(
                    false,
                    &format!("Function '{name}' not found"),
                    "Make sure you've defined this function.",
                )
            }
            Some(Binding::Value(v)) => {
                return self.report(
                    false,
                    &format!("'{name}' is not callable"),
                    &format!("Found {} instead of a function.", ValueType::of(v)),
                )
            }
            Some(Binding::Function { params }) => params,
        };

        let missing: Vec<&str> = expected_params
            .iter()
            .copied()
            .filter(|p| !params.iter().any(|actual| actual.as_str() == *p))
            .collect();
        if !missing.is_empty() {
            return self.report(
                false,
                &format!("Missing parameters in '{name}'"),
                &format!("Expected: {expected_params:?}, Missing: {missing:?}"),
            );
        }
        self.report(true, &format!("Function '{name}' validated successfully"), "")
    }

    /// Check `actual` against `expected` with [`values_match`].
    pub fn validate_output(&mut self, actual: &Value, expected: &Value, tolerance: f64) -> bool {
        let matched = values_match(actual, expected, tolerance);
        self.output_outcome(matched, actual, expected)
    }

    /// Check `actual` against `expected` with a custom comparison.
    pub fn validate_output_with<F>(&mut self, actual: &Value, expected: &Value, compare: F) -> bool
    where
        F: FnOnce(&Value, &Value) -> bool,
    {
        let matched = compare(actual, expected);
        self.output_outcome(matched, actual, expected)
    }

    fn output_outcome(&mut self, matched: bool, actual: &Value, expected: &Value) -> bool {
        if matched {
            self.report(true, "Output matches expected value", "")
        } else {
            self.report(
                false,
                "Output does not match expected value",
                &format!("Expected: {expected}, Got: {actual}"),
            )
        }
    }

    /// Check that an embedding has `expected_dim` entries.
    ///
    /// Arrays are measured by length; objects with a `shape` array by its
    /// last dimension.
    pub fn check_embedding_shape(&mut self, embedding: &Value, expected_dim: usize) -> bool {
        let actual_dim = match embedding {
            Value::Array(items) => Some(items.len()),
            Value::Object(map) => map
                .get("shape")
                .and_then(Value::as_array)
                .and_then(|shape| shape.last())
                .and_then(Value::as_u64)
                .map(|d| d as usize),
            _ => None,
        };
        let Some(actual_dim) = actual_dim else {
            return self.report(
                false,
                "Invalid embedding format",
                "Embedding should be a list or array",
            );
        };

        if actual_dim != expected_dim {
            return self.report(
                false,
                "Embedding dimension mismatch",
                &format!("Expected {expected_dim}, got {actual_dim}"),
            );
        }
        self.report(true, &format!("Embedding shape is correct: {actual_dim}"), "")
    }

    /// Check that a path exists.
    pub fn validate_file_exists(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        if path.exists() {
            self.report(true, &format!("File exists: {}", path.display()), "")
        } else {
            self.report(
                false,
                &format!("File not found: {}", path.display()),
                "Make sure the file path is correct",
            )
        }
    }

    /// Check that `text` matches `pattern` at its start.
    pub fn validate_string_pattern(&mut self, text: &str, pattern: &str, description: &str) -> bool {
        let regex = match Regex::new(&format!("^(?:{pattern})")) {
            Ok(regex) => regex,
            Err(e) => return self.report(false, &format!("Invalid {description}"), &e.to_string()),
        };
        if regex.is_match(text) {
            self.report(true, &format!("Text matches {description}"), "")
        } else {
            self.report(
                false,
                &format!("Text does not match {description}"),
                &format!("Pattern: {pattern}"),
            )
        }
    }

    /// Check that `value` lies within the given bounds (inclusive).
    ///
    /// NaN and infinities are never in range.
    pub fn validate_range(&mut self, value: f64, min: Option<f64>, max: Option<f64>) -> bool {
        if !value.is_finite() {
            return self.report(
                false,
                &format!("Value {value} is not a finite number"),
                "Expected a finite value",
            );
        }
        if let Some(min) = min.filter(|min| value < *min) {
            return self.report(
                false,
                &format!("Value {value} is below minimum"),
                &format!("Minimum allowed: {min}"),
            );
        }
        if let Some(max) = max.filter(|max| value > *max) {
            return self.report(
                false,
                &format!("Value {value} is above maximum"),
                &format!("Maximum allowed: {max}"),
            );
        }
        self.report(true, &format!("Value {value} is within valid range"), "")
    }

    /// Check every item of a list with `predicate`.
    ///
    /// A predicate error counts as a failing item. At most three failures
    /// are listed in the details.
    pub fn validate_list_items<F>(&mut self, list: &Value, predicate: F, description: &str) -> bool
    where
        F: Fn(&Value) -> anyhow::Result<bool>,
    {
        let Value::Array(items) = list else {
            return self.report(
                false,
                "Not a list",
                &format!("Got {} instead", ValueType::of(list)),
            );
        };

        let failures: Vec<String> = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| match predicate(item) {
                Ok(true) => None,
                Ok(false) => Some(format!("({i}, {item})")),
                Err(e) => Some(format!("({i}, Error: {e})")),
            })
            .collect();

        if !failures.is_empty() {
            let shown = failures[..failures.len().min(MAX_LISTED_FAILURES)].join(", ");
            let more = if failures.len() > MAX_LISTED_FAILURES { "..." } else { "" };
            return self.report(
                false,
                &format!("List {description} failed"),
                &format!("Failed items: [{shown}]{more}"),
            );
        }
        self.report(
            true,
            &format!("All {} items passed {description}", items.len()),
            "",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labtrack_core::MemoryDisplay;
    use serde_json::json;
    use std::sync::Arc;

    fn validator() -> (LabValidator, Arc<MemoryDisplay>) {
        let display = Arc::new(MemoryDisplay::new());
        (LabValidator::new().with_display(display.clone()), display)
    }

    #[test]
    fn test_variable_exists() {
        let (mut v, display) = validator();
        let mut ns = Namespace::new();
        ns.set("df_rows", 10).set("ratio", 0.5);

        assert!(v.validate_variable_exists("df_rows", &ns, None));
        assert!(v.validate_variable_exists("ratio", &ns, Some(ValueType::Number)));
        assert!(!v.validate_variable_exists("df_rows", &ns, Some(ValueType::Str)));
        assert!(display.contains("fail Type mismatch for 'df_rows'"));
        assert!(!v.validate_variable_exists("missing", &ns, None));
        assert!(display.contains("fail Variable 'missing' not found"));
    }

    #[test]
    fn test_function_exists() {
        let (mut v, display) = validator();
        let mut ns = Namespace::new();
        ns.define("clean", ["df", "inplace"]).set("value", 3);

        assert!(v.validate_function_exists("clean", &ns, &["df"]));
        assert!(!v.validate_function_exists("clean", &ns, &["df", "axis"]));
        assert!(display.contains("fail Missing parameters in 'clean' - Expected: [\"df\", \"axis\"], Missing: [\"axis\"]"));
        assert!(!v.validate_function_exists("value", &ns, &[]));
        assert!(display.contains("fail 'value' is not callable"));
        assert!(!v.validate_function_exists("nope", &ns, &[]));
    }

    #[test]
    fn test_output_tolerance() {
        let (mut v, _) = validator();
        assert!(v.validate_output(&json!(0.1 + 0.2), &json!(0.3), DEFAULT_TOLERANCE));
        assert!(v.validate_output(&json!(3), &json!(3.0), DEFAULT_TOLERANCE));
        assert!(!v.validate_output(&json!(3.1), &json!(3.0), DEFAULT_TOLERANCE));
        assert!(v.validate_output(&json!("abc"), &json!("abc"), DEFAULT_TOLERANCE));
        assert!(!v.validate_output(&json!({"a": 1}), &json!({"a": 2}), DEFAULT_TOLERANCE));
    }

    #[test]
    fn test_output_arrays() {
        assert!(values_match(&json!([1.0, 2.0000001]), &json!([1, 2]), DEFAULT_TOLERANCE));
        assert!(!values_match(&json!([1.0, 2.0]), &json!([1.0]), DEFAULT_TOLERANCE));
        assert!(values_match(&json!(["a", 1]), &json!(["a", 1]), DEFAULT_TOLERANCE));
    }

    #[test]
    fn test_output_with_comparator() {
        let (mut v, display) = validator();
        let same_len = |a: &Value, e: &Value| a.as_str().map(str::len) == e.as_str().map(str::len);
        assert!(v.validate_output_with(&json!("abc"), &json!("xyz"), same_len));
        assert!(!v.validate_output_with(&json!("ab"), &json!("xyz"), same_len));
        assert!(display.contains("fail Output does not match expected value"));
    }

    #[test]
    fn test_embedding_shape() {
        let (mut v, display) = validator();
        assert!(v.check_embedding_shape(&json!([0.1, 0.2, 0.3]), 3));
        assert!(v.check_embedding_shape(&json!({"shape": [10, 384]}), 384));
        assert!(!v.check_embedding_shape(&json!([0.1]), 3));
        assert!(display.contains("fail Embedding dimension mismatch - Expected 3, got 1"));
        assert!(!v.check_embedding_shape(&json!(42), 3));
        assert!(display.contains("fail Invalid embedding format"));
    }

    #[test]
    fn test_file_exists() {
        let (mut v, _) = validator();
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("data.csv");
        assert!(!v.validate_file_exists(&file));
        std::fs::write(&file, "a,b\n").unwrap();
        assert!(v.validate_file_exists(&file));
    }

    #[test]
    fn test_string_pattern_matches_at_start() {
        let (mut v, display) = validator();
        assert!(v.validate_string_pattern("user@example.com", r"\w+@\w+\.com", "email"));
        assert!(!v.validate_string_pattern("mail: user@example.com", r"\w+@", "email"));
        assert!(v.validate_string_pattern("abc-123", "abc", "prefix"));
        assert!(!v.validate_string_pattern("x", "(", "broken"));
        assert!(display.contains("fail Invalid broken"));
    }

    #[test]
    fn test_range() {
        let (mut v, display) = validator();
        assert!(v.validate_range(0.5, Some(0.0), Some(1.0)));
        assert!(v.validate_range(1.0, Some(0.0), Some(1.0)));
        assert!(!v.validate_range(-1.0, Some(0.0), None));
        assert!(display.contains("fail Value -1 is below minimum"));
        assert!(!v.validate_range(2.0, None, Some(1.0)));
        assert!(v.validate_range(1e9, None, None));
    }

    #[test]
    fn test_range_rejects_non_finite() {
        let (mut v, display) = validator();
        assert!(!v.validate_range(f64::NAN, Some(0.0), Some(1.0)));
        assert!(display.contains("fail Value NaN is not a finite number"));
        assert!(!v.validate_range(f64::INFINITY, None, None));
        assert!(!v.validate_range(f64::NEG_INFINITY, Some(0.0), None));
        assert_eq!(v.last_result(), Some(false));
    }

    #[test]
    fn test_list_items() {
        let (mut v, display) = validator();
        let positive = |x: &Value| -> anyhow::Result<bool> { Ok(x.as_f64().map_or(false, |n| n > 0.0)) };

        assert!(v.validate_list_items(&json!([1, 2, 3]), positive, "positivity"));
        assert!(display.contains("pass All 3 items passed positivity"));

        assert!(!v.validate_list_items(&json!([-1, -2, 3, -4, -5]), positive, "positivity"));
        assert!(display.contains(
            "fail List positivity failed - Failed items: [(0, -1), (1, -2), (3, -4)]..."
        ));

        assert!(!v.validate_list_items(&json!("not a list"), positive, "positivity"));
        assert!(display.contains("fail Not a list"));
    }

    #[test]
    fn test_list_item_errors_count_as_failures() {
        let display = Arc::new(MemoryDisplay::new());
        let mut v = LabValidator::new().with_display(display);
        let strict = |x: &Value| -> anyhow::Result<bool> {
            match x.as_i64() {
                Some(n) => Ok(n % 2 == 0),
                None => anyhow::bail!("not an integer"),
            }
        };
        assert!(!v.validate_list_items(&json!([2, "x"]), strict, "evenness"));
        assert_eq!(v.last_result(), Some(false));
    }
}
