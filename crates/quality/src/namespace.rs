//! Student namespace - the named values a validator inspects.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// What a name is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// A plain value
    Value(Value),
    /// A callable with these parameter names
    Function {
        /// Parameter names in declaration order
        params: Vec<String>,
    },
}

impl Binding {
    /// The kind of thing bound.
    pub fn value_type(&self) -> ValueType {
        match self {
            Binding::Value(v) => ValueType::of(v),
            Binding::Function { .. } => ValueType::Function,
        }
    }
}

/// Named bindings handed to checks and scoring rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    bindings: BTreeMap<String, Binding>,
}

impl Namespace {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a namespace from a JSON object. Anything else gives an empty one.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => Self::new(),
        }
    }

    /// Bind a value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.bindings.insert(name.into(), Binding::Value(value.into()));
        self
    }

    /// Bind a function with its parameter names.
    pub fn define<I, S>(&mut self, name: impl Into<String>, params: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bindings.insert(
            name.into(),
            Binding::Function {
                params: params.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    /// Whether `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// The binding for `name`.
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// The value bound to `name`, if it is a value.
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.bindings.get(name) {
            Some(Binding::Value(v)) => Some(v),
            _ => None,
        }
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl FromIterator<(String, Value)> for Namespace {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            bindings: iter
                .into_iter()
                .map(|(k, v)| (k, Binding::Value(v)))
                .collect(),
        }
    }
}

/// Type names used by type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// JSON null
    Null,
    /// Boolean
    Bool,
    /// Integer
    Int,
    /// Non-integer number
    Float,
    /// Any number
    Number,
    /// String
    Str,
    /// Array
    List,
    /// Object
    Dict,
    /// Callable
    Function,
}

impl ValueType {
    /// Most specific type of a value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Number(n) if n.is_f64() => ValueType::Float,
            Value::Number(_) => ValueType::Int,
            Value::String(_) => ValueType::Str,
            Value::Array(_) => ValueType::List,
            Value::Object(_) => ValueType::Dict,
        }
    }

    /// Whether something of type `actual` counts as this type.
    pub fn accepts(&self, actual: ValueType) -> bool {
        match self {
            ValueType::Number => matches!(actual, ValueType::Int | ValueType::Float),
            expected => *expected == actual,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Number => "number",
            ValueType::Str => "str",
            ValueType::List => "list",
            ValueType::Dict => "dict",
            ValueType::Function => "function",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bindings() {
        let mut ns = Namespace::new();
        ns.set("rows", 120).define("clean", ["df", "inplace"]);

        assert!(ns.contains("rows"));
        assert_eq!(ns.value("rows"), Some(&json!(120)));
        assert_eq!(ns.value("clean"), None);
        assert_eq!(ns.get("clean").unwrap().value_type(), ValueType::Function);
        assert_eq!(ns.len(), 2);
    }

    #[test]
    fn test_from_json() {
        let ns = Namespace::from_json(json!({"a": 1.5, "b": "text"}));
        assert_eq!(ns.get("a").unwrap().value_type(), ValueType::Float);
        assert_eq!(ns.get("b").unwrap().value_type(), ValueType::Str);
        assert!(Namespace::from_json(json!([1, 2])).is_empty());
    }

    #[test]
    fn test_number_accepts_int_and_float() {
        assert!(ValueType::Number.accepts(ValueType::Int));
        assert!(ValueType::Number.accepts(ValueType::Float));
        assert!(!ValueType::Float.accepts(ValueType::Int));
        assert_eq!(ValueType::List.to_string(), "list");
    }
}
