//! Structural validation of JSON values against a [`Contract`].
//!
//! Validation walks the value and the contract together and collects every
//! violation in a single pass. Object properties that the contract does not
//! mention are accepted without inspection.

use serde::Serialize;
use serde_json::{Number, Value};

use super::contract::{Contract, NumberRules, StringRules};

/// A single place where a value does not conform to its contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Location inside the value (`""` for the root, `a.b[2]` below it).
    pub path: String,
    /// Human-readable reason.
    pub reason: String,
}

impl Violation {
    fn new(path: &str, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "<root>: {}", self.reason)
        } else {
            write!(f, "{}: {}", self.path, self.reason)
        }
    }
}

/// Outcome of one validation call; empty means the value conforms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    violations: Vec<Violation>,
}

impl ValidationResult {
    /// Returns `true` when no violations were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations in the order they were found.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes the result, returning the violations.
    #[must_use]
    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

/// Validates `value` against `contract`.
#[must_use]
pub fn validate(value: &Value, contract: &Contract) -> ValidationResult {
    let mut violations = Vec::new();
    check(value, contract, "", &mut violations);
    ValidationResult { violations }
}

fn check(value: &Value, contract: &Contract, path: &str, out: &mut Vec<Violation>) {
    match contract {
        Contract::Object {
            properties,
            required,
        } => {
            let Some(object) = value.as_object() else {
                out.push(mismatch(path, "object", value));
                return;
            };
            for name in required {
                if !object.contains_key(name) {
                    out.push(Violation::new(&member_path(path, name), "required"));
                }
            }
            for (name, sub) in properties {
                if let Some(member) = object.get(name) {
                    check(member, sub, &member_path(path, name), out);
                }
            }
        }
        Contract::Array {
            items,
            min_items,
            max_items,
        } => {
            let Some(elements) = value.as_array() else {
                out.push(mismatch(path, "array", value));
                return;
            };
            if let Some(min) = min_items {
                if elements.len() < *min {
                    out.push(Violation::new(
                        path,
                        format!("must contain at least {min} items"),
                    ));
                }
            }
            if let Some(max) = max_items {
                if elements.len() > *max {
                    out.push(Violation::new(
                        path,
                        format!("must contain at most {max} items"),
                    ));
                }
            }
            if let Some(item) = items {
                for (index, element) in elements.iter().enumerate() {
                    check(element, item, &format!("{path}[{index}]"), out);
                }
            }
        }
        Contract::String(rules) => match value.as_str() {
            Some(s) => check_string(s, rules, path, out),
            None => out.push(mismatch(path, "string", value)),
        },
        Contract::Number(rules) => match value {
            Value::Number(n) => check_bounds(n, rules, path, out),
            _ => out.push(mismatch(path, "number", value)),
        },
        Contract::Integer(rules) => match value {
            Value::Number(n) if is_whole(n) => check_bounds(n, rules, path, out),
            _ => out.push(mismatch(path, "integer", value)),
        },
        Contract::Boolean => {
            if !value.is_boolean() {
                out.push(mismatch(path, "boolean", value));
            }
        }
        Contract::Null => {
            if !value.is_null() {
                out.push(mismatch(path, "null", value));
            }
        }
        Contract::Enum(allowed) => {
            if !allowed.iter().any(|candidate| same_literal(candidate, value)) {
                let listed = allowed
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                out.push(Violation::new(path, format!("must be one of [{listed}]")));
            }
        }
    }
}

fn check_string(s: &str, rules: &StringRules, path: &str, out: &mut Vec<Violation>) {
    let length = s.chars().count();
    if let Some(min) = rules.min_length {
        if length < min {
            out.push(Violation::new(
                path,
                format!("length must be at least {min}"),
            ));
        }
    }
    if let Some(max) = rules.max_length {
        if length > max {
            out.push(Violation::new(path, format!("length must be at most {max}")));
        }
    }
    if let Some(pattern) = &rules.pattern {
        if !pattern.is_match(s) {
            out.push(Violation::new(
                path,
                format!("does not match pattern '{}'", pattern.as_str()),
            ));
        }
    }
}

fn check_bounds(n: &Number, rules: &NumberRules, path: &str, out: &mut Vec<Violation>) {
    let Some(x) = n.as_f64() else {
        return;
    };
    if let Some(min) = rules.minimum {
        if x < min {
            out.push(Violation::new(path, format!("must be >= {min}")));
        }
    }
    if let Some(max) = rules.maximum {
        if x > max {
            out.push(Violation::new(path, format!("must be <= {max}")));
        }
    }
    if let Some(min) = rules.exclusive_minimum {
        if x <= min {
            out.push(Violation::new(path, format!("must be > {min}")));
        }
    }
    if let Some(max) = rules.exclusive_maximum {
        if x >= max {
            out.push(Violation::new(path, format!("must be < {max}")));
        }
    }
}

/// Enum membership. Numbers compare by value so `1` and `1.0` agree, as
/// they do for `integer`.
#[allow(clippy::float_cmp)] // Literal equality, not arithmetic results
fn same_literal(allowed: &Value, value: &Value) -> bool {
    match (allowed, value) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        _ => allowed == value,
    }
}

fn is_whole(n: &Number) -> bool {
    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

fn mismatch(path: &str, expected: &str, value: &Value) -> Violation {
    Violation::new(path, format!("expected {expected}, got {}", kind_of(value)))
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn member_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}
