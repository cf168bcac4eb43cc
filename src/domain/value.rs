//! Dynamically typed scope values.
//!
//! Strategy files mix numbers, strings and booleans freely, and comparisons
//! between them follow loose-equality rules:
//!
//! - Same kinds compare directly.
//! - `Null` and `Undefined` are loosely equal to each other and nothing else.
//! - Booleans are coerced to `0`/`1` before comparing with other kinds.
//! - Number vs string coerces the string to a number (`""` → 0, junk → NaN).
//! - Ordering compares two strings lexicographically, everything else numerically.

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    #[default]
    Undefined,
}

impl Value {
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric coercion. `Undefined` and unparsable strings become NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Bool(true) => 1.0,
            Value::Bool(false) => 0.0,
            Value::Null => 0.0,
            Value::Undefined => f64::NAN,
            Value::Str(s) => parse_numeric(s),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Null | Value::Undefined => false,
        }
    }

    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Value::Bool(_), _) | (_, Value::Bool(_)) => {
                Value::Number(self.to_number()).loose_eq(&Value::Number(other.to_number()))
            }
            _ => self.to_number() == other.to_number(),
        }
    }

    /// Strict equality: same kind and same payload. NaN is never equal.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self == other,
        }
    }

    /// Relational ordering; `None` when either side is not comparable (NaN).
    pub fn loose_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => self.to_number().partial_cmp(&other.to_number()),
        }
    }

}

/// String to number the way a JS `Number()` call reads it: surrounding
/// whitespace ignored, empty is zero, `Infinity` only in that spelling,
/// `0x`/`0o`/`0b` integer prefixes, anything else unparsable is NaN.
fn parse_numeric(s: &str) -> f64 {
    let trimmed = s.trim();
    match trimmed {
        "" => return 0.0,
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        let digits = trimmed
            .strip_prefix(prefix)
            .or_else(|| trimmed.strip_prefix(&prefix.to_uppercase()));
        if let Some(digits) = digits {
            return u64::from_str_radix(digits, radix)
                .map(|n| n as f64)
                .unwrap_or(f64::NAN);
        }
    }

    let decimal = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !decimal {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Undefined => write!(f, "undefined"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// JSON literals from strategy files. Arrays and objects have no scalar
/// meaning and map to `Undefined`.
impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Value::Undefined,
        }
    }
}

/// Reports render `Null` and `Undefined` alike as JSON `null`.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Null | Value::Undefined => serializer.serialize_unit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_as_plain_json() {
        let values = vec![Value::from(1.5), Value::from("V"), Value::Bool(true), Value::Undefined];
        assert_eq!(serde_json::to_value(&values).unwrap(), json!([1.5, "V", true, null]));
    }

    #[test]
    fn loose_eq_number_and_numeric_string() {
        assert!(Value::from(1.0).loose_eq(&Value::from("1")));
        assert!(Value::from("1.5").loose_eq(&Value::from(1.5)));
        assert!(!Value::from(1.0).loose_eq(&Value::from("x")));
    }

    #[test]
    fn loose_eq_bool_coerces_to_number() {
        assert!(Value::from(true).loose_eq(&Value::from(1.0)));
        assert!(Value::from(false).loose_eq(&Value::from(0.0)));
        assert!(Value::from(true).loose_eq(&Value::from("1")));
        assert!(!Value::from(true).loose_eq(&Value::from("true")));
    }

    #[test]
    fn loose_eq_nullish() {
        assert!(Value::Null.loose_eq(&Value::Undefined));
        assert!(!Value::Null.loose_eq(&Value::from(0.0)));
        assert!(!Value::Undefined.loose_eq(&Value::from(false)));
    }

    #[test]
    fn numeric_strings_follow_js_number() {
        assert_eq!(Value::from(" 2.5 ").to_number(), 2.5);
        assert_eq!(Value::from("").to_number(), 0.0);
        assert_eq!(Value::from("Infinity").to_number(), f64::INFINITY);
        assert_eq!(Value::from("-Infinity").to_number(), f64::NEG_INFINITY);
        assert_eq!(Value::from("0x1F").to_number(), 31.0);
        assert_eq!(Value::from("1e3").to_number(), 1000.0);
        for text in ["inf", "infinity", "-inf", "nan", "NaN", "INFINITY", "1_000"] {
            assert!(Value::from(text).to_number().is_nan(), "{text}");
        }
        assert!(!Value::from("inf").loose_eq(&Value::from(f64::INFINITY)));
        assert!(Value::from("Infinity").loose_eq(&Value::from(f64::INFINITY)));
    }

    #[test]
    fn loose_eq_nan_never_equal() {
        let nan = Value::from(f64::NAN);
        assert!(!nan.loose_eq(&nan));
    }

    #[test]
    fn strict_eq_requires_same_kind() {
        assert!(!Value::from(1.0).strict_eq(&Value::from("1")));
        assert!(Value::from("a").strict_eq(&Value::from("a")));
    }

    #[test]
    fn ordering_strings_lexicographic() {
        assert_eq!(
            Value::from("abc").loose_cmp(&Value::from("abd")),
            Some(Ordering::Less)
        );
        // "10" < "9" as strings
        assert_eq!(
            Value::from("10").loose_cmp(&Value::from("9")),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn ordering_mixed_is_numeric() {
        assert_eq!(
            Value::from("10").loose_cmp(&Value::from(9.0)),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Undefined.loose_cmp(&Value::from(1.0)), None);
        assert_eq!(
            Value::Null.loose_cmp(&Value::from(0.0)),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn truthiness() {
        assert!(Value::from("true").truthy());
        assert!(Value::from("false").truthy());
        assert!(!Value::from("").truthy());
        assert!(!Value::from(0.0).truthy());
        assert!(!Value::from(f64::NAN).truthy());
        assert!(!Value::Undefined.truthy());
    }

    #[test]
    fn from_json_literals() {
        assert_eq!(Value::from(&json!(3)), Value::Number(3.0));
        assert_eq!(Value::from(&json!("V")), Value::Str("V".into()));
        assert_eq!(Value::from(&json!(true)), Value::Bool(true));
        assert_eq!(Value::from(&json!(null)), Value::Null);
        assert_eq!(Value::from(&json!([1, 2])), Value::Undefined);
    }
}
