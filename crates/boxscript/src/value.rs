//! The closed value universe every script operand, argument, and result belongs to.
//!
//! A `Value` is a tagged sum with exactly six variants. Unlike the
//! teacher's `Value`, there is no heap arena and no reference counting: containers are
//! plain owned Rust collections, and copying a `Value` between variable cells is a real
//! (shallow-cheap, deep-correct) clone rather than an alias. Sharing only happens at the
//! level of variable *cells* (`Rc<RefCell<Value>>`, see `scope.rs`), never at the level of
//! the `Value` payload itself.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The six-variant closed value universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    /// Insertion-ordered string-keyed map. Key removal preserves survivors' order.
    Object(IndexMap<String, Value>),
}

/// The six type tags, used by type hints, `is Type` tests, and diagnostic messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ValueType {
    Any,
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl Value {
    /// The runtime type tag of this value (never `ValueType::Any` — that tag only
    /// appears on the *expected* side of a type check, never as an actual value's type).
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Boolean(_) => ValueType::Boolean,
            Self::Number(_) => ValueType::Number,
            Self::String(_) => ValueType::String,
            Self::Array(_) => ValueType::Array,
            Self::Object(_) => ValueType::Object,
        }
    }

    /// Total truthiness mapping. Never raises.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::Array(a) => !a.is_empty(),
            Self::Object(o) => !o.is_empty(),
        }
    }

    /// `IsInteger` = finite ∧ fractional part zero. Only meaningful for `Number`.
    #[must_use]
    pub fn is_integer_number(&self) -> bool {
        matches!(self, Self::Number(n) if n.is_finite() && n.fract() == 0.0)
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Deep structural equality. `null == null` unconditionally;
/// this is the one equality routine every builtin (`DeepEqual`, `Diff`) and the `==` operator
/// all share, so the two can never diverge.
pub fn deep_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => x.len() == y.len() && x.iter().zip(y).all(|(l, r)| deep_eq(l, r)),
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).is_some_and(|rv| deep_eq(v, rv)))
        }
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        deep_eq(self, other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{}", format_number(*n)),
            Self::String(s) => f.write_str(s),
            Self::Array(_) | Self::Object(_) => f.write_str(&to_json_string(self)),
        }
    }
}

/// Formats a number the way the JSON codec does: integers print without a trailing
/// `.0`, everything else uses the shortest round-trippable representation (`ryu`).
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        let mut buf = ryu::Buffer::new();
        buf.format_finite(n).trim_end_matches(".0").to_string()
    }
}

/// Serializes a `Value` to a compact JSON string (used by `Display` for containers and by
/// the `ToJson` builtin). NaN/Infinity numbers are not JSON-representable; they are emitted as JSON `null` to keep this function infallible.
#[must_use]
pub fn to_json_string(value: &Value) -> String {
    serde_json::to_string(&to_json_value(value)).unwrap_or_else(|_| "null".to_owned())
}

#[must_use]
pub fn to_json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Number::from_f64(*n).map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(a) => serde_json::Value::Array(a.iter().map(to_json_value).collect()),
        Value::Object(o) => {
            serde_json::Value::Object(o.iter().map(|(k, v)| (k.clone(), to_json_value(v))).collect())
        }
    }
}

/// Parses a JSON string into the `Value` universe. JSON's `object` map does not preserve key order across all
/// `serde_json` configurations, so we walk `serde_json::Value` into our insertion-ordered
/// `IndexMap` explicitly rather than relying on a feature flag.
pub fn from_json_str(text: &str) -> Result<Value, serde_json::Error> {
    let parsed: serde_json::Value = serde_json::from_str(text)?;
    Ok(from_json_value(&parsed))
}

#[must_use]
pub fn from_json_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(a) => Value::Array(a.iter().map(from_json_value).collect()),
        serde_json::Value::Object(o) => {
            Value::Object(o.iter().map(|(k, v)| (k.clone(), from_json_value(v))).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn truthiness_is_total() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(Value::Boolean(true).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(Value::Number(-1.0).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::String("x".to_owned()).is_truthy());
        assert!(!Value::Array(vec![]).is_truthy());
        assert!(!Value::Object(IndexMap::new()).is_truthy());
    }

    #[test]
    fn null_equals_null() {
        assert_eq!(Value::Null, Value::Null);
    }

    #[test]
    fn deep_equality_on_containers() {
        let a = Value::Array(vec![Value::Number(1.0), Value::String("x".to_owned())]);
        let b = Value::Array(vec![Value::Number(1.0), Value::String("x".to_owned())]);
        assert_eq!(a, b);

        let mut m1 = IndexMap::new();
        m1.insert("a".to_owned(), Value::Number(1.0));
        m1.insert("b".to_owned(), Value::Number(2.0));
        let mut m2 = IndexMap::new();
        m2.insert("b".to_owned(), Value::Number(2.0));
        m2.insert("a".to_owned(), Value::Number(1.0));
        // Equality ignores insertion order; only iteration order is insertion-order.
        assert_eq!(Value::Object(m1), Value::Object(m2));
    }

    #[test]
    fn clone_does_not_alias() {
        let original = Value::Array(vec![Value::Number(1.0)]);
        let mut cloned = original.clone();
        if let Value::Array(items) = &mut cloned {
            items.push(Value::Number(2.0));
        }
        assert_eq!(original, Value::Array(vec![Value::Number(1.0)]));
    }

    #[test]
    fn json_round_trip() {
        let mut obj = IndexMap::new();
        obj.insert("name".to_owned(), Value::String("Alice".to_owned()));
        obj.insert("items".to_owned(), Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]));
        let value = Value::Object(obj);
        let json = to_json_string(&value);
        let parsed = from_json_str(&json).unwrap();
        assert_eq!(value, parsed);
    }

    #[test]
    fn integer_numbers_format_without_decimal() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(-7.0), "-7");
    }
}
