//! Native value trees exchanged with application handlers.
//!
//! Decode produces a [`Value`] tree from a wire document; encode consumes
//! one. The shape is deliberately open: a struct maps field names to
//! scalars, nested structs, or lists, mirroring whatever the schema
//! describes.

use chrono::{DateTime, FixedOffset, NaiveDate};
use std::collections::HashMap;

/// A node in the native value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit null, distinct from field absence at the wire level.
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    /// Time of day; the date component is pinned to 1970-01-01.
    Time(DateTime<FixedOffset>),
    Struct(HashMap<String, Value>),
    List(Vec<Value>),
}

impl Value {
    /// Build a struct value from field/value pairs.
    pub fn record<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Struct(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Field lookup; `None` unless `self` is a struct containing `field`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self {
            Value::Struct(map) => map.get(field),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::UInt(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            Value::UInt(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Truthiness contract used by the `token`/`boolean` converters: null,
    /// zero and the empty string are false, everything else is true.
    pub(crate) fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::UInt(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Text(s) => !s.is_empty(),
            _ => true,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_get() {
        let v = Value::record([("x", Value::from(1i64)), ("y", Value::Null)]);
        assert_eq!(v.get("x").and_then(Value::as_i64), Some(1));
        assert!(v.get("y").unwrap().is_null());
        assert!(v.get("z").is_none());
    }

    #[test]
    fn test_get_on_scalar_is_none() {
        assert!(Value::from("plain").get("field").is_none());
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from(0i64).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from(false).is_truthy());
        assert!(Value::from("false").is_truthy());
        assert!(Value::from(0.5).is_truthy());
        assert!(Value::List(vec![]).is_truthy());
    }
}
