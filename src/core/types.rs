//! Parameter values for string-keyed node configuration.
//!
//! Typed setters on each filter are the primary API. [`Value`] exists so
//! configuration files and the CLI can address parameters by name without
//! knowing the concrete node type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A parameter value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Float(f64),
    /// One floating point number per axis
    FloatList(Vec<f64>),
    /// Boolean value
    Boolean(bool),
}

impl Value {
    /// Get the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::FloatList(_) => "float list",
            Value::Boolean(_) => "boolean",
        }
    }

    /// Interpret as a float. Integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Interpret as an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Interpret as a per-axis list. Scalars broadcast to a single entry.
    pub fn as_float_list(&self) -> Option<Vec<f64>> {
        match self {
            Value::FloatList(list) => Some(list.clone()),
            Value::Float(_) | Value::Integer(_) => self.as_float().map(|f| vec![f]),
            _ => None,
        }
    }

    /// Interpret as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::FloatList(list) => write!(f, "{:?}", list),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Value::FloatList(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(Value::Integer(3).as_float(), Some(3.0));
        assert_eq!(Value::Float(2.5).as_integer(), None);
        assert_eq!(Value::Float(2.0).as_float_list(), Some(vec![2.0]));
        assert_eq!(Value::Boolean(true).as_float(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::FloatList(vec![1.0, 2.0]).to_string(), "[1.0, 2.0]");
        assert_eq!(Value::from(4i64).type_name(), "integer");
    }
}
