//! Column values and constraint maps.

use std::fmt;

use hark_core::error::{HarkError, Result};

/// A value that can be stored in, or compared against, a record column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Text(String),
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Null => f.write_str("null"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
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

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Only integers, strings and null are valid constraint values.
impl TryFrom<serde_json::Value> for Value {
    type Error = HarkError;

    fn try_from(v: serde_json::Value) -> Result<Self> {
        match v {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::String(s) => Ok(Value::Text(s)),
            serde_json::Value::Number(n) => n.as_i64().map(Value::Integer).ok_or_else(|| {
                HarkError::InvalidQueryConstraint(format!("Unsupported value: {}", n))
            }),
            other => Err(HarkError::InvalidQueryConstraint(format!(
                "Unsupported value: {}",
                other
            ))),
        }
    }
}

/// A conjunction of equality / `IS NULL` predicates over record fields.
///
/// Terms keep insertion order; setting a field twice replaces the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraints {
    terms: Vec<(String, Value)>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// `field = value`, or `field IS NULL` when `value` is null.
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.terms.iter_mut().find(|(name, _)| name == field) {
            Some(term) => term.1 = value,
            None => self.terms.push((field.to_string(), value)),
        }
        self
    }

    pub fn is_null(self, field: &str) -> Self {
        self.eq(field, Value::Null)
    }

    /// Build constraints from a JSON object, rejecting any value that is not
    /// an integer, a string or null.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let map = match value {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(HarkError::InvalidQueryConstraint(format!(
                    "constraints must be an object, got: {}",
                    other
                )))
            }
        };

        map.into_iter()
            .try_fold(Self::new(), |acc, (field, v)| Ok(acc.eq(&field, Value::try_from(v)?)))
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.terms.iter().map(|(field, value)| (field.as_str(), value))
    }
}

impl fmt::Display for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(field, value)| format!("{}={}", field, value))
            .collect();
        f.write_str(&parts.join(", "))
    }
}
