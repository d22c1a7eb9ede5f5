//! Neutral Property Values
//!
//! `TigerStyle`: One explicit variant per representable type, no schema
//! checking at this layer. The schema is supplied at runtime, so property
//! access is capability-typed rather than compile-time checked.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A property value on an entity.
///
/// Numbers are uniformly `f64`; range criteria compare against numeric
/// values only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// UTF-8 string
    Str(String),
    /// Numeric value
    Num(f64),
    /// Boolean value
    Bool(bool),
    /// Timestamp
    Date(DateTime<Utc>),
    /// Explicit null (distinct from an absent property)
    Null,
}

impl Value {
    /// Convert to a `serde_json` value.
    ///
    /// Dates render as RFC 3339 strings.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Numeric view of the value, if it is a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// String view of the value, if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Total order used by the in-memory drivers when sorting results.
    ///
    /// Values of different types order by type rank; `NaN` compares equal
    /// to keep the order total.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        fn rank(value: &Value) -> u8 {
            match value {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Num(_) => 2,
                Value::Str(_) => 3,
                Value::Date(_) => 4,
            }
        }

        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Num(a), Self::Num(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Num(value)
    }
}

impl From<i64> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Num(value as f64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}
