use crate::core::{utils::format_timestamp, value::Value};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use std::{cmp::Ordering, fmt};

/// The high-water mark persisted between runs of an incremental pipeline.
///
/// Serialized untagged so the state file holds plain JSON scalars. Booleans are accepted on
/// input and stored as `0`/`1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CursorValue {
    Int(i64),
    Float(f64),
    String(String),
}

impl CursorValue {
    /// Converts a dataset cell into a cursor. Missing values and nested JSON have no cursor form.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(CursorValue::Int(*v)),
            Value::Float(v) if v.is_finite() => Some(CursorValue::Float(*v)),
            Value::Float(_) => None,
            Value::Boolean(v) => Some(CursorValue::Int(i64::from(*v))),
            Value::String(v) => Some(CursorValue::String(v.clone())),
            Value::Date(v) => Some(CursorValue::String(v.format("%Y-%m-%d").to_string())),
            Value::Timestamp(v) => Some(CursorValue::String(format_timestamp(v))),
            Value::Json(v) => CursorValue::from_json(v),
            Value::Null => None,
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(v) => Some(CursorValue::Int(v)),
                None => n.as_f64().map(CursorValue::Float),
            },
            serde_json::Value::String(v) => Some(CursorValue::String(v.clone())),
            serde_json::Value::Bool(v) => Some(CursorValue::Int(i64::from(*v))),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CursorValue::Int(v) => serde_json::Value::from(*v),
            CursorValue::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            CursorValue::String(v) => serde_json::Value::String(v.clone()),
        }
    }

    pub fn compare(&self, other: &CursorValue) -> Option<Ordering> {
        use CursorValue::*;
        match (self, other) {
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Int(a), Float(b)) => (*a as f64).partial_cmp(b),
            (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)),
            (String(a), String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for CursorValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        CursorValue::from_json(&raw)
            .ok_or_else(|| D::Error::custom(format!("cursor must be a scalar, got {raw}")))
    }
}

impl fmt::Display for CursorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorValue::Int(v) => write!(f, "{v}"),
            CursorValue::Float(v) => write!(f, "{v}"),
            CursorValue::String(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for CursorValue {
    fn from(v: i64) -> Self {
        CursorValue::Int(v)
    }
}

impl From<f64> for CursorValue {
    fn from(v: f64) -> Self {
        CursorValue::Float(v)
    }
}

impl From<&str> for CursorValue {
    fn from(v: &str) -> Self {
        CursorValue::String(v.to_string())
    }
}

impl From<String> for CursorValue {
    fn from(v: String) -> Self {
        CursorValue::String(v)
    }
}
