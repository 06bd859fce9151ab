//! JSON request parameter extraction.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::AppError;

/// Top-level keys of a JSON request body.
///
/// A body that is not a JSON object yields no parameters, so handlers
/// report the specific parameter that is missing.
#[derive(Debug, Default)]
pub struct RequestParams(Map<String, Value>);

impl RequestParams {
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice(body) {
            Ok(Value::Object(map)) => Self(map),
            _ => Self::default(),
        }
    }

    /// Non-null value of a parameter.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    pub fn require(&self, name: &str) -> Result<&Value, AppError> {
        self.get(name).ok_or_else(|| AppError::missing(name))
    }

    /// Parameter as text; non-string values keep their JSON rendering.
    pub fn text(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Boolean-like flag: only `"true"` or JSON `true` enable it.
    pub fn flag(&self, name: &str) -> bool {
        match self.get(name) {
            Some(Value::String(s)) => s == "true",
            Some(Value::Bool(b)) => *b,
            _ => false,
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Reads an integer epoch-seconds value.
///
/// Accepts JSON integers, JSON floats (truncated) and decimal strings.
pub fn epoch_seconds(value: &Value) -> Result<DateTime<Utc>, AppError> {
    let secs = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    secs.and_then(|s| DateTime::from_timestamp(s, 0)).ok_or_else(|| {
        AppError::InvalidParameterValue("start_time and end_time are not integers".into())
    })
}
