//! Segment documents and their validation.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::time::datetime_from_epoch_seconds;
use crate::RejectionCode;

/// Reasons a raw segment document is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SegmentError {
    /// The document is not a JSON object.
    #[error("Bad JSON data: {0}")]
    MalformedDocument(String),

    /// A required field is absent.
    #[error("Missing {}", .field.replace("_or_", " or "))]
    MissingField {
        field: &'static str,
        segment_id: Option<String>,
    },

    /// A field is present but has the wrong JSON type.
    #[error("Invalid value for {field}")]
    InvalidField {
        field: &'static str,
        segment_id: Option<String>,
    },

    /// A timestamp cannot be represented as a date-time.
    #[error("{field} is out of range: {value}")]
    InvalidTimestamp {
        field: &'static str,
        value: f64,
        segment_id: String,
    },
}

impl SegmentError {
    /// Stable code reported back to the agent for this rejection.
    pub fn code(&self) -> RejectionCode {
        match self {
            SegmentError::MalformedDocument(_) | SegmentError::InvalidField { .. } => {
                RejectionCode::JsonFormatError
            }
            SegmentError::MissingField { .. } => RejectionCode::MissingParam,
            SegmentError::InvalidTimestamp { .. } => RejectionCode::InternalFailure,
        }
    }

    /// Id of the offending segment, if it was read before the failure.
    pub fn segment_id(&self) -> Option<&str> {
        match self {
            SegmentError::MalformedDocument(_) => None,
            SegmentError::MissingField { segment_id, .. }
            | SegmentError::InvalidField { segment_id, .. } => segment_id.as_deref(),
            SegmentError::InvalidTimestamp { segment_id, .. } => Some(segment_id),
        }
    }
}

/// Failure to decode the components of a trace id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceIdError {
    #[error("trace id {0:?} has no epoch component")]
    MissingEpoch(String),
    #[error("trace id {0:?} has a non-numeric version")]
    BadVersion(String),
    #[error("trace id {0:?} has a non-hex epoch")]
    BadEpoch(String),
}

/// One reported unit of work within a trace.
///
/// Start and end dates are derived once at construction; the segment is
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    id: String,
    trace_id: String,
    name: String,
    start_time: f64,
    end_time: Option<f64>,
    in_progress: Option<Value>,
    extension_fields: Map<String, Value>,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
}

impl Segment {
    /// Builds a segment from already-validated parts.
    pub fn new(
        id: impl Into<String>,
        trace_id: impl Into<String>,
        name: impl Into<String>,
        start_time: f64,
        end_time: Option<f64>,
    ) -> Result<Self, SegmentError> {
        let id = id.into();
        let start_date = to_date("start_time", start_time, &id)?;
        let end_date = end_time.map(|t| to_date("end_time", t, &id)).transpose()?;

        Ok(Self {
            id,
            trace_id: trace_id.into(),
            name: name.into(),
            start_time,
            end_time,
            in_progress: None,
            extension_fields: Map::new(),
            start_date,
            end_date,
        })
    }

    /// Adds an opaque extension field.
    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extension_fields.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn end_time(&self) -> Option<f64> {
        self.end_time
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }

    /// The `in_progress` value exactly as the agent sent it.
    pub fn in_progress_raw(&self) -> Option<&Value> {
        self.in_progress.as_ref()
    }

    pub fn extension_fields(&self) -> &Map<String, Value> {
        &self.extension_fields
    }

    pub fn has_extension(&self, key: &str) -> bool {
        self.extension_fields.contains_key(key)
    }

    /// Integer prefix of the trace id.
    pub fn trace_version(&self) -> Result<u32, TraceIdError> {
        let version = self.trace_id.split('-').next().unwrap_or_default();
        version
            .parse()
            .map_err(|_| TraceIdError::BadVersion(self.trace_id.clone()))
    }

    /// Creation time of the original request, decoded from the trace id's
    /// epoch-hex component.
    pub fn request_start_date(&self) -> Result<DateTime<Utc>, TraceIdError> {
        let epoch_hex = self
            .trace_id
            .split('-')
            .nth(1)
            .ok_or_else(|| TraceIdError::MissingEpoch(self.trace_id.clone()))?;
        let secs = i64::from_str_radix(epoch_hex, 16)
            .map_err(|_| TraceIdError::BadEpoch(self.trace_id.clone()))?;
        DateTime::from_timestamp(secs, 0).ok_or_else(|| TraceIdError::BadEpoch(self.trace_id.clone()))
    }
}

const REQUIRED_AFTER_ID: [&str; 3] = ["name", "trace_id", "start_time"];

/// Parses and validates one raw segment document.
///
/// Every key other than the named segment fields is kept as an opaque
/// extension field.
pub fn parse_segment(raw: &str) -> Result<Segment, SegmentError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| SegmentError::MalformedDocument(e.to_string()))?;
    let Value::Object(mut fields) = value else {
        return Err(SegmentError::MalformedDocument(
            "segment document must be a JSON object".into(),
        ));
    };

    let id = match fields.remove("id") {
        None => {
            return Err(SegmentError::MissingField {
                field: "id",
                segment_id: None,
            })
        }
        Some(Value::String(id)) => id,
        Some(_) => {
            return Err(SegmentError::InvalidField {
                field: "id",
                segment_id: None,
            })
        }
    };

    if let Some(field) = REQUIRED_AFTER_ID.into_iter().find(|f| !fields.contains_key(*f)) {
        return Err(missing(field, &id));
    }

    let has_end_time = fields.contains_key("end_time");
    let in_progress = fields.remove("in_progress");
    if !has_end_time {
        match &in_progress {
            None => return Err(missing("end_time_or_in_progress", &id)),
            // Only the literal string is checked; boolean false passes.
            Some(Value::String(s)) if s == "false" => return Err(missing("end_time", &id)),
            Some(_) => {}
        }
    }

    let name = take_string(&mut fields, "name", &id)?;
    let trace_id = take_string(&mut fields, "trace_id", &id)?;
    let start_time = match fields.remove("start_time") {
        Some(v) => as_seconds(&v, "start_time", &id)?,
        None => return Err(missing("start_time", &id)),
    };
    let end_time = match fields.remove("end_time") {
        None | Some(Value::Null) => None,
        Some(v) => Some(as_seconds(&v, "end_time", &id)?),
    };

    let mut segment = Segment::new(id, trace_id, name, start_time, end_time)?;
    segment.in_progress = in_progress;
    Ok(fields
        .into_iter()
        .fold(segment, |segment, (key, value)| segment.with_extension(key, value)))
}

fn missing(field: &'static str, id: &str) -> SegmentError {
    SegmentError::MissingField {
        field,
        segment_id: Some(id.to_string()),
    }
}

fn invalid(field: &'static str, id: &str) -> SegmentError {
    SegmentError::InvalidField {
        field,
        segment_id: Some(id.to_string()),
    }
}

fn take_string(
    fields: &mut Map<String, Value>,
    field: &'static str,
    id: &str,
) -> Result<String, SegmentError> {
    match fields.remove(field) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(invalid(field, id)),
        None => Err(missing(field, id)),
    }
}

fn as_seconds(value: &Value, field: &'static str, id: &str) -> Result<f64, SegmentError> {
    value.as_f64().ok_or_else(|| invalid(field, id))
}

fn to_date(field: &'static str, secs: f64, id: &str) -> Result<DateTime<Utc>, SegmentError> {
    datetime_from_epoch_seconds(secs).ok_or_else(|| SegmentError::InvalidTimestamp {
        field,
        value: secs,
        segment_id: id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> String {
        value.to_string()
    }

    #[test]
    fn test_parse_complete_segment() {
        let raw = doc(json!({
            "id": "70de5b6f19ff9a0a",
            "name": "example.com",
            "trace_id": "1-581cf771-a006649127e371903a2de979",
            "start_time": 1478293361.25,
            "end_time": 1478293361.5,
            "fault": true,
            "http": {"request": {"method": "GET"}}
        }));

        let segment = parse_segment(&raw).unwrap();
        assert_eq!(segment.id(), "70de5b6f19ff9a0a");
        assert_eq!(segment.name(), "example.com");
        assert_eq!(segment.end_time(), Some(1478293361.5));
        assert_eq!(segment.start_date().timestamp_subsec_millis(), 250);
        assert!(segment.has_extension("fault"));
        assert!(segment.has_extension("http"));
        assert!(!segment.has_extension("name"));
        assert_eq!(segment.extension_fields().len(), 2);
    }

    #[test]
    fn test_malformed_document() {
        let err = parse_segment("{not json").unwrap_err();
        assert_eq!(err.code(), RejectionCode::JsonFormatError);
        assert_eq!(err.segment_id(), None);

        let err = parse_segment("[1, 2]").unwrap_err();
        assert!(matches!(err, SegmentError::MalformedDocument(_)));
    }

    #[test]
    fn test_missing_id() {
        let err = parse_segment(&doc(json!({"name": "a"}))).unwrap_err();
        assert_eq!(
            err,
            SegmentError::MissingField {
                field: "id",
                segment_id: None
            }
        );
        assert_eq!(err.code(), RejectionCode::MissingParam);
    }

    #[test]
    fn test_missing_fields_after_id_carry_segment_id() {
        let err = parse_segment(r#"{"id":"abc"}"#).unwrap_err();
        assert_eq!(err.code(), RejectionCode::MissingParam);
        assert_eq!(err.segment_id(), Some("abc"));
        assert!(matches!(err, SegmentError::MissingField { field: "name", .. }));

        let err = parse_segment(&doc(json!({"id": "abc", "name": "n", "trace_id": "1-0-0"}))).unwrap_err();
        assert!(matches!(err, SegmentError::MissingField { field: "start_time", .. }));
    }

    #[test]
    fn test_requires_end_time_or_in_progress() {
        let raw = doc(json!({"id": "s1", "name": "n", "trace_id": "1-0-0", "start_time": 10}));
        let err = parse_segment(&raw).unwrap_err();
        assert!(matches!(
            err,
            SegmentError::MissingField { field: "end_time_or_in_progress", .. }
        ));
        assert_eq!(err.to_string(), "Missing end_time or in_progress");
    }

    #[test]
    fn test_in_progress_string_false_requires_end_time() {
        let raw = doc(json!({
            "id": "s1", "name": "n", "trace_id": "1-0-0", "start_time": 10, "in_progress": "false"
        }));
        let err = parse_segment(&raw).unwrap_err();
        assert!(matches!(err, SegmentError::MissingField { field: "end_time", .. }));
    }

    #[test]
    fn test_in_progress_bool_false_is_accepted() {
        let raw = doc(json!({
            "id": "s1", "name": "n", "trace_id": "1-0-0", "start_time": 10, "in_progress": false
        }));
        let segment = parse_segment(&raw).unwrap();
        assert_eq!(segment.end_time(), None);
        assert_eq!(segment.in_progress_raw(), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_null_end_time_is_absent() {
        let raw = doc(json!({
            "id": "s1", "name": "n", "trace_id": "1-0-0", "start_time": 10, "end_time": null
        }));
        let segment = parse_segment(&raw).unwrap();
        assert_eq!(segment.end_time(), None);
        assert_eq!(segment.end_date(), None);
    }

    #[test]
    fn test_wrong_field_types() {
        let raw = doc(json!({"id": "s1", "name": "n", "trace_id": "1-0-0", "start_time": "ten", "end_time": 11}));
        let err = parse_segment(&raw).unwrap_err();
        assert_eq!(err.code(), RejectionCode::JsonFormatError);
        assert_eq!(err.segment_id(), Some("s1"));

        let err = parse_segment(&doc(json!({"id": 7}))).unwrap_err();
        assert!(matches!(err, SegmentError::InvalidField { field: "id", segment_id: None }));
    }

    #[test]
    fn test_out_of_range_timestamp() {
        let raw = doc(json!({"id": "s1", "name": "n", "trace_id": "1-0-0", "start_time": 1e300, "end_time": 1}));
        let err = parse_segment(&raw).unwrap_err();
        assert_eq!(err.code(), RejectionCode::InternalFailure);
        assert_eq!(err.segment_id(), Some("s1"));
    }

    #[test]
    fn test_trace_id_components() {
        let segment = Segment::new("s1", "1-581cf771-a006649127e371903a2de979", "n", 10.0, None).unwrap();
        assert_eq!(segment.trace_version().unwrap(), 1);
        assert_eq!(segment.request_start_date().unwrap().timestamp(), 0x581cf771);

        let segment = Segment::new("s2", "garbage", "n", 10.0, None).unwrap();
        assert!(matches!(segment.trace_version(), Err(TraceIdError::BadVersion(_))));
        assert!(matches!(segment.request_start_date(), Err(TraceIdError::MissingEpoch(_))));
    }
}
