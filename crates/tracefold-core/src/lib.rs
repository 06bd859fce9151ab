//! Core domain types for tracefold.
//!
//! This crate provides the segment model shared across the workspace:
//!
//! - [`Segment`]: one validated unit of work within a trace
//! - [`parse_segment`]: turns a raw segment document into a [`Segment`]
//! - [`SegmentError`] and [`RejectionCode`]: why a document was rejected
//!
//! # Example
//!
//! ```rust
//! use tracefold_core::{parse_segment, RejectionCode};
//!
//! let doc = r#"{"id":"70de5b6f19ff9a0a","name":"api","trace_id":"1-581cf771-a006649127e371903a2de979","start_time":1478293361.271,"end_time":1478293361.449}"#;
//! let segment = parse_segment(doc).unwrap();
//! assert_eq!(segment.name(), "api");
//!
//! let err = parse_segment(r#"{"id":"abc"}"#).unwrap_err();
//! assert_eq!(err.code(), RejectionCode::MissingParam);
//! assert_eq!(err.segment_id(), Some("abc"));
//! ```

mod segment;
mod time;

pub use segment::{parse_segment, Segment, SegmentError, TraceIdError};
pub use time::{datetime_from_epoch_seconds, epoch_seconds_now};

use serde::{Deserialize, Serialize};

/// Machine-readable reason attached to an unprocessed segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionCode {
    /// A required segment field is absent.
    MissingParam,
    /// The document is not valid JSON or a field has the wrong shape.
    #[serde(rename = "JSONFormatError")]
    JsonFormatError,
    /// Anything else that went wrong while processing the document.
    InternalFailure,
}

impl RejectionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionCode::MissingParam => "MissingParam",
            RejectionCode::JsonFormatError => "JSONFormatError",
            RejectionCode::InternalFailure => "InternalFailure",
        }
    }
}

impl std::fmt::Display for RejectionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
