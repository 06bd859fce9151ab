//! Batch ingestion of raw segment documents.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracefold_core::{parse_segment, RejectionCode, SegmentError};

use crate::store::TraceStore;

/// A segment document that could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RejectionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub error_code: RejectionCode,
    pub message: String,
}

impl From<&SegmentError> for RejectionRecord {
    fn from(err: &SegmentError) -> Self {
        Self {
            id: err.segment_id().map(str::to_string),
            error_code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Parses documents and commits them to a [`TraceStore`].
#[derive(Debug, Clone)]
pub struct IngestionCoordinator {
    store: Arc<TraceStore>,
}

impl IngestionCoordinator {
    pub fn new(store: Arc<TraceStore>) -> Self {
        Self { store }
    }

    /// Processes every document in order; a bad document is recorded and
    /// skipped, never aborting the batch.
    pub fn ingest<S: AsRef<str>>(&self, documents: &[S]) -> Vec<RejectionRecord> {
        let mut rejected = Vec::new();

        for (index, raw) in documents.iter().enumerate() {
            match parse_segment(raw.as_ref()) {
                Ok(segment) => self.store.put(segment),
                Err(e) => {
                    tracing::warn!(
                        index,
                        segment_id = e.segment_id().unwrap_or("-"),
                        code = %e.code(),
                        "Rejected segment: {}",
                        e
                    );
                    rejected.push(RejectionRecord::from(&e));
                }
            }
        }

        tracing::info!(
            received = documents.len(),
            rejected = rejected.len(),
            "Processed segment batch"
        );

        rejected
    }
}
