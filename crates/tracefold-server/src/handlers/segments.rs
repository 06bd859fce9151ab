//! PutTraceSegments handler.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::Value;
use tracefold_core::SegmentError;
use tracefold_store::RejectionRecord;
use tracing::{error, info, warn};

use crate::dto::PutTraceSegmentsResponse;
use crate::error::AppError;
use crate::params::RequestParams;
use crate::ServerState;

/// POST /TraceSegments - Ingest a batch of segment documents.
pub async fn put(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PutTraceSegmentsResponse>, AppError> {
    let backend = state.backend(&headers)?;
    let params = RequestParams::from_body(&body);

    let Value::Array(entries) = params.require("TraceSegmentDocuments")? else {
        error!("Rejected segment batch: TraceSegmentDocuments is not a list");
        return Err(AppError::InvalidParameterValue(
            "TraceSegmentDocuments must be a list of strings".into(),
        ));
    };

    let mut documents = Vec::with_capacity(entries.len());
    let mut unprocessed = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        match entry {
            Value::String(doc) => documents.push(doc.as_str()),
            other => {
                warn!(index, "Rejected non-string segment document: {}", other);
                let err = SegmentError::MalformedDocument("segment document must be a string".into());
                unprocessed.push(RejectionRecord::from(&err));
            }
        }
    }

    unprocessed.extend(backend.process_segments(&documents));

    info!(
        region = backend.region(),
        received = entries.len(),
        unprocessed = unprocessed.len(),
        "Put trace segments"
    );
    Ok(Json(PutTraceSegmentsResponse {
        unprocessed_trace_segments: unprocessed,
    }))
}
