use serde::Serialize;
use tracefold_store::RejectionRecord;

// === HTTP DTOs ===

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutTraceSegmentsResponse {
    pub unprocessed_trace_segments: Vec<RejectionRecord>,
}

#[derive(Debug, Default, Serialize)]
pub struct EmptyResponse {}
