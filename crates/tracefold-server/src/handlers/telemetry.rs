//! PutTelemetryRecords handler.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracefold_store::TelemetryRecords;
use tracing::info;

use crate::dto::EmptyResponse;
use crate::error::AppError;
use crate::params::RequestParams;
use crate::ServerState;

/// POST /TelemetryRecords - Store daemon telemetry as received.
pub async fn put(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<EmptyResponse>, AppError> {
    let backend = state.backend(&headers)?;
    let params = RequestParams::from_body(&body);

    let records = TelemetryRecords::from_params(params.as_map())?;
    let count = records.records.len();
    backend.add_telemetry_records(records)?;

    info!(region = backend.region(), records = count, "Put telemetry records");
    Ok(Json(EmptyResponse::default()))
}
