//! GetTraceSummaries handler.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracefold_store::{SummaryQuery, SummaryResult};
use tracing::error;

use crate::error::AppError;
use crate::params::{epoch_seconds, RequestParams};
use crate::ServerState;

/// POST /TraceSummaries - Summaries of finished traces inside a window.
pub async fn get(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SummaryResult>, AppError> {
    let backend = state.backend(&headers)?;
    let params = RequestParams::from_body(&body);

    let start = params.require("StartTime")?;
    let end = params.require("EndTime")?;
    let filter_expression = params.text("FilterExpression");
    let sampling = params.flag("Sampling");

    let mut query = SummaryQuery::new(epoch_seconds(start)?, epoch_seconds(end)?).with_sampling(sampling);
    if let Some(expression) = filter_expression {
        query = query.with_filter_expression(expression);
    }

    let result = backend.trace_summaries(&query).map_err(|e| {
        error!("Failed to summarize traces: {}", e);
        AppError::from(e)
    })?;

    Ok(Json(result))
}
