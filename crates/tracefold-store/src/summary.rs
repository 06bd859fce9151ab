//! Time-windowed trace summary queries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracefold_core::epoch_seconds_now;

use crate::store::{TraceAggregate, TraceStore};

/// Errors from summary queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("{0} are not implemented")]
    Unsupported(&'static str),
}

/// Parameters of a summary query.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryQuery {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub filter_expression: Option<String>,
    /// Accepted for compatibility; does not affect results.
    pub sampling: bool,
}

impl SummaryQuery {
    pub fn new(window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> Self {
        Self {
            window_start,
            window_end,
            filter_expression: None,
            sampling: false,
        }
    }

    pub fn with_filter_expression(mut self, expression: impl Into<String>) -> Self {
        self.filter_expression = Some(expression.into());
        self
    }

    pub fn with_sampling(mut self, sampling: bool) -> Self {
        self.sampling = sampling;
        self
    }
}

/// Summary of one finished trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TraceSummary {
    pub id: String,
    /// Whole seconds between window start and end, truncated.
    pub duration: i64,
    pub has_error: bool,
    pub has_fault: bool,
    pub has_throttle: bool,
    pub annotations: Map<String, Value>,
    pub http: Map<String, Value>,
    pub service_ids: Vec<Value>,
    pub users: Map<String, Value>,
    pub is_partial: bool,
    pub response_time: i64,
}

impl TraceSummary {
    fn from_aggregate(
        trace_id: &str,
        aggregate: &TraceAggregate,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: trace_id.to_string(),
            duration: (end - start).num_seconds(),
            has_error: aggregate.any_segment_has("error"),
            has_fault: aggregate.any_segment_has("fault"),
            has_throttle: aggregate.any_segment_has("throttle"),
            annotations: Map::new(),
            http: Map::new(),
            service_ids: Vec::new(),
            users: Map::new(),
            is_partial: false,
            response_time: 1,
        }
    }
}

/// Envelope returned by [`SummaryQueryEngine::summarize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SummaryResult {
    pub approximate_time: i64,
    pub traces_processed_count: usize,
    pub trace_summaries: Vec<TraceSummary>,
}

/// Scans a [`TraceStore`] for finished traces inside a time window.
#[derive(Debug, Clone)]
pub struct SummaryQueryEngine {
    store: Arc<TraceStore>,
}

impl SummaryQueryEngine {
    pub fn new(store: Arc<TraceStore>) -> Self {
        Self { store }
    }

    /// Summarizes every finished trace strictly inside the query window.
    pub fn summarize(&self, query: &SummaryQuery) -> Result<SummaryResult, QueryError> {
        if query
            .filter_expression
            .as_deref()
            .is_some_and(|expr| !expr.is_empty())
        {
            return Err(QueryError::Unsupported("filter expressions"));
        }

        let mut trace_summaries = Vec::new();
        self.store.for_each_aggregate(|trace_id, aggregate| {
            let Some((start, end)) = aggregate.window() else {
                return;
            };
            // Both bounds are exclusive.
            if query.window_start < start && end < query.window_end {
                trace_summaries.push(TraceSummary::from_aggregate(trace_id, aggregate, start, end));
            }
        });

        tracing::info!(
            window_start = %query.window_start,
            window_end = %query.window_end,
            sampling = query.sampling,
            matched = trace_summaries.len(),
            "Summarized traces"
        );

        Ok(SummaryResult {
            approximate_time: epoch_seconds_now(),
            traces_processed_count: trace_summaries.len(),
            trace_summaries,
        })
    }
}
