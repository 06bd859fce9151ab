//! HTTP route handlers for the trace server.

pub mod segments;
pub mod summaries;
pub mod telemetry;

use axum::http::Uri;

use crate::error::AppError;

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// Fallback for actions that are routed but not implemented.
pub async fn not_implemented(uri: Uri) -> AppError {
    let action = uri.path().trim_start_matches('/');
    AppError::NotImplemented(format!("The {} action has not been implemented", action))
}
