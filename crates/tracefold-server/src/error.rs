//! Application error types and Axum response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracefold_store::{QueryError, TelemetryError};

/// Request-level errors with a stable wire code and HTTP status.
#[derive(Debug)]
pub enum AppError {
    MissingParameter(String),
    InvalidParameterValue(String),
    InvalidRegion(String),
    /// A recognised request asks for a feature with no implementation.
    Unsupported(String),
    /// The action itself has no implementation.
    NotImplemented(String),
    Internal(String),
}

impl AppError {
    /// Creates an Internal error from any error type.
    pub fn internal(e: impl std::fmt::Display) -> Self {
        AppError::Internal(e.to_string())
    }

    pub fn missing(param: &str) -> Self {
        AppError::MissingParameter(format!("Parameter {} is missing", param))
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingParameter(_) => "MissingParameter",
            AppError::InvalidParameterValue(_) => "InvalidParameterValue",
            AppError::InvalidRegion(_) => "InvalidRegion",
            AppError::Unsupported(_) | AppError::NotImplemented(_) => "NotImplemented",
            AppError::Internal(_) => "InternalFailure",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingParameter(_)
            | AppError::InvalidParameterValue(_)
            | AppError::InvalidRegion(_) => StatusCode::BAD_REQUEST,
            AppError::Unsupported(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }

    fn into_message(self) -> String {
        match self {
            AppError::MissingParameter(m)
            | AppError::InvalidParameterValue(m)
            | AppError::InvalidRegion(m)
            | AppError::Unsupported(m)
            | AppError::NotImplemented(m)
            | AppError::Internal(m) => m,
        }
    }
}

impl From<QueryError> for AppError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::Unsupported(_) => AppError::Unsupported(e.to_string()),
        }
    }
}

impl From<TelemetryError> for AppError {
    fn from(e: TelemetryError) -> Self {
        match e {
            TelemetryError::MissingRecords => AppError::MissingParameter(e.to_string()),
            TelemetryError::Invalid(_) => AppError::InvalidParameterValue(e.to_string()),
            TelemetryError::Lock => AppError::internal(e),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    #[serde(rename = "__type")]
    error_type: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_type = self.code();
        let message = self.into_message();
        (status, Json(ErrorResponse { error_type, message })).into_response()
    }
}
