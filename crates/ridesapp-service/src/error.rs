//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ridesapp_core::RideError;
use ridesapp_store::StoreError;
use serde::Serialize;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but insufficient permissions.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - duplicate resource or invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The ride does not have enough free seats.
    #[error("not enough seats: requested={requested}, remaining={remaining}")]
    CapacityExceeded {
        /// Seats asked for.
        requested: i32,
        /// Seats still free.
        remaining: i32,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::CapacityExceeded {
                requested,
                remaining,
            } => (
                StatusCode::CONFLICT,
                "capacity_exceeded",
                self.to_string(),
                Some(serde_json::json!({
                    "requested": requested,
                    "remaining": remaining
                })),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<RideError> for ApiError {
    fn from(err: RideError) -> Self {
        match err {
            RideError::NotFound { .. } => Self::NotFound(err.to_string()),
            RideError::CapacityExceeded {
                requested,
                remaining,
            } => Self::CapacityExceeded {
                requested,
                remaining,
            },
            RideError::Validation(msg) => Self::BadRequest(msg),
            RideError::InvalidId(e) => Self::BadRequest(e.to_string()),
            RideError::InvalidTransition { .. } => Self::Conflict(err.to_string()),
            RideError::Storage(msg) => Self::Internal(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { .. } => Self::Conflict(err.to_string()),
            StoreError::Conflict(msg) => Self::Internal(msg),
            other => RideError::from(other).into(),
        }
    }
}
