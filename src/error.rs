//! Engine error types with HTTP status code mapping.
//!
//! [`EngineError`] is the central error type for the engine. Each
//! variant maps to a specific HTTP status code and structured JSON
//! error response. Callers never see a bare exception: failure paths
//! resolve to either a fallback result or one of these typed errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid request: missing content_id",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges below).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category          | HTTP Status                |
/// |-----------|-------------------|----------------------------|
/// | 1000–1999 | Validation        | 400 Bad Request            |
/// | 2000–2999 | Not Found         | 404 Not Found              |
/// | 3000–3999 | Server/Dependency | 500 / 502 / 503            |
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Request validation failed at the ingestion boundary.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unknown activity type string.
    #[error("invalid activity type: {0}")]
    InvalidActivityKind(String),

    /// A leaderboard range was malformed (start > end, zero start,
    /// oversized window).
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Badge name not present in the catalog. Only surfaced by admin
    /// reads; evaluation treats unknown names as a zero baseline.
    #[error("badge not found: {0}")]
    BadgeNotFound(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The remote evaluator timed out or answered with an error.
    /// Recovered internally by local fallback; only surfaced when no
    /// fallback applies.
    #[error("remote evaluator unavailable: {0}")]
    RemoteUnavailable(String),

    /// Leaderboard backing query failed while synthetic fallback is
    /// disabled.
    #[error("leaderboard unavailable")]
    LeaderboardUnavailable,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidActivityKind(_) => 1002,
            Self::InvalidRange(_) => 1003,
            Self::BadgeNotFound(_) => 2001,
            Self::Persistence(_) => 3001,
            Self::RemoteUnavailable(_) => 3002,
            Self::LeaderboardUnavailable => 3003,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidActivityKind(_) | Self::InvalidRange(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::BadgeNotFound(_) => StatusCode::NOT_FOUND,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RemoteUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::LeaderboardUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
