//! Activity ingestion handler.

use std::str::FromStr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{ActivityResponse, RecordActivityRequest};
use crate::app_state::AppState;
use crate::domain::ActivityKind;
use crate::error::{EngineError, ErrorResponse};

/// `POST /activities` — Record one activity event.
///
/// # Errors
///
/// Returns [`EngineError`] on an unknown activity type or metadata
/// that does not match the type's declared shape.
#[utoipa::path(
    post,
    path = "/api/v1/activities",
    tag = "Activities",
    summary = "Record an activity",
    description = "Appends one immutable activity event after validating its metadata against the activity type's declared shape.",
    request_body = RecordActivityRequest,
    responses(
        (status = 201, description = "Activity recorded", body = ActivityResponse),
        (status = 400, description = "Unknown activity type or malformed metadata", body = ErrorResponse),
    )
)]
pub async fn record_activity(
    State(state): State<AppState>,
    Json(req): Json<RecordActivityRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let kind = ActivityKind::from_str(&req.activity_type)?;

    let event = state
        .activity_service
        .record(req.user_id, req.username.as_deref(), kind, req.metadata)
        .await?;

    let response = ActivityResponse {
        id: event.id,
        user_id: event.user_id,
        activity_type: event.kind.as_str().to_string(),
        created_at: event.created_at,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Activity routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/activities", post(record_activity))
}
