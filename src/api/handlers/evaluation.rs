//! Evaluation trigger handler.

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{EvaluateRequest, EvaluationResponse};
use crate::app_state::AppState;
use crate::domain::{ActivityKind, UserId};
use crate::error::{EngineError, ErrorResponse};

/// `POST /users/:id/evaluations` — Evaluate all badge rules for a user.
///
/// Prefers the remote authoritative evaluator; falls back to the
/// in-process evaluator on timeout or error. The response's `source`
/// field says which path answered.
///
/// # Errors
///
/// Returns [`EngineError`] on an unknown activity type or when the
/// local evaluator cannot reach the store.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/evaluations",
    tag = "Evaluations",
    summary = "Run a badge evaluation",
    description = "Evaluates every badge rule for the user against their activity history. Awards are idempotent; repeated calls with no new activity award nothing further.",
    params(
        ("id" = uuid::Uuid, Path, description = "User UUID"),
    ),
    request_body = EvaluateRequest,
    responses(
        (status = 200, description = "Evaluation result", body = EvaluationResponse),
        (status = 400, description = "Unknown activity type", body = ErrorResponse),
        (status = 500, description = "Local evaluation could not reach the store", body = ErrorResponse),
    )
)]
pub async fn evaluate_user(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<EvaluateRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let user_id = UserId::from_uuid(id);
    let kind = ActivityKind::from_str(&req.activity_type)?;

    let outcome = state
        .evaluation_service
        .check_all(user_id, kind, &req.metadata)
        .await?;

    Ok(Json(EvaluationResponse::from(outcome)))
}

/// Evaluation routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/users/{id}/evaluations", post(evaluate_user))
}
