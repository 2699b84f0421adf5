//! Points award handler.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{AwardPointsRequest, AwardPointsResponse};
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::{EngineError, ErrorResponse};

/// `POST /users/:id/points` — Record a points transaction.
///
/// # Errors
///
/// Returns [`EngineError`] on a zero-point award, a missing reason, or
/// store failure.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/points",
    tag = "Points",
    summary = "Award points",
    description = "Appends a signed points transaction to the ledger and returns the user's new running total.",
    params(
        ("id" = uuid::Uuid, Path, description = "User UUID"),
    ),
    request_body = AwardPointsRequest,
    responses(
        (status = 200, description = "New running total", body = AwardPointsResponse),
        (status = 400, description = "Zero points or missing reason", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse),
    )
)]
pub async fn award_points(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<AwardPointsRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let user_id = UserId::from_uuid(id);
    let new_total = state
        .points_service
        .award(user_id, req.points, &req.reason, &req.metadata)
        .await?;

    Ok(Json(AwardPointsResponse { user_id, new_total }))
}

/// Points routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/users/{id}/points", post(award_points))
}
