//! Badge read handler.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{BadgeQueryParams, BadgeStatusDto};
use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::{EngineError, ErrorResponse};

/// `GET /users/:id/badges` — List a user's badges.
///
/// # Errors
///
/// Returns [`EngineError`] on store failure.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/badges",
    tag = "Badges",
    summary = "List a user's badges",
    description = "Returns the user's earned badges, or with `show_all=true` the full catalog annotated with earned state and progress.",
    params(
        ("id" = uuid::Uuid, Path, description = "User UUID"),
        BadgeQueryParams,
    ),
    responses(
        (status = 200, description = "Badge list", body = Vec<BadgeStatusDto>),
        (status = 500, description = "Store failure", body = ErrorResponse),
    )
)]
pub async fn get_badges(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Query(params): Query<BadgeQueryParams>,
) -> Result<impl IntoResponse, EngineError> {
    let user_id = UserId::from_uuid(id);
    let statuses = state
        .badge_service
        .get_badges(user_id, params.show_all)
        .await?;

    let data: Vec<BadgeStatusDto> = statuses.into_iter().map(BadgeStatusDto::from).collect();
    Ok(Json(data))
}

/// Badge routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/users/{id}/badges", get(get_badges))
}
