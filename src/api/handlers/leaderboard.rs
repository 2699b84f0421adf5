//! Leaderboard read handler.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{LeaderboardResponse, RangeParams};
use crate::app_state::AppState;
use crate::error::{EngineError, ErrorResponse};

/// `GET /leaderboard` — Ranked point totals for a window.
///
/// # Errors
///
/// Returns [`EngineError::InvalidRange`] on a malformed window, or
/// [`EngineError::LeaderboardUnavailable`] when the store is down and
/// synthetic fallback is disabled.
#[utoipa::path(
    get,
    path = "/api/v1/leaderboard",
    tag = "Leaderboard",
    summary = "Read the leaderboard",
    description = "Returns the requested rank window ordered by points descending. When the backing query fails or comes back short, deterministic synthetic entries (marked `synthetic: true`) fill the window so the board is never empty.",
    params(RangeParams),
    responses(
        (status = 200, description = "Leaderboard window", body = LeaderboardResponse),
        (status = 400, description = "Malformed range", body = ErrorResponse),
        (status = 503, description = "Store down and synthetic fallback disabled", body = ErrorResponse),
    )
)]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<impl IntoResponse, EngineError> {
    if params.scope != "global" {
        return Err(EngineError::InvalidRequest(format!(
            "unknown leaderboard scope: {}",
            params.scope
        )));
    }
    let entries = state
        .leaderboard_service
        .rank(params.start, params.end)
        .await?;
    Ok(Json(LeaderboardResponse::from(entries)))
}

/// Leaderboard routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/leaderboard", get(get_leaderboard))
}
