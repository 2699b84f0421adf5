//! REST endpoint handlers organized by resource.

pub mod activity;
pub mod badges;
pub mod evaluation;
pub mod leaderboard;
pub mod points;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(activity::routes())
        .merge(evaluation::routes())
        .merge(badges::routes())
        .merge(leaderboard::routes())
        .merge(points::routes())
}
