//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All resource endpoints are mounted under `/api/v1`; system routes
//! (`/health`, `/config/badge-catalog`) live at the root.

pub mod dto;
pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}

/// OpenAPI document for the engine's REST surface.
#[cfg(feature = "swagger-ui")]
#[derive(Debug, utoipa::OpenApi)]
#[openapi(
    info(
        title = "merit-engine",
        description = "Achievement, streak, and leaderboard computation engine"
    ),
    paths(
        handlers::activity::record_activity,
        handlers::evaluation::evaluate_user,
        handlers::badges::get_badges,
        handlers::leaderboard::get_leaderboard,
        handlers::points::award_points,
        handlers::system::health_handler,
        handlers::system::badge_catalog_handler,
    )
)]
pub struct ApiDoc;

/// Swagger UI router serving the OpenAPI document at `/docs`.
#[cfg(feature = "swagger-ui")]
pub fn swagger_router() -> Router<AppState> {
    use utoipa::OpenApi;
    Router::new().merge(
        utoipa_swagger_ui::SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
}
