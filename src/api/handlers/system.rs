//! System endpoints: health check and badge catalog.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::error::{EngineError, ErrorResponse};

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// One badge catalog row.
#[derive(Debug, Serialize, ToSchema)]
pub struct BadgeCatalogEntry {
    /// Catalog id.
    pub id: i64,
    /// Unique badge name.
    pub name: String,
    /// How to earn the badge.
    pub description: String,
    /// Badge artwork URL.
    pub image_url: Option<String>,
    /// Catalog grouping.
    pub category: String,
}

/// `GET /config/badge-catalog` — List every badge the engine can award.
///
/// # Errors
///
/// Returns [`EngineError`] on store failure.
#[utoipa::path(
    get,
    path = "/config/badge-catalog",
    tag = "System",
    summary = "List the badge catalog",
    description = "Returns every badge definition the rule set can award.",
    responses(
        (status = 200, description = "Badge catalog", body = Vec<BadgeCatalogEntry>),
        (status = 500, description = "Store failure", body = ErrorResponse),
    )
)]
pub async fn badge_catalog_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, EngineError> {
    let catalog = state.badge_service.catalog().await?;
    let entries: Vec<BadgeCatalogEntry> = catalog
        .into_iter()
        .map(|b| BadgeCatalogEntry {
            id: b.id,
            name: b.name,
            description: b.description,
            image_url: b.image_url,
            category: b.category,
        })
        .collect();
    Ok((StatusCode::OK, Json(entries)))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/badge-catalog", get(badge_catalog_handler))
}
