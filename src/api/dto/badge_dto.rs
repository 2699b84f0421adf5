//! Badge read DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::BadgeStatus;

/// One catalog badge annotated with the requesting user's state.
#[derive(Debug, Serialize, ToSchema)]
pub struct BadgeStatusDto {
    /// Catalog badge id.
    pub id: i64,
    /// Unique badge name.
    pub name: String,
    /// How to earn the badge.
    pub description: String,
    /// Badge artwork URL.
    pub image_url: Option<String>,
    /// Catalog grouping.
    pub category: String,
    /// Whether the user has earned the badge.
    pub is_earned: bool,
    /// The user's progress toward the badge, 0–100.
    pub progress: u8,
    /// When the user earned the badge, if they did.
    pub earned_at: Option<DateTime<Utc>>,
}

impl From<BadgeStatus> for BadgeStatusDto {
    fn from(status: BadgeStatus) -> Self {
        Self {
            id: status.definition.id,
            name: status.definition.name,
            description: status.definition.description,
            image_url: status.definition.image_url,
            category: status.definition.category,
            is_earned: status.is_earned,
            progress: status.progress,
            earned_at: status.earned_at,
        }
    }
}
