//! Activity ingestion DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::UserId;

/// Request body for `POST /activities`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordActivityRequest {
    /// Acting user.
    #[schema(value_type = uuid::Uuid)]
    pub user_id: UserId,
    /// Display name used only when the user row is created lazily.
    #[serde(default)]
    pub username: Option<String>,
    /// Activity kind discriminator (snake_case, e.g.
    /// `"document_uploaded"`).
    pub activity_type: String,
    /// Kind-specific metadata; validated against the kind's shape.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Response body for `POST /activities` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityResponse {
    /// Store-assigned event id.
    pub id: i64,
    /// Acting user, echoed from the request.
    #[schema(value_type = uuid::Uuid)]
    pub user_id: UserId,
    /// Activity kind, echoed from the request.
    pub activity_type: String,
    /// Server-side ingestion timestamp.
    pub created_at: DateTime<Utc>,
}
