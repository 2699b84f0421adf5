//! Points award DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::UserId;

/// Request body for `POST /users/{id}/points`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AwardPointsRequest {
    /// Signed point delta; zero is rejected.
    pub points: i64,
    /// Ledger reason string (e.g. `"quiz_completed"`).
    pub reason: String,
    /// Reason-specific payload.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Response body for `POST /users/{id}/points`.
#[derive(Debug, Serialize, ToSchema)]
pub struct AwardPointsResponse {
    /// Affected user.
    #[schema(value_type = uuid::Uuid)]
    pub user_id: UserId,
    /// Running total after the transaction.
    pub new_total: i64,
}
