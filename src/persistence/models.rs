//! Store-level row types that have no richer domain counterpart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::UserId;

/// A user row projected for ranking: identity plus cached point total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedUser {
    /// User identifier.
    pub user_id: UserId,
    /// Display name.
    pub username: String,
    /// Cached sum of the user's points transactions.
    pub total_points: i64,
}

/// A stored points ledger row.
///
/// Append-only; the authoritative total is the sum over a user's
/// transactions, cached on `users.total_points` by the same write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPointsTransaction {
    /// Auto-increment row ID.
    pub id: i64,
    /// Affected user.
    pub user_id: UserId,
    /// Signed point delta.
    pub points: i64,
    /// Why the points moved (e.g. `"quiz_completed"`).
    pub reason: String,
    /// Reason-specific payload.
    pub metadata: serde_json::Value,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}
