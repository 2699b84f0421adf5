//! Leaderboard read DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::UserId;
use crate::service::leaderboard::LeaderboardEntry;

/// One leaderboard row.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardEntryDto {
    /// User identifier (fabricated for synthetic rows).
    #[schema(value_type = uuid::Uuid)]
    pub user_id: UserId,
    /// Display name.
    pub username: String,
    /// Points shown for this rank.
    pub points: i64,
    /// 1-indexed rank.
    pub rank: u32,
    /// Marks fabricated entries.
    pub synthetic: bool,
}

/// Response body for `GET /leaderboard`.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    /// Entries for the requested window, in rank order.
    pub data: Vec<LeaderboardEntryDto>,
}

impl From<Vec<LeaderboardEntry>> for LeaderboardResponse {
    fn from(entries: Vec<LeaderboardEntry>) -> Self {
        Self {
            data: entries
                .into_iter()
                .map(|e| LeaderboardEntryDto {
                    user_id: e.user_id,
                    username: e.username,
                    points: e.points,
                    rank: e.rank,
                    synthetic: e.synthetic,
                })
                .collect(),
        }
    }
}
