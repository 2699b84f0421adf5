//! Shared DTO types used across multiple endpoints.

use serde::Deserialize;
use utoipa::IntoParams;

/// Range query parameters for the leaderboard endpoint.
///
/// 1-indexed inclusive window; `start <= end` and a maximum span of
/// 100 are enforced by the service.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct RangeParams {
    /// Ranking scope. Only `"global"` exists today.
    #[serde(default = "default_scope")]
    pub scope: String,
    /// First rank in the window (1-indexed). Defaults to 1.
    #[serde(default = "default_start")]
    pub start: u32,
    /// Last rank in the window, inclusive. Defaults to 10.
    #[serde(default = "default_end")]
    pub end: u32,
}

/// Query parameters for the badge read endpoint.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct BadgeQueryParams {
    /// When `true`, return the full catalog annotated with the user's
    /// state; otherwise only earned badges.
    #[serde(default)]
    pub show_all: bool,
}

fn default_scope() -> String {
    "global".to_string()
}

fn default_start() -> u32 {
    1
}

fn default_end() -> u32 {
    10
}
