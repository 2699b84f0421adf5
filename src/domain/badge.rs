//! Badge catalog and per-user badge state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// A badge definition from the static catalog.
///
/// Created and edited by operators (seeded by migration); read-only to
/// the engine. `name` is unique and is the key rules are written
/// against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeDefinition {
    /// Store-assigned row id.
    pub id: i64,
    /// Unique display name (e.g. `"Document Guru"`).
    pub name: String,
    /// How to earn the badge.
    pub description: String,
    /// Optional badge artwork URL.
    pub image_url: Option<String>,
    /// Grouping string (`"content"`, `"streak"`, `"engagement"`,
    /// `"collection"`).
    pub category: String,
}

/// Per-user badge state.
///
/// At most one row per `(user_id, badge_id)` pair, enforced by the
/// store. `is_earned` is a one-way transition and `progress` never
/// decreases once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBadge {
    /// Store-assigned row id.
    pub id: i64,
    /// Owning user.
    pub user_id: UserId,
    /// Badge this row tracks.
    pub badge_id: i64,
    /// Whether the badge has been earned.
    pub is_earned: bool,
    /// Progress toward earning, 0–100. 100 only when earned.
    pub progress: u8,
    /// When the badge was earned, if it was.
    pub earned_at: Option<DateTime<Utc>>,
    /// Whether the user has been shown the award. Stored for UI-layer
    /// collaborators; the engine never delivers notifications.
    pub notification_shown: bool,
}

/// A rule evaluation verdict for one badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeDecision {
    /// Catalog name of the badge.
    pub badge_name: String,
    /// Whether the badge's criterion is met.
    pub should_earn: bool,
    /// Progress toward the criterion, 0–99 when unmet, 100 when met.
    pub progress_percent: u8,
}

/// Outcome of applying one [`BadgeDecision`].
///
/// `awarded` is `true` only when this application newly earned the
/// badge; an already-earned badge reports `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AwardResult {
    /// Catalog name of the badge.
    pub badge_name: String,
    /// Whether the badge was newly awarded by this application.
    pub awarded: bool,
}

/// A catalog badge annotated with one user's state.
///
/// The shape returned by the badge read interface: earned-only when
/// `show_all` is off, the whole catalog otherwise.
#[derive(Debug, Clone, Serialize)]
pub struct BadgeStatus {
    /// Badge definition fields.
    #[serde(flatten)]
    pub definition: BadgeDefinition,
    /// Whether this user has earned the badge.
    pub is_earned: bool,
    /// This user's progress toward the badge, 0–100.
    pub progress: u8,
    /// When this user earned the badge, if they did.
    pub earned_at: Option<DateTime<Utc>>,
}

impl BadgeStatus {
    /// Combines a definition with an optional per-user row. A missing
    /// row is the zero baseline, not an error.
    #[must_use]
    pub fn from_parts(definition: BadgeDefinition, user_badge: Option<&UserBadge>) -> Self {
        match user_badge {
            Some(ub) => Self {
                definition,
                is_earned: ub.is_earned,
                progress: ub.progress,
                earned_at: ub.earned_at,
            },
            None => Self {
                definition,
                is_earned: false,
                progress: 0,
                earned_at: None,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn definition(name: &str) -> BadgeDefinition {
        BadgeDefinition {
            id: 1,
            name: name.to_string(),
            description: "desc".to_string(),
            image_url: None,
            category: "content".to_string(),
        }
    }

    #[test]
    fn missing_row_is_zero_baseline() {
        let status = BadgeStatus::from_parts(definition("Document Guru"), None);
        assert!(!status.is_earned);
        assert_eq!(status.progress, 0);
        assert!(status.earned_at.is_none());
    }

    #[test]
    fn row_state_is_carried_over() {
        let earned_at = Utc::now();
        let row = UserBadge {
            id: 7,
            user_id: UserId::new(),
            badge_id: 1,
            is_earned: true,
            progress: 100,
            earned_at: Some(earned_at),
            notification_shown: false,
        };
        let status = BadgeStatus::from_parts(definition("Document Guru"), Some(&row));
        assert!(status.is_earned);
        assert_eq!(status.progress, 100);
        assert_eq!(status.earned_at, Some(earned_at));
    }
}
