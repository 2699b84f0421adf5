//! Domain events reflecting engine state mutations.
//!
//! Every state change publishes an [`EngineEvent`] through the
//! [`super::EventBus`]. Events back the startup logging subscriber and
//! give tests a seam to observe mutations without querying the store.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::UserId;
use super::activity::ActivityKind;
use super::streak::StreakFamily;

/// Which evaluation path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationSource {
    /// The remote authoritative evaluator answered in time.
    Remote,
    /// The in-process evaluator ran (remote failed or not configured).
    Local,
    /// The in-process evaluator ran but had to skip a non-critical
    /// persistence step; the result is well-formed but degraded.
    Fallback,
}

impl EvaluationSource {
    /// Returns the wire string for this source.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
            Self::Fallback => "fallback",
        }
    }
}

/// Domain event emitted after a state mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// An activity was appended to the log.
    ActivityRecorded {
        /// Acting user.
        user_id: UserId,
        /// Activity kind.
        kind: ActivityKind,
        /// Ingestion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A badge was newly awarded.
    BadgeAwarded {
        /// Awarded user.
        user_id: UserId,
        /// Catalog name of the badge.
        badge_name: String,
        /// Which evaluation path awarded it.
        source: EvaluationSource,
        /// Award timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A streak record was recomputed.
    StreakUpdated {
        /// Owning user.
        user_id: UserId,
        /// Streak family.
        family: StreakFamily,
        /// Current streak after the update.
        current: u32,
        /// Longest streak after the update.
        longest: u32,
        /// Update timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Points were credited or debited.
    PointsAwarded {
        /// Affected user.
        user_id: UserId,
        /// Signed point delta.
        points: i64,
        /// Running total after the transaction.
        new_total: i64,
        /// Ledger reason string.
        reason: String,
        /// Transaction timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl EngineEvent {
    /// Returns the user the event concerns.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::ActivityRecorded { user_id, .. }
            | Self::BadgeAwarded { user_id, .. }
            | Self::StreakUpdated { user_id, .. }
            | Self::PointsAwarded { user_id, .. } => *user_id,
        }
    }

    /// Returns the event type discriminator string.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::ActivityRecorded { .. } => "activity_recorded",
            Self::BadgeAwarded { .. } => "badge_awarded",
            Self::StreakUpdated { .. } => "streak_updated",
            Self::PointsAwarded { .. } => "points_awarded",
        }
    }
}
