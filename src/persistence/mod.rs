//! Persistence layer: the store seam plus its implementations.
//!
//! [`EngineStore`] fronts every read and write the engine performs.
//! [`postgres::PostgresStore`] is the production implementation backed
//! by `sqlx::PgPool`; [`memory::MemoryStore`] is a lock-based
//! in-process implementation with the same conflict semantics.

pub mod memory;
pub mod models;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{
    ActivityEvent, ActivityKind, BadgeDefinition, NewActivity, StreakFamily, StreakRecord,
    StreakSummary, UserBadge, UserId,
};
use crate::error::EngineError;
use models::RankedUser;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Storage seam for all engine state.
///
/// Contracts every implementation must honor:
/// - `activity_events` and `points_transactions` are append-only.
/// - At most one `user_badges` row per `(user_id, badge_id)`; a losing
///   concurrent writer observes a no-op, never an error.
/// - `mark_badge_earned` is a one-way transition reporting whether this
///   call performed it; `raise_badge_progress` only ever increases the
///   stored value and never touches an earned badge.
/// - `longest_streak` never decreases across `upsert_streak` calls.
#[async_trait]
pub trait EngineStore: Send + Sync + std::fmt::Debug {
    /// Creates the user row if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] on store failure.
    async fn ensure_user(&self, user_id: UserId, username: Option<&str>)
    -> Result<(), EngineError>;

    /// Appends one activity event and returns the stored row.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] on store failure.
    async fn append_activity(&self, activity: &NewActivity) -> Result<ActivityEvent, EngineError>;

    /// Counts a user's activities grouped by kind.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] on store failure.
    async fn activity_counts(
        &self,
        user_id: UserId,
    ) -> Result<HashMap<ActivityKind, u64>, EngineError>;

    /// Returns the timestamps of a user's activities of the given
    /// kinds, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] on store failure.
    async fn activity_timestamps(
        &self,
        user_id: UserId,
        kinds: &[ActivityKind],
    ) -> Result<Vec<DateTime<Utc>>, EngineError>;

    /// Returns the full badge catalog.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] on store failure.
    async fn badge_catalog(&self) -> Result<Vec<BadgeDefinition>, EngineError>;

    /// Returns every badge row for the user (earned or in progress).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] on store failure.
    async fn user_badges(&self, user_id: UserId) -> Result<Vec<UserBadge>, EngineError>;

    /// Counts the user's earned badges.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] on store failure.
    async fn earned_badge_count(&self, user_id: UserId) -> Result<u32, EngineError>;

    /// Transitions a badge to earned (progress 100) for the user.
    ///
    /// Idempotent upsert: returns `true` only when this call performed
    /// the transition; an already-earned badge is a no-op `false`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] on store failure.
    async fn mark_badge_earned(
        &self,
        user_id: UserId,
        badge_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, EngineError>;

    /// Raises stored progress for an unearned badge.
    ///
    /// Returns `true` only when `progress` was strictly greater than
    /// the stored value and the badge is not earned.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] on store failure.
    async fn raise_badge_progress(
        &self,
        user_id: UserId,
        badge_id: i64,
        progress: u8,
    ) -> Result<bool, EngineError>;

    /// Returns the streak record for one `(user, family)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] on store failure.
    async fn streak(
        &self,
        user_id: UserId,
        family: StreakFamily,
    ) -> Result<Option<StreakRecord>, EngineError>;

    /// Writes freshly computed streak values. `longest_streak` is
    /// floored at its stored value.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] on store failure.
    async fn upsert_streak(
        &self,
        user_id: UserId,
        family: StreakFamily,
        summary: StreakSummary,
        last_activity_date: Option<NaiveDate>,
    ) -> Result<StreakRecord, EngineError>;

    /// Appends a points transaction and updates the cached total in
    /// the same write. Returns the new total.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] on store failure.
    async fn award_points(
        &self,
        user_id: UserId,
        points: i64,
        reason: &str,
        metadata: &serde_json::Value,
    ) -> Result<i64, EngineError>;

    /// Returns users ordered by `total_points` descending, ties broken
    /// by user id ascending, sliced by `offset`/`limit`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] on store failure.
    async fn top_users_by_points(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<RankedUser>, EngineError>;
}
