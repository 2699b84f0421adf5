//! PostgreSQL implementation of the store seam.
//!
//! Conflict semantics live in the SQL: badge awarding and progress use
//! `ON CONFLICT (user_id, badge_id)` upserts so concurrent evaluations
//! for the same user cannot double-award, and streak upserts floor
//! `longest_streak` with `GREATEST`.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::EngineStore;
use super::models::RankedUser;
use crate::domain::{
    ActivityEvent, ActivityKind, BadgeDefinition, NewActivity, StreakFamily, StreakRecord,
    StreakSummary, UserBadge, UserId,
};
use crate::error::EngineError;

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn clamp_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn clamp_progress(value: i32) -> u8 {
    u8::try_from(value.clamp(0, 100)).unwrap_or(100)
}

fn parse_family(raw: &str) -> StreakFamily {
    if raw == StreakFamily::Study.as_str() {
        StreakFamily::Study
    } else {
        StreakFamily::Login
    }
}

#[async_trait]
impl EngineStore for PostgresStore {
    async fn ensure_user(
        &self,
        user_id: UserId,
        username: Option<&str>,
    ) -> Result<(), EngineError> {
        sqlx::query(
            "INSERT INTO users (id, username) \
             VALUES ($1, COALESCE($2, 'user-' || LEFT($1::text, 8))) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(user_id.as_uuid())
        .bind(username)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_activity(&self, activity: &NewActivity) -> Result<ActivityEvent, EngineError> {
        let row = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            "INSERT INTO activity_events (user_id, activity_type, metadata) \
             VALUES ($1, $2, $3) RETURNING id, created_at",
        )
        .bind(activity.user_id.as_uuid())
        .bind(activity.kind.as_str())
        .bind(&activity.metadata)
        .fetch_one(&self.pool)
        .await?;

        Ok(ActivityEvent {
            id: row.0,
            user_id: activity.user_id,
            kind: activity.kind,
            metadata: activity.metadata.clone(),
            created_at: row.1,
        })
    }

    async fn activity_counts(
        &self,
        user_id: UserId,
    ) -> Result<HashMap<ActivityKind, u64>, EngineError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT activity_type, COUNT(*) FROM activity_events \
             WHERE user_id = $1 GROUP BY activity_type",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut counts = HashMap::new();
        for (kind_str, count) in rows {
            // Rows written by older deployments with retired kinds are
            // skipped rather than failing the whole aggregation.
            if let Ok(kind) = ActivityKind::from_str(&kind_str) {
                counts.insert(kind, u64::try_from(count).unwrap_or(0));
            }
        }
        Ok(counts)
    }

    async fn activity_timestamps(
        &self,
        user_id: UserId,
        kinds: &[ActivityKind],
    ) -> Result<Vec<DateTime<Utc>>, EngineError> {
        let kind_strs: Vec<String> = kinds.iter().map(|k| k.as_str().to_string()).collect();
        let rows = sqlx::query_as::<_, (DateTime<Utc>,)>(
            "SELECT created_at FROM activity_events \
             WHERE user_id = $1 AND activity_type = ANY($2) \
             ORDER BY created_at ASC",
        )
        .bind(user_id.as_uuid())
        .bind(&kind_strs)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(ts,)| ts).collect())
    }

    async fn badge_catalog(&self) -> Result<Vec<BadgeDefinition>, EngineError> {
        let rows = sqlx::query_as::<_, (i64, String, String, Option<String>, String)>(
            "SELECT id, name, description, image_url, category FROM badges ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, description, image_url, category)| BadgeDefinition {
                id,
                name,
                description,
                image_url,
                category,
            })
            .collect())
    }

    async fn user_badges(&self, user_id: UserId) -> Result<Vec<UserBadge>, EngineError> {
        let rows = sqlx::query_as::<_, (i64, Uuid, i64, bool, i32, Option<DateTime<Utc>>, bool)>(
            "SELECT id, user_id, badge_id, is_earned, progress, earned_at, notification_shown \
             FROM user_badges WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, uid, badge_id, is_earned, progress, earned_at, notification_shown)| {
                    UserBadge {
                        id,
                        user_id: UserId::from_uuid(uid),
                        badge_id,
                        is_earned,
                        progress: clamp_progress(progress),
                        earned_at,
                        notification_shown,
                    }
                },
            )
            .collect())
    }

    async fn earned_badge_count(&self, user_id: UserId) -> Result<u32, EngineError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM user_badges WHERE user_id = $1 AND is_earned",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(u32::try_from(count).unwrap_or(0))
    }

    async fn mark_badge_earned(
        &self,
        user_id: UserId,
        badge_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        // The WHERE clause makes the update a no-op for already-earned
        // rows, so RETURNING yields a row exactly when this call
        // performed the transition.
        let row = sqlx::query_as::<_, (i64,)>(
            "INSERT INTO user_badges (user_id, badge_id, is_earned, progress, earned_at) \
             VALUES ($1, $2, TRUE, 100, $3) \
             ON CONFLICT (user_id, badge_id) DO UPDATE \
             SET is_earned = TRUE, progress = 100, \
                 earned_at = COALESCE(user_badges.earned_at, EXCLUDED.earned_at) \
             WHERE user_badges.is_earned = FALSE \
             RETURNING id",
        )
        .bind(user_id.as_uuid())
        .bind(badge_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    async fn raise_badge_progress(
        &self,
        user_id: UserId,
        badge_id: i64,
        progress: u8,
    ) -> Result<bool, EngineError> {
        let row = sqlx::query_as::<_, (i64,)>(
            "INSERT INTO user_badges (user_id, badge_id, is_earned, progress) \
             VALUES ($1, $2, FALSE, $3) \
             ON CONFLICT (user_id, badge_id) DO UPDATE \
             SET progress = EXCLUDED.progress \
             WHERE user_badges.is_earned = FALSE \
               AND user_badges.progress < EXCLUDED.progress \
             RETURNING id",
        )
        .bind(user_id.as_uuid())
        .bind(badge_id)
        .bind(i32::from(progress))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    async fn streak(
        &self,
        user_id: UserId,
        family: StreakFamily,
    ) -> Result<Option<StreakRecord>, EngineError> {
        let row = sqlx::query_as::<_, (i64, Uuid, String, i32, i32, Option<NaiveDate>)>(
            "SELECT id, user_id, family, current_streak, longest_streak, last_activity_date \
             FROM user_streaks WHERE user_id = $1 AND family = $2",
        )
        .bind(user_id.as_uuid())
        .bind(family.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, uid, fam, current, longest, last)| StreakRecord {
            id,
            user_id: UserId::from_uuid(uid),
            family: parse_family(&fam),
            current_streak: clamp_u32(current),
            longest_streak: clamp_u32(longest),
            last_activity_date: last,
        }))
    }

    async fn upsert_streak(
        &self,
        user_id: UserId,
        family: StreakFamily,
        summary: StreakSummary,
        last_activity_date: Option<NaiveDate>,
    ) -> Result<StreakRecord, EngineError> {
        let current = i32::try_from(summary.current).unwrap_or(i32::MAX);
        let longest = i32::try_from(summary.longest).unwrap_or(i32::MAX);

        let row = sqlx::query_as::<_, (i64, Uuid, String, i32, i32, Option<NaiveDate>)>(
            "INSERT INTO user_streaks \
                 (user_id, family, current_streak, longest_streak, last_activity_date) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id, family) DO UPDATE \
             SET current_streak = EXCLUDED.current_streak, \
                 longest_streak = GREATEST(user_streaks.longest_streak, EXCLUDED.longest_streak), \
                 last_activity_date = EXCLUDED.last_activity_date \
             RETURNING id, user_id, family, current_streak, longest_streak, last_activity_date",
        )
        .bind(user_id.as_uuid())
        .bind(family.as_str())
        .bind(current)
        .bind(longest)
        .bind(last_activity_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(StreakRecord {
            id: row.0,
            user_id: UserId::from_uuid(row.1),
            family: parse_family(&row.2),
            current_streak: clamp_u32(row.3),
            longest_streak: clamp_u32(row.4),
            last_activity_date: row.5,
        })
    }

    async fn award_points(
        &self,
        user_id: UserId,
        points: i64,
        reason: &str,
        metadata: &serde_json::Value,
    ) -> Result<i64, EngineError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO points_transactions (user_id, points, reason, metadata) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id.as_uuid())
        .bind(points)
        .bind(reason)
        .bind(metadata)
        .execute(&mut *tx)
        .await?;

        let (new_total,): (i64,) = sqlx::query_as(
            "UPDATE users SET total_points = total_points + $2 \
             WHERE id = $1 RETURNING total_points",
        )
        .bind(user_id.as_uuid())
        .bind(points)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(new_total)
    }

    async fn top_users_by_points(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<RankedUser>, EngineError> {
        let rows = sqlx::query_as::<_, (Uuid, String, i64)>(
            "SELECT id, username, total_points FROM users \
             ORDER BY total_points DESC, id ASC \
             LIMIT $1 OFFSET $2",
        )
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, username, total_points)| RankedUser {
                user_id: UserId::from_uuid(id),
                username,
                total_points,
            })
            .collect())
    }
}
