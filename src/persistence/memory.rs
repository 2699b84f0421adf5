//! In-memory implementation of the store seam.
//!
//! A `RwLock`-guarded map store with the same conflict semantics as
//! the PostgreSQL implementation: one badge row per `(user, badge)`,
//! one-way earn transitions, monotonic progress, floored longest
//! streaks. Backs the test suite and any embedded deployment that has
//! no database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use super::EngineStore;
use super::models::{RankedUser, StoredPointsTransaction};
use crate::domain::{
    ActivityEvent, ActivityKind, BadgeDefinition, NewActivity, StreakFamily, StreakRecord,
    StreakSummary, UserBadge, UserId,
};
use crate::error::EngineError;

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<UserId, RankedUser>,
    activities: Vec<ActivityEvent>,
    catalog: Vec<BadgeDefinition>,
    user_badges: HashMap<(UserId, i64), UserBadge>,
    streaks: HashMap<(UserId, StreakFamily), StreakRecord>,
    transactions: Vec<StoredPointsTransaction>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process store over `RwLock`-guarded maps.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store with no badge catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            offline: AtomicBool::new(false),
        }
    }

    /// Creates a store pre-loaded with the standard badge catalog,
    /// matching the names in [`crate::domain::BadgeRuleSet::standard`].
    #[must_use]
    pub fn with_standard_catalog() -> Self {
        Self {
            state: RwLock::new(MemoryState {
                catalog: standard_catalog(),
                ..MemoryState::default()
            }),
            offline: AtomicBool::new(false),
        }
    }

    /// Simulates an unreachable backing store: while set, every call
    /// fails with [`EngineError::Persistence`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), EngineError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(EngineError::Persistence("store offline".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// The standard catalog as definition rows, ids in seed order.
#[must_use]
pub fn standard_catalog() -> Vec<BadgeDefinition> {
    let names: [(&str, &str); 18] = [
        ("First Steps", "engagement"),
        ("Document Guru", "content"),
        ("Document Pro", "content"),
        ("Audio Ace", "content"),
        ("Summary Scholar", "content"),
        ("Curious Mind", "engagement"),
        ("Assignment Hero", "engagement"),
        ("Quiz Master", "engagement"),
        ("Goal Getter", "engagement"),
        ("Streak Starter", "streak"),
        ("Daily Learner", "streak"),
        ("Streak Legend", "streak"),
        ("Study Spark", "streak"),
        ("Study Marathon", "streak"),
        ("Scholar Supreme", "streak"),
        ("Badge Collector", "collection"),
        ("Super Collector", "collection"),
        ("Ultimate Learner", "collection"),
    ];
    names
        .iter()
        .enumerate()
        .map(|(i, (name, category))| BadgeDefinition {
            id: i64::try_from(i).unwrap_or(0) + 1,
            name: (*name).to_string(),
            description: String::new(),
            image_url: None,
            category: (*category).to_string(),
        })
        .collect()
}

#[async_trait]
impl EngineStore for MemoryStore {
    async fn ensure_user(
        &self,
        user_id: UserId,
        username: Option<&str>,
    ) -> Result<(), EngineError> {
        self.check_online()?;
        let mut state = self.state.write().await;
        state.users.entry(user_id).or_insert_with(|| RankedUser {
            user_id,
            username: username.map_or_else(
                || {
                    let full = user_id.to_string();
                    let short: String = full.chars().take(8).collect();
                    format!("user-{short}")
                },
                ToString::to_string,
            ),
            total_points: 0,
        });
        Ok(())
    }

    async fn append_activity(&self, activity: &NewActivity) -> Result<ActivityEvent, EngineError> {
        self.check_online()?;
        let mut state = self.state.write().await;
        let id = state.next_id();
        let event = ActivityEvent {
            id,
            user_id: activity.user_id,
            kind: activity.kind,
            metadata: activity.metadata.clone(),
            created_at: Utc::now(),
        };
        state.activities.push(event.clone());
        Ok(event)
    }

    async fn activity_counts(
        &self,
        user_id: UserId,
    ) -> Result<HashMap<ActivityKind, u64>, EngineError> {
        self.check_online()?;
        let state = self.state.read().await;
        let mut counts = HashMap::new();
        for event in state.activities.iter().filter(|e| e.user_id == user_id) {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn activity_timestamps(
        &self,
        user_id: UserId,
        kinds: &[ActivityKind],
    ) -> Result<Vec<DateTime<Utc>>, EngineError> {
        self.check_online()?;
        let state = self.state.read().await;
        let mut stamps: Vec<DateTime<Utc>> = state
            .activities
            .iter()
            .filter(|e| e.user_id == user_id && kinds.contains(&e.kind))
            .map(|e| e.created_at)
            .collect();
        stamps.sort_unstable();
        Ok(stamps)
    }

    async fn badge_catalog(&self) -> Result<Vec<BadgeDefinition>, EngineError> {
        self.check_online()?;
        Ok(self.state.read().await.catalog.clone())
    }

    async fn user_badges(&self, user_id: UserId) -> Result<Vec<UserBadge>, EngineError> {
        self.check_online()?;
        let state = self.state.read().await;
        Ok(state
            .user_badges
            .values()
            .filter(|ub| ub.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn earned_badge_count(&self, user_id: UserId) -> Result<u32, EngineError> {
        self.check_online()?;
        let state = self.state.read().await;
        let count = state
            .user_badges
            .values()
            .filter(|ub| ub.user_id == user_id && ub.is_earned)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn mark_badge_earned(
        &self,
        user_id: UserId,
        badge_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        self.check_online()?;
        let mut state = self.state.write().await;
        if let Some(existing) = state.user_badges.get_mut(&(user_id, badge_id)) {
            if existing.is_earned {
                return Ok(false);
            }
            existing.is_earned = true;
            existing.progress = 100;
            existing.earned_at.get_or_insert(now);
            return Ok(true);
        }
        let id = state.next_id();
        state.user_badges.insert(
            (user_id, badge_id),
            UserBadge {
                id,
                user_id,
                badge_id,
                is_earned: true,
                progress: 100,
                earned_at: Some(now),
                notification_shown: false,
            },
        );
        Ok(true)
    }

    async fn raise_badge_progress(
        &self,
        user_id: UserId,
        badge_id: i64,
        progress: u8,
    ) -> Result<bool, EngineError> {
        self.check_online()?;
        let mut state = self.state.write().await;
        if let Some(existing) = state.user_badges.get_mut(&(user_id, badge_id)) {
            if existing.is_earned || existing.progress >= progress {
                return Ok(false);
            }
            existing.progress = progress;
            return Ok(true);
        }
        let id = state.next_id();
        state.user_badges.insert(
            (user_id, badge_id),
            UserBadge {
                id,
                user_id,
                badge_id,
                is_earned: false,
                progress,
                earned_at: None,
                notification_shown: false,
            },
        );
        Ok(true)
    }

    async fn streak(
        &self,
        user_id: UserId,
        family: StreakFamily,
    ) -> Result<Option<StreakRecord>, EngineError> {
        self.check_online()?;
        let state = self.state.read().await;
        Ok(state.streaks.get(&(user_id, family)).cloned())
    }

    async fn upsert_streak(
        &self,
        user_id: UserId,
        family: StreakFamily,
        summary: StreakSummary,
        last_activity_date: Option<NaiveDate>,
    ) -> Result<StreakRecord, EngineError> {
        self.check_online()?;
        let mut state = self.state.write().await;
        if let Some(existing) = state.streaks.get_mut(&(user_id, family)) {
            existing.current_streak = summary.current;
            existing.longest_streak = existing.longest_streak.max(summary.longest);
            existing.last_activity_date = last_activity_date;
            return Ok(existing.clone());
        }
        let id = state.next_id();
        let record = StreakRecord {
            id,
            user_id,
            family,
            current_streak: summary.current,
            longest_streak: summary.longest,
            last_activity_date,
        };
        state.streaks.insert((user_id, family), record.clone());
        Ok(record)
    }

    async fn award_points(
        &self,
        user_id: UserId,
        points: i64,
        reason: &str,
        metadata: &serde_json::Value,
    ) -> Result<i64, EngineError> {
        self.check_online()?;
        let mut state = self.state.write().await;
        let id = state.next_id();
        state.transactions.push(StoredPointsTransaction {
            id,
            user_id,
            points,
            reason: reason.to_string(),
            metadata: metadata.clone(),
            created_at: Utc::now(),
        });
        let entry = state.users.entry(user_id).or_insert_with(|| RankedUser {
            user_id,
            username: format!("user-{}", {
                let full = user_id.to_string();
                full.chars().take(8).collect::<String>()
            }),
            total_points: 0,
        });
        entry.total_points = entry.total_points.saturating_add(points);
        Ok(entry.total_points)
    }

    async fn top_users_by_points(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<RankedUser>, EngineError> {
        self.check_online()?;
        let state = self.state.read().await;
        let mut users: Vec<RankedUser> = state.users.values().cloned().collect();
        users.sort_by(|a, b| {
            b.total_points
                .cmp(&a.total_points)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(users
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}
