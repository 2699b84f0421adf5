//! Streak computation over calendar days.
//!
//! [`compute_streak`] is a pure function from a set of activity
//! timestamps to `{current, longest}` streak values. Timestamps are
//! collapsed to UTC calendar days first, so several activities on one
//! day count once. Login streaks and study streaks share this function
//! and differ only in their [`StreakAnchor`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// The streak family a record tracks.
///
/// Logins and study sessions are independent families sharing the same
/// record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakFamily {
    /// Consecutive days with at least one login.
    Login,
    /// Consecutive days with at least one study session.
    Study,
}

impl StreakFamily {
    /// Returns the wire string for this family.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Study => "study",
        }
    }
}

/// How the "current" streak relates to the evaluation instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakAnchor {
    /// The trailing run only counts if it reaches the given evaluation
    /// date or the day before it; otherwise `current` is 0.
    Today(NaiveDate),
    /// The trailing run counts regardless of how long ago it ended.
    Historical,
}

/// Computed streak values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakSummary {
    /// Length of the qualifying trailing run of consecutive days.
    pub current: u32,
    /// Length of the longest run of consecutive days anywhere in the
    /// history.
    pub longest: u32,
}

/// Persisted streak state for one `(user, family)` pair.
///
/// Invariant: `longest_streak >= current_streak`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakRecord {
    /// Store-assigned row id.
    pub id: i64,
    /// Owning user.
    pub user_id: UserId,
    /// Which family this record tracks.
    pub family: StreakFamily,
    /// Current streak as of the last evaluation.
    pub current_streak: u32,
    /// Longest streak ever observed.
    pub longest_streak: u32,
    /// Calendar day of the most recent qualifying activity.
    pub last_activity_date: Option<NaiveDate>,
}

/// Computes current and longest streaks from raw activity timestamps.
///
/// Timestamps are deduplicated to UTC calendar days and sorted; a gap
/// of exactly one day extends a run, a larger gap resets it. An empty
/// input yields `{0, 0}`.
#[must_use]
pub fn compute_streak(timestamps: &[DateTime<Utc>], anchor: StreakAnchor) -> StreakSummary {
    let days = unique_days(timestamps);
    let Some(last_day) = days.last().copied() else {
        return StreakSummary::default();
    };

    let mut longest: u32 = 1;
    let mut run: u32 = 1;
    let mut prev: Option<NaiveDate> = None;
    for day in &days {
        if let Some(p) = prev {
            let gap = day.signed_duration_since(p).num_days();
            run = if gap == 1 { run.saturating_add(1) } else { 1 };
            longest = longest.max(run);
        }
        prev = Some(*day);
    }

    // After the loop `run` is the length of the trailing run.
    let current = match anchor {
        StreakAnchor::Today(eval_date) => {
            let staleness = eval_date.signed_duration_since(last_day).num_days();
            if staleness <= 1 { run } else { 0 }
        }
        StreakAnchor::Historical => run,
    };

    StreakSummary { current, longest }
}

/// Collapses timestamps to sorted, deduplicated UTC calendar days.
#[must_use]
pub fn unique_days(timestamps: &[DateTime<Utc>]) -> Vec<NaiveDate> {
    let mut days: Vec<NaiveDate> = timestamps.iter().map(DateTime::date_naive).collect();
    days.sort_unstable();
    days.dedup();
    days
}
