//! Declarative badge rules and their evaluation.
//!
//! A [`BadgeRuleSet`] is an immutable, loaded-once table mapping
//! aggregated [`UserMetrics`] to [`BadgeDecision`]s. Evaluation is a
//! pure function: no I/O, fully deterministic, independently testable
//! from persistence. The same table drives the local evaluator and is
//! what the remote evaluator is expected to agree with.

use std::collections::HashMap;

use serde::Serialize;

use super::activity::ActivityKind;
use super::badge::BadgeDecision;
use super::streak::StreakSummary;

/// Aggregated per-user metrics that rules are written against.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserMetrics {
    /// Activity counts by kind, over the whole history.
    pub counts: HashMap<ActivityKind, u64>,
    /// Login streak, anchored to the evaluation day.
    pub login_streak: StreakSummary,
    /// Study streak, unanchored.
    pub study_streak: StreakSummary,
    /// Number of badges the user has earned so far.
    pub earned_badge_count: u32,
    /// Number of badges in the catalog.
    pub total_badge_count: u32,
}

impl UserMetrics {
    /// Returns the count for one activity kind, zero when absent.
    #[must_use]
    pub fn count(&self, kind: ActivityKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
}

/// The criterion half of a badge rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Total occurrences of one activity kind reach a threshold.
    ActivityCount {
        /// Which activity is counted.
        kind: ActivityKind,
        /// Occurrences required.
        threshold: u64,
    },
    /// The anchored login streak reaches a day count.
    LoginStreak {
        /// Consecutive days required.
        days: u32,
    },
    /// The study streak's longest run reaches a day count.
    StudyStreak {
        /// Consecutive days required.
        days: u32,
    },
    /// The earned-badge count reaches a threshold (collector rules).
    BadgeCount {
        /// Earned badges required.
        threshold: u32,
    },
    /// Every other badge in the catalog has been earned. The badge
    /// carrying this rule is excluded from its own denominator.
    AllOtherBadges,
}

impl RuleKind {
    /// Collector meta-rules depend on the earned-badge count, which is
    /// itself an output of awarding. The awarder re-runs these in a
    /// second pass after any new award.
    #[must_use]
    pub const fn is_meta(&self) -> bool {
        matches!(self, Self::BadgeCount { .. } | Self::AllOtherBadges)
    }
}

/// One badge's earn criterion.
#[derive(Debug, Clone)]
pub struct BadgeRule {
    /// Catalog name of the badge this rule awards.
    pub badge_name: &'static str,
    /// The criterion.
    pub kind: RuleKind,
}

impl BadgeRule {
    const fn new(badge_name: &'static str, kind: RuleKind) -> Self {
        Self { badge_name, kind }
    }

    /// Evaluates this rule against the given metrics.
    #[must_use]
    pub fn decide(&self, metrics: &UserMetrics) -> BadgeDecision {
        let (value, threshold) = match self.kind {
            RuleKind::ActivityCount { kind, threshold } => (metrics.count(kind), threshold),
            RuleKind::LoginStreak { days } => {
                (u64::from(metrics.login_streak.current), u64::from(days))
            }
            RuleKind::StudyStreak { days } => {
                (u64::from(metrics.study_streak.longest), u64::from(days))
            }
            RuleKind::BadgeCount { threshold } => {
                (u64::from(metrics.earned_badge_count), u64::from(threshold))
            }
            RuleKind::AllOtherBadges => (
                u64::from(metrics.earned_badge_count),
                u64::from(metrics.total_badge_count.saturating_sub(1)),
            ),
        };

        let should_earn = threshold > 0 && value >= threshold;
        let progress_percent = if should_earn {
            100
        } else {
            threshold_progress(value, threshold)
        };

        BadgeDecision {
            badge_name: self.badge_name.to_string(),
            should_earn,
            progress_percent,
        }
    }
}

/// Progress toward an unmet threshold: `floor(value / threshold * 100)`
/// clamped to `[0, 99]`. 100 is reserved for earned.
#[must_use]
fn threshold_progress(value: u64, threshold: u64) -> u8 {
    if threshold == 0 {
        return 0;
    }
    let percent = value.saturating_mul(100) / threshold;
    #[allow(clippy::cast_possible_truncation)]
    {
        percent.min(99) as u8
    }
}

/// Immutable table of badge rules.
///
/// Built once at startup ([`BadgeRuleSet::standard`]) and passed into
/// the evaluation orchestrator — deliberately a value, not ambient
/// global state, so alternate catalogs can be swapped in for tests.
#[derive(Debug, Clone)]
pub struct BadgeRuleSet {
    rules: Vec<BadgeRule>,
}

impl BadgeRuleSet {
    /// Builds a rule set from explicit rules.
    #[must_use]
    pub fn new(rules: Vec<BadgeRule>) -> Self {
        Self { rules }
    }

    /// The standard catalog, matching the seeded `badges` table.
    #[must_use]
    pub fn standard() -> Self {
        use ActivityKind as A;
        use RuleKind as R;
        Self::new(vec![
            BadgeRule::new(
                "First Steps",
                R::ActivityCount {
                    kind: A::Login,
                    threshold: 1,
                },
            ),
            BadgeRule::new(
                "Document Guru",
                R::ActivityCount {
                    kind: A::DocumentUploaded,
                    threshold: 10,
                },
            ),
            BadgeRule::new(
                "Document Pro",
                R::ActivityCount {
                    kind: A::DocumentUploaded,
                    threshold: 20,
                },
            ),
            BadgeRule::new(
                "Audio Ace",
                R::ActivityCount {
                    kind: A::AudioUploaded,
                    threshold: 5,
                },
            ),
            BadgeRule::new(
                "Summary Scholar",
                R::ActivityCount {
                    kind: A::TextSummarized,
                    threshold: 10,
                },
            ),
            BadgeRule::new(
                "Curious Mind",
                R::ActivityCount {
                    kind: A::QuestionAsked,
                    threshold: 25,
                },
            ),
            BadgeRule::new(
                "Assignment Hero",
                R::ActivityCount {
                    kind: A::AssignmentCompleted,
                    threshold: 10,
                },
            ),
            BadgeRule::new(
                "Quiz Master",
                R::ActivityCount {
                    kind: A::QuizCompleted,
                    threshold: 15,
                },
            ),
            BadgeRule::new(
                "Goal Getter",
                R::ActivityCount {
                    kind: A::GoalCompleted,
                    threshold: 5,
                },
            ),
            BadgeRule::new("Streak Starter", R::LoginStreak { days: 3 }),
            BadgeRule::new("Daily Learner", R::LoginStreak { days: 7 }),
            BadgeRule::new("Streak Legend", R::LoginStreak { days: 30 }),
            BadgeRule::new("Study Spark", R::StudyStreak { days: 3 }),
            BadgeRule::new("Study Marathon", R::StudyStreak { days: 10 }),
            BadgeRule::new("Scholar Supreme", R::StudyStreak { days: 30 }),
            BadgeRule::new("Badge Collector", R::BadgeCount { threshold: 5 }),
            BadgeRule::new("Super Collector", R::BadgeCount { threshold: 10 }),
            BadgeRule::new("Ultimate Learner", R::AllOtherBadges),
        ])
    }

    /// Evaluates every rule against the metrics.
    ///
    /// Tiered rules (e.g. streak badges at 3/7/30 days) are evaluated
    /// independently, so a user who jumps past several tiers at once
    /// receives every tier's decision in one pass.
    #[must_use]
    pub fn evaluate(&self, metrics: &UserMetrics) -> Vec<BadgeDecision> {
        self.rules.iter().map(|r| r.decide(metrics)).collect()
    }

    /// Evaluates only the collector meta-rules (second awarder pass).
    #[must_use]
    pub fn evaluate_meta(&self, metrics: &UserMetrics) -> Vec<BadgeDecision> {
        self.rules
            .iter()
            .filter(|r| r.kind.is_meta())
            .map(|r| r.decide(metrics))
            .collect()
    }

    /// Number of rules (equals the catalog size for the standard set).
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the rule set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
