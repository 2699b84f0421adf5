//! Badge awarding and badge reads.
//!
//! [`BadgeService::apply_decisions`] is the awarder: an idempotent
//! upsert pass over rule decisions, followed by a collector pass that
//! re-evaluates the badge-count meta-rules against the freshly written
//! earned count (collector badges depend on the output of awarding
//! itself).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::domain::{
    AwardResult, BadgeDecision, BadgeDefinition, BadgeRuleSet, BadgeStatus, EngineEvent, EventBus,
    EvaluationSource, UserId, UserMetrics,
};
use crate::error::EngineError;
use crate::persistence::EngineStore;

/// Badge awarding and read operations.
#[derive(Debug, Clone)]
pub struct BadgeService {
    store: Arc<dyn EngineStore>,
    rules: Arc<BadgeRuleSet>,
    event_bus: EventBus,
}

impl BadgeService {
    /// Creates a new `BadgeService`.
    #[must_use]
    pub fn new(store: Arc<dyn EngineStore>, rules: Arc<BadgeRuleSet>, event_bus: EventBus) -> Self {
        Self {
            store,
            rules,
            event_bus,
        }
    }

    /// Applies rule decisions for one user.
    ///
    /// Earn decisions are idempotent upserts: already-earned badges
    /// report `awarded: false`. Progress-only decisions raise stored
    /// progress monotonically and never touch earned badges. Decisions
    /// naming a badge absent from the catalog are reported
    /// `awarded: false` rather than failing the pass.
    ///
    /// After any new award, the collector meta-rules are re-run against
    /// the re-read earned count until a pass awards nothing more.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] when the store rejects a
    /// read or write.
    pub async fn apply_decisions(
        &self,
        user_id: UserId,
        decisions: &[BadgeDecision],
        source: EvaluationSource,
    ) -> Result<Vec<AwardResult>, EngineError> {
        let catalog = self.store.badge_catalog().await?;
        let by_name: HashMap<&str, &BadgeDefinition> =
            catalog.iter().map(|b| (b.name.as_str(), b)).collect();

        let mut results = self
            .apply_pass(user_id, decisions, &by_name, source)
            .await?;

        // Collector pass: badge-count rules observe the writes above.
        let total_badge_count = u32::try_from(catalog.len()).unwrap_or(u32::MAX);
        let mut guard = 0;
        while results.iter().any(|r| r.awarded) {
            let earned_badge_count = self.store.earned_badge_count(user_id).await?;
            let metrics = UserMetrics {
                earned_badge_count,
                total_badge_count,
                ..UserMetrics::default()
            };
            let meta_decisions = self.rules.evaluate_meta(&metrics);
            let meta_results = self
                .apply_pass(user_id, &meta_decisions, &by_name, source)
                .await?;

            let any_new = meta_results.iter().any(|r| r.awarded);
            merge_results(&mut results, meta_results);
            if !any_new {
                break;
            }
            guard += 1;
            if guard > meta_decisions.len() {
                break;
            }
        }

        Ok(results)
    }

    /// One upsert pass over a decision list.
    async fn apply_pass(
        &self,
        user_id: UserId,
        decisions: &[BadgeDecision],
        by_name: &HashMap<&str, &BadgeDefinition>,
        source: EvaluationSource,
    ) -> Result<Vec<AwardResult>, EngineError> {
        let mut results = Vec::with_capacity(decisions.len());
        for decision in decisions {
            let Some(definition) = by_name.get(decision.badge_name.as_str()) else {
                tracing::warn!(badge = %decision.badge_name, "decision for unknown badge");
                results.push(AwardResult {
                    badge_name: decision.badge_name.clone(),
                    awarded: false,
                });
                continue;
            };

            let awarded = if decision.should_earn {
                let newly = self
                    .store
                    .mark_badge_earned(user_id, definition.id, Utc::now())
                    .await?;
                if newly {
                    tracing::info!(%user_id, badge = %definition.name, "badge awarded");
                    let _ = self.event_bus.publish(EngineEvent::BadgeAwarded {
                        user_id,
                        badge_name: definition.name.clone(),
                        source,
                        timestamp: Utc::now(),
                    });
                }
                newly
            } else {
                if decision.progress_percent > 0 {
                    let _ = self
                        .store
                        .raise_badge_progress(user_id, definition.id, decision.progress_percent)
                        .await?;
                }
                false
            };

            results.push(AwardResult {
                badge_name: decision.badge_name.clone(),
                awarded,
            });
        }
        Ok(results)
    }

    /// Returns the badge catalog.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] on store failure.
    pub async fn catalog(&self) -> Result<Vec<BadgeDefinition>, EngineError> {
        self.store.badge_catalog().await
    }

    /// Returns the user's badges.
    ///
    /// With `show_all` the whole catalog is returned, annotated with
    /// the user's earned/progress state (missing rows are the zero
    /// baseline); otherwise only earned badges are included.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] on store failure.
    pub async fn get_badges(
        &self,
        user_id: UserId,
        show_all: bool,
    ) -> Result<Vec<BadgeStatus>, EngineError> {
        let catalog = self.store.badge_catalog().await?;
        let rows = self.store.user_badges(user_id).await?;
        let by_badge_id: HashMap<i64, _> = rows.iter().map(|r| (r.badge_id, r)).collect();

        let statuses = catalog
            .into_iter()
            .map(|definition| {
                let row = by_badge_id.get(&definition.id).copied();
                BadgeStatus::from_parts(definition, row)
            })
            .filter(|s| show_all || s.is_earned)
            .collect();
        Ok(statuses)
    }
}

/// Folds a later pass's results into the accumulated list: a badge
/// that became awarded in any pass stays awarded, and meta badges
/// absent from the first pass are appended.
fn merge_results(acc: &mut Vec<AwardResult>, pass: Vec<AwardResult>) {
    for result in pass {
        if let Some(existing) = acc.iter_mut().find(|r| r.badge_name == result.badge_name) {
            existing.awarded = existing.awarded || result.awarded;
        } else {
            acc.push(result);
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    fn make_service(store: Arc<MemoryStore>) -> BadgeService {
        BadgeService::new(
            store,
            Arc::new(BadgeRuleSet::standard()),
            EventBus::new(100),
        )
    }

    fn earn(name: &str) -> BadgeDecision {
        BadgeDecision {
            badge_name: name.to_string(),
            should_earn: true,
            progress_percent: 100,
        }
    }

    fn progress(name: &str, percent: u8) -> BadgeDecision {
        BadgeDecision {
            badge_name: name.to_string(),
            should_earn: false,
            progress_percent: percent,
        }
    }

    #[tokio::test]
    async fn awarding_is_idempotent() {
        let store = Arc::new(MemoryStore::with_standard_catalog());
        let service = make_service(Arc::clone(&store));
        let user = UserId::new();

        let first = service
            .apply_decisions(user, &[earn("Document Guru")], EvaluationSource::Local)
            .await
            .unwrap_or_default();
        assert_eq!(
            first.iter().find(|r| r.badge_name == "Document Guru").map(|r| r.awarded),
            Some(true)
        );

        let second = service
            .apply_decisions(user, &[earn("Document Guru")], EvaluationSource::Local)
            .await
            .unwrap_or_default();
        assert_eq!(
            second.iter().find(|r| r.badge_name == "Document Guru").map(|r| r.awarded),
            Some(false)
        );

        let count = store.earned_badge_count(user).await;
        assert_eq!(count.ok(), Some(1));
    }

    #[tokio::test]
    async fn progress_updates_are_monotonic() {
        let store = Arc::new(MemoryStore::with_standard_catalog());
        let service = make_service(Arc::clone(&store));
        let user = UserId::new();

        let _ = service
            .apply_decisions(user, &[progress("Document Guru", 50)], EvaluationSource::Local)
            .await;
        let _ = service
            .apply_decisions(user, &[progress("Document Guru", 30)], EvaluationSource::Local)
            .await;

        let badges = store.user_badges(user).await.unwrap_or_default();
        let Some(row) = badges.first() else {
            panic!("expected badge row");
        };
        assert_eq!(row.progress, 50);
        assert!(!row.is_earned);
    }

    #[tokio::test]
    async fn fifth_badge_triggers_collector_in_same_pass() {
        let store = Arc::new(MemoryStore::with_standard_catalog());
        let service = make_service(Arc::clone(&store));
        let user = UserId::new();

        // Four badges already earned.
        let warmup = [
            earn("First Steps"),
            earn("Audio Ace"),
            earn("Goal Getter"),
            earn("Streak Starter"),
        ];
        let _ = service
            .apply_decisions(user, &warmup, EvaluationSource::Local)
            .await;

        // The fifth content badge should pull Badge Collector with it.
        let results = service
            .apply_decisions(user, &[earn("Document Guru")], EvaluationSource::Local)
            .await
            .unwrap_or_default();

        let collector = results.iter().find(|r| r.badge_name == "Badge Collector");
        assert_eq!(collector.map(|r| r.awarded), Some(true));

        // Document Guru + Badge Collector => 6 earned total.
        let count = store.earned_badge_count(user).await;
        assert_eq!(count.ok(), Some(6));
    }

    #[tokio::test]
    async fn unknown_badge_is_reported_not_fatal() {
        let store = Arc::new(MemoryStore::with_standard_catalog());
        let service = make_service(store);
        let user = UserId::new();

        let results = service
            .apply_decisions(user, &[earn("No Such Badge")], EvaluationSource::Local)
            .await
            .unwrap_or_default();
        assert_eq!(
            results.first().map(|r| r.awarded),
            Some(false)
        );
    }

    #[tokio::test]
    async fn get_badges_filters_on_show_all() {
        let store = Arc::new(MemoryStore::with_standard_catalog());
        let service = make_service(store);
        let user = UserId::new();

        let _ = service
            .apply_decisions(
                user,
                &[earn("Document Guru"), progress("Quiz Master", 40)],
                EvaluationSource::Local,
            )
            .await;

        let earned_only = service.get_badges(user, false).await.unwrap_or_default();
        assert_eq!(earned_only.len(), 1);
        assert_eq!(
            earned_only.first().map(|s| s.definition.name.as_str()),
            Some("Document Guru")
        );

        let all = service.get_badges(user, true).await.unwrap_or_default();
        assert_eq!(all.len(), 18);
        let quiz = all.iter().find(|s| s.definition.name == "Quiz Master");
        assert_eq!(quiz.map(|s| s.progress), Some(40));

        // Unexercised catalog entries come back at the zero baseline.
        let untouched = all.iter().find(|s| s.definition.name == "Curious Mind");
        assert_eq!(untouched.map(|s| s.progress), Some(0));
    }

    #[tokio::test]
    async fn award_publishes_event() {
        let store = Arc::new(MemoryStore::with_standard_catalog());
        let bus = EventBus::new(100);
        let service = BadgeService::new(store, Arc::new(BadgeRuleSet::standard()), bus.clone());
        let mut rx = bus.subscribe();
        let user = UserId::new();

        let _ = service
            .apply_decisions(user, &[earn("Audio Ace")], EvaluationSource::Local)
            .await;

        let event = rx.recv().await;
        let Ok(event) = event else {
            panic!("expected event");
        };
        assert_eq!(event.event_type_str(), "badge_awarded");
        assert_eq!(event.user_id(), user);
    }

    #[tokio::test]
    async fn count_metric_decisions_do_not_loop_forever() {
        // A pass that awards nothing must terminate without touching
        // the collector rules.
        let store = Arc::new(MemoryStore::with_standard_catalog());
        let service = make_service(store);
        let user = UserId::new();

        let results = service
            .apply_decisions(
                user,
                &[progress("Document Guru", 10), progress(
                    "Quiz Master", 20,
                )],
                EvaluationSource::Local,
            )
            .await
            .unwrap_or_default();
        assert!(results.iter().all(|r| !r.awarded));
        assert_eq!(results.len(), 2);
    }
}
