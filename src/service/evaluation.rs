//! Evaluation orchestrator: remote-first with local fallback.
//!
//! `check_all` drives the explicit state machine
//! `Start → CallRemote → (Success | TimeoutOrError) → LocalFallback →
//! Done`. The remote call is bounded by a timeout; any failure —
//! transport error, timeout, or auth rejection — transitions to the
//! in-process evaluator, which runs streak computation, metric
//! aggregation, rule evaluation, and awarding in that order.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use super::badges::BadgeService;
use super::remote::RemoteEvaluator;
use crate::domain::streak::unique_days;
use crate::domain::{
    ActivityKind, BadgeRuleSet, EngineEvent, EvaluationSource, EventBus, StreakAnchor,
    StreakFamily, StreakSummary, UserId, UserMetrics, compute_streak,
};
use crate::error::EngineError;
use crate::persistence::EngineStore;

/// A badge newly granted by an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AwardedBadge {
    /// Catalog name.
    pub name: String,
    /// Badge description.
    pub description: String,
    /// Badge artwork URL.
    pub image_url: Option<String>,
}

/// The well-formed result every `check_all` caller receives.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationOutcome {
    /// Whether the evaluation ran to completion.
    pub success: bool,
    /// The user's total earned badge count after evaluation.
    pub badge_count: u32,
    /// Badges newly awarded by this evaluation.
    pub new_badges: Vec<AwardedBadge>,
    /// Which path produced the result.
    pub source: EvaluationSource,
}

/// States of the dual-path evaluation flow.
enum EvalStep {
    Start,
    CallRemote,
    LocalFallback,
    Done(EvaluationOutcome),
}

/// Orchestrates badge evaluation across the remote and local paths.
#[derive(Debug, Clone)]
pub struct EvaluationService {
    store: Arc<dyn EngineStore>,
    rules: Arc<BadgeRuleSet>,
    badges: BadgeService,
    remote: Option<Arc<dyn RemoteEvaluator>>,
    remote_timeout: Duration,
    event_bus: EventBus,
}

impl EvaluationService {
    /// Creates a new `EvaluationService`.
    ///
    /// `remote: None` means every evaluation runs locally.
    #[must_use]
    pub fn new(
        store: Arc<dyn EngineStore>,
        rules: Arc<BadgeRuleSet>,
        badges: BadgeService,
        remote: Option<Arc<dyn RemoteEvaluator>>,
        remote_timeout: Duration,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store,
            rules,
            badges,
            remote,
            remote_timeout,
            event_bus,
        }
    }

    /// Evaluates all badge rules for the user.
    ///
    /// Prefers the remote authoritative evaluator; on timeout or any
    /// remote error, falls back to the in-process evaluator over the
    /// same activity log. The two paths are rule-equivalent.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Persistence`] only when the local path
    /// itself cannot read activities or apply decisions; that terminal
    /// failure is not retried here.
    pub async fn check_all(
        &self,
        user_id: UserId,
        kind: ActivityKind,
        metadata: &serde_json::Value,
    ) -> Result<EvaluationOutcome, EngineError> {
        let mut step = EvalStep::Start;
        loop {
            step = match step {
                EvalStep::Start => {
                    if self.remote.is_some() {
                        EvalStep::CallRemote
                    } else {
                        EvalStep::LocalFallback
                    }
                }
                EvalStep::CallRemote => match self.call_remote(user_id, kind, metadata).await {
                    Ok(outcome) => EvalStep::Done(outcome),
                    Err(err) => {
                        tracing::warn!(%user_id, error = %err, "remote evaluation failed, falling back");
                        EvalStep::LocalFallback
                    }
                },
                EvalStep::LocalFallback => {
                    EvalStep::Done(self.evaluate_locally(user_id).await?)
                }
                EvalStep::Done(outcome) => {
                    tracing::info!(
                        %user_id,
                        source = outcome.source.as_str(),
                        new_badges = outcome.new_badges.len(),
                        "evaluation complete"
                    );
                    return Ok(outcome);
                }
            };
        }
    }

    /// Invokes the remote evaluator under the configured timeout.
    async fn call_remote(
        &self,
        user_id: UserId,
        kind: ActivityKind,
        metadata: &serde_json::Value,
    ) -> Result<EvaluationOutcome, EngineError> {
        let Some(remote) = &self.remote else {
            return Err(EngineError::RemoteUnavailable("not configured".to_string()));
        };

        let evaluation = tokio::time::timeout(
            self.remote_timeout,
            remote.evaluate(user_id, kind, metadata),
        )
        .await
        .map_err(|_| EngineError::RemoteUnavailable("timed out".to_string()))??;

        Ok(EvaluationOutcome {
            success: evaluation.success,
            badge_count: evaluation.badge_count,
            new_badges: evaluation
                .new_badges
                .into_iter()
                .map(|b| AwardedBadge {
                    name: b.name,
                    description: b.description.unwrap_or_default(),
                    image_url: b.image_url,
                })
                .collect(),
            source: EvaluationSource::Remote,
        })
    }

    /// The in-process evaluator: streaks, aggregation, rules, awarding,
    /// strictly in that order.
    async fn evaluate_locally(&self, user_id: UserId) -> Result<EvaluationOutcome, EngineError> {
        self.store.ensure_user(user_id, None).await?;

        let (login_streak, login_persisted) =
            self.refresh_streak(user_id, StreakFamily::Login).await?;
        let (study_streak, study_persisted) =
            self.refresh_streak(user_id, StreakFamily::Study).await?;

        // Streak persistence is non-critical: the computed values still
        // feed rule evaluation, but the outcome is tagged degraded.
        let degraded = !login_persisted || !study_persisted;

        let counts = self.store.activity_counts(user_id).await?;
        let catalog_size = self.store.badge_catalog().await?.len();
        let earned_badge_count = self.store.earned_badge_count(user_id).await?;

        let metrics = UserMetrics {
            counts,
            login_streak,
            study_streak,
            earned_badge_count,
            total_badge_count: u32::try_from(catalog_size).unwrap_or(u32::MAX),
        };

        let source = if degraded {
            EvaluationSource::Fallback
        } else {
            EvaluationSource::Local
        };

        let decisions = self.rules.evaluate(&metrics);
        let results = self.badges.apply_decisions(user_id, &decisions, source).await?;

        let newly_awarded: Vec<String> = results
            .iter()
            .filter(|r| r.awarded)
            .map(|r| r.badge_name.clone())
            .collect();
        let new_badges = self.describe_badges(&newly_awarded).await?;
        let badge_count = self.store.earned_badge_count(user_id).await?;

        Ok(EvaluationOutcome {
            success: true,
            badge_count,
            new_badges,
            source,
        })
    }

    /// Recomputes one streak family from the activity log and persists
    /// it. The returned flag is `false` when the upsert was skipped.
    async fn refresh_streak(
        &self,
        user_id: UserId,
        family: StreakFamily,
    ) -> Result<(StreakSummary, bool), EngineError> {
        let kinds: &[ActivityKind] = match family {
            StreakFamily::Login => &[ActivityKind::Login],
            StreakFamily::Study => &[
                ActivityKind::StudySessionStart,
                ActivityKind::StudySessionEnd,
            ],
        };
        let timestamps = self.store.activity_timestamps(user_id, kinds).await?;

        // Login streaks must reach today or yesterday to count as
        // current; study streaks are scored on their longest run.
        let anchor = match family {
            StreakFamily::Login => StreakAnchor::Today(Utc::now().date_naive()),
            StreakFamily::Study => StreakAnchor::Historical,
        };
        let summary = compute_streak(&timestamps, anchor);
        let last_day = unique_days(&timestamps).last().copied();

        match self
            .store
            .upsert_streak(user_id, family, summary, last_day)
            .await
        {
            Ok(record) => {
                let _ = self.event_bus.publish(EngineEvent::StreakUpdated {
                    user_id,
                    family,
                    current: record.current_streak,
                    longest: record.longest_streak,
                    timestamp: Utc::now(),
                });
                Ok((summary, true))
            }
            Err(err) => {
                tracing::warn!(%user_id, family = family.as_str(), error = %err, "streak upsert skipped");
                Ok((summary, false))
            }
        }
    }

    /// Resolves awarded badge names against the catalog for the
    /// response payload.
    async fn describe_badges(&self, names: &[String]) -> Result<Vec<AwardedBadge>, EngineError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let catalog = self.store.badge_catalog().await?;
        Ok(names
            .iter()
            .filter_map(|name| {
                catalog.iter().find(|b| &b.name == name).map(|b| AwardedBadge {
                    name: b.name.clone(),
                    description: b.description.clone(),
                    image_url: b.image_url.clone(),
                })
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::NewActivity;
    use crate::persistence::MemoryStore;
    use crate::service::remote::{RemoteBadge, RemoteEvaluation};
    use async_trait::async_trait;

    /// Remote double that answers instantly with a fixed payload.
    #[derive(Debug)]
    struct FixedRemote {
        evaluation: RemoteEvaluation,
    }

    #[async_trait]
    impl RemoteEvaluator for FixedRemote {
        async fn evaluate(
            &self,
            _user_id: UserId,
            _kind: ActivityKind,
            _metadata: &serde_json::Value,
        ) -> Result<RemoteEvaluation, EngineError> {
            Ok(self.evaluation.clone())
        }
    }

    /// Remote double that never answers within any reasonable timeout.
    #[derive(Debug)]
    struct HangingRemote;

    #[async_trait]
    impl RemoteEvaluator for HangingRemote {
        async fn evaluate(
            &self,
            _user_id: UserId,
            _kind: ActivityKind,
            _metadata: &serde_json::Value,
        ) -> Result<RemoteEvaluation, EngineError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(RemoteEvaluation {
                success: true,
                badge_count: 0,
                new_badges: vec![],
            })
        }
    }

    /// Remote double rejecting with an auth error.
    #[derive(Debug)]
    struct RejectingRemote;

    #[async_trait]
    impl RemoteEvaluator for RejectingRemote {
        async fn evaluate(
            &self,
            _user_id: UserId,
            _kind: ActivityKind,
            _metadata: &serde_json::Value,
        ) -> Result<RemoteEvaluation, EngineError> {
            Err(EngineError::RemoteUnavailable(
                "evaluator answered 403 Forbidden".to_string(),
            ))
        }
    }

    fn make_service(
        store: Arc<MemoryStore>,
        remote: Option<Arc<dyn RemoteEvaluator>>,
    ) -> EvaluationService {
        let rules = Arc::new(BadgeRuleSet::standard());
        let bus = EventBus::new(100);
        let badges = BadgeService::new(Arc::clone(&store) as Arc<dyn EngineStore>, Arc::clone(&rules), bus.clone());
        EvaluationService::new(
            store,
            rules,
            badges,
            remote,
            Duration::from_millis(50),
            bus,
        )
    }

    async fn upload_documents(store: &MemoryStore, user: UserId, count: usize) {
        let _ = store.ensure_user(user, None).await;
        for i in 0..count {
            let _ = store
                .append_activity(&NewActivity {
                    user_id: user,
                    kind: ActivityKind::DocumentUploaded,
                    metadata: serde_json::json!({"content_id": format!("doc-{i}")}),
                })
                .await;
        }
    }

    #[tokio::test]
    async fn local_evaluation_awards_document_guru() {
        let store = Arc::new(MemoryStore::with_standard_catalog());
        let service = make_service(Arc::clone(&store), None);
        let user = UserId::new();
        upload_documents(&store, user, 10).await;

        let outcome = service
            .check_all(user, ActivityKind::DocumentUploaded, &serde_json::json!({}))
            .await;
        let Ok(outcome) = outcome else {
            panic!("evaluation failed");
        };
        assert_eq!(outcome.source, EvaluationSource::Local);
        assert!(outcome.success);
        assert!(outcome.new_badges.iter().any(|b| b.name == "Document Guru"));
    }

    #[tokio::test]
    async fn repeat_evaluation_does_not_reaward() {
        let store = Arc::new(MemoryStore::with_standard_catalog());
        let service = make_service(Arc::clone(&store), None);
        let user = UserId::new();
        upload_documents(&store, user, 10).await;

        let first = service
            .check_all(user, ActivityKind::DocumentUploaded, &serde_json::json!({}))
            .await;
        let Ok(first) = first else {
            panic!("evaluation failed");
        };
        let first_count = first.badge_count;

        // An 11th upload neither re-awards nor regresses.
        upload_documents(&store, user, 1).await;
        let second = service
            .check_all(user, ActivityKind::DocumentUploaded, &serde_json::json!({}))
            .await;
        let Ok(second) = second else {
            panic!("evaluation failed");
        };
        assert!(second.new_badges.iter().all(|b| b.name != "Document Guru"));
        assert_eq!(second.badge_count, first_count);
    }

    #[tokio::test]
    async fn remote_success_is_returned_verbatim() {
        let store = Arc::new(MemoryStore::with_standard_catalog());
        let remote = Arc::new(FixedRemote {
            evaluation: RemoteEvaluation {
                success: true,
                badge_count: 4,
                new_badges: vec![RemoteBadge {
                    name: "Quiz Master".to_string(),
                    description: Some("Complete 15 quizzes".to_string()),
                    image_url: None,
                }],
            },
        });
        let service = make_service(store, Some(remote));
        let user = UserId::new();

        let outcome = service
            .check_all(user, ActivityKind::QuizCompleted, &serde_json::json!({}))
            .await;
        let Ok(outcome) = outcome else {
            panic!("evaluation failed");
        };
        assert_eq!(outcome.source, EvaluationSource::Remote);
        assert_eq!(outcome.badge_count, 4);
        assert_eq!(
            outcome.new_badges.first().map(|b| b.name.as_str()),
            Some("Quiz Master")
        );
    }

    #[tokio::test]
    async fn remote_timeout_falls_back_to_local() {
        let store = Arc::new(MemoryStore::with_standard_catalog());
        let service = make_service(Arc::clone(&store), Some(Arc::new(HangingRemote)));
        let user = UserId::new();
        upload_documents(&store, user, 10).await;

        let outcome = service
            .check_all(user, ActivityKind::DocumentUploaded, &serde_json::json!({}))
            .await;
        let Ok(outcome) = outcome else {
            panic!("evaluation failed");
        };
        assert_eq!(outcome.source, EvaluationSource::Local);
        assert!(outcome.new_badges.iter().any(|b| b.name == "Document Guru"));
    }

    #[tokio::test]
    async fn remote_auth_rejection_falls_back_to_local() {
        let store = Arc::new(MemoryStore::with_standard_catalog());
        let service = make_service(Arc::clone(&store), Some(Arc::new(RejectingRemote)));
        let user = UserId::new();
        upload_documents(&store, user, 3).await;

        let outcome = service
            .check_all(user, ActivityKind::DocumentUploaded, &serde_json::json!({}))
            .await;
        let Ok(outcome) = outcome else {
            panic!("evaluation failed");
        };
        assert_eq!(outcome.source, EvaluationSource::Local);
    }

    #[tokio::test]
    async fn store_failure_is_a_terminal_typed_error() {
        let store = Arc::new(MemoryStore::with_standard_catalog());
        let service = make_service(Arc::clone(&store), None);
        store.set_offline(true);

        let outcome = service
            .check_all(UserId::new(), ActivityKind::Login, &serde_json::json!({}))
            .await;
        assert!(matches!(outcome, Err(EngineError::Persistence(_))));
    }

    #[tokio::test]
    async fn login_evaluation_updates_streak_record() {
        let store = Arc::new(MemoryStore::with_standard_catalog());
        let service = make_service(Arc::clone(&store), None);
        let user = UserId::new();
        let _ = store.ensure_user(user, None).await;
        let _ = store
            .append_activity(&NewActivity {
                user_id: user,
                kind: ActivityKind::Login,
                metadata: serde_json::json!({}),
            })
            .await;

        let outcome = service
            .check_all(user, ActivityKind::Login, &serde_json::json!({}))
            .await;
        assert!(outcome.is_ok());

        let record = store.streak(user, StreakFamily::Login).await;
        let Ok(Some(record)) = record else {
            panic!("expected streak record");
        };
        assert_eq!(record.current_streak, 1);
        assert_eq!(record.longest_streak, 1);
    }
}
