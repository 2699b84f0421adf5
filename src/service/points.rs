//! Points ledger operations.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{EngineEvent, EventBus, UserId};
use crate::error::EngineError;
use crate::persistence::EngineStore;

/// Append-only points ledger with a cached running total per user.
#[derive(Debug, Clone)]
pub struct PointsService {
    store: Arc<dyn EngineStore>,
    event_bus: EventBus,
}

impl PointsService {
    /// Creates a new `PointsService`.
    #[must_use]
    pub fn new(store: Arc<dyn EngineStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Records a signed points transaction and returns the user's new
    /// total. The cached `total_points` is updated by the same store
    /// write.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRequest`] for a zero-point award
    /// or an empty reason, and [`EngineError::Persistence`] on store
    /// failure.
    pub async fn award(
        &self,
        user_id: UserId,
        points: i64,
        reason: &str,
        metadata: &serde_json::Value,
    ) -> Result<i64, EngineError> {
        if points == 0 {
            return Err(EngineError::InvalidRequest(
                "points must be non-zero".to_string(),
            ));
        }
        if reason.is_empty() {
            return Err(EngineError::InvalidRequest("missing reason".to_string()));
        }

        self.store.ensure_user(user_id, None).await?;
        let new_total = self
            .store
            .award_points(user_id, points, reason, metadata)
            .await?;

        tracing::info!(%user_id, points, new_total, reason, "points awarded");
        let _ = self.event_bus.publish(EngineEvent::PointsAwarded {
            user_id,
            points,
            new_total,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });

        Ok(new_total)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    fn make_service(store: Arc<MemoryStore>) -> PointsService {
        PointsService::new(store, EventBus::new(100))
    }

    #[tokio::test]
    async fn totals_accumulate_across_awards() {
        let store = Arc::new(MemoryStore::new());
        let service = make_service(store);
        let user = UserId::new();

        let first = service
            .award(user, 50, "quiz_completed", &serde_json::json!({}))
            .await;
        assert_eq!(first.ok(), Some(50));

        let second = service
            .award(user, 25, "document_uploaded", &serde_json::json!({}))
            .await;
        assert_eq!(second.ok(), Some(75));

        // Deductions are just negative transactions.
        let third = service
            .award(user, -30, "redemption", &serde_json::json!({}))
            .await;
        assert_eq!(third.ok(), Some(45));
    }

    #[tokio::test]
    async fn zero_points_are_rejected() {
        let service = make_service(Arc::new(MemoryStore::new()));
        let result = service
            .award(UserId::new(), 0, "nothing", &serde_json::json!({}))
            .await;
        assert!(matches!(result, Err(EngineError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn award_publishes_event() {
        let store = Arc::new(MemoryStore::new());
        let bus = EventBus::new(100);
        let service = PointsService::new(store, bus.clone());
        let mut rx = bus.subscribe();
        let user = UserId::new();

        let _ = service
            .award(user, 10, "login", &serde_json::json!({}))
            .await;

        let event = rx.recv().await;
        let Ok(event) = event else {
            panic!("expected event");
        };
        assert_eq!(event.event_type_str(), "points_awarded");
        assert_eq!(event.user_id(), user);
    }
}
