//! Activity ingestion.
//!
//! Validates incoming activities at the boundary and appends them to
//! the immutable log. Malformed payloads never reach evaluation.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{ActivityDetails, ActivityEvent, ActivityKind, EngineEvent, EventBus,
    NewActivity, UserId};
use crate::error::EngineError;
use crate::persistence::EngineStore;

/// Append-only activity recording.
#[derive(Debug, Clone)]
pub struct ActivityService {
    store: Arc<dyn EngineStore>,
    event_bus: EventBus,
}

impl ActivityService {
    /// Creates a new `ActivityService`.
    #[must_use]
    pub fn new(store: Arc<dyn EngineStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Validates and appends one activity event.
    ///
    /// The user row is created lazily on first contact; `username` is
    /// only used for that initial creation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRequest`] when the metadata does
    /// not match the activity kind's declared shape, and
    /// [`EngineError::Persistence`] on store failure.
    pub async fn record(
        &self,
        user_id: UserId,
        username: Option<&str>,
        kind: ActivityKind,
        metadata: serde_json::Value,
    ) -> Result<ActivityEvent, EngineError> {
        // Reject malformed payloads before anything is written.
        let _details = ActivityDetails::parse(kind, &metadata)?;

        self.store.ensure_user(user_id, username).await?;
        let event = self
            .store
            .append_activity(&NewActivity {
                user_id,
                kind,
                metadata,
            })
            .await?;

        tracing::debug!(%user_id, kind = %kind, "activity recorded");
        let _ = self.event_bus.publish(EngineEvent::ActivityRecorded {
            user_id,
            kind,
            timestamp: Utc::now(),
        });

        Ok(event)
    }
}
