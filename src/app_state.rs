//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::{
    ActivityService, BadgeService, EvaluationService, LeaderboardService, PointsService,
};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Activity ingestion.
    pub activity_service: Arc<ActivityService>,
    /// Evaluation orchestrator (remote-first, local fallback).
    pub evaluation_service: Arc<EvaluationService>,
    /// Badge awarding and reads.
    pub badge_service: Arc<BadgeService>,
    /// Leaderboard ranking.
    pub leaderboard_service: Arc<LeaderboardService>,
    /// Points ledger.
    pub points_service: Arc<PointsService>,
    /// Event bus for engine events.
    pub event_bus: EventBus,
}
