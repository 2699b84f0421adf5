//! Domain layer: core types and pure computation.
//!
//! This module contains the engine's domain model: user identity, the
//! activity event vocabulary, the pure streak calculator, the
//! declarative badge rule set, and the event bus for broadcasting
//! state changes.

pub mod activity;
pub mod badge;
pub mod engine_event;
pub mod event_bus;
pub mod rules;
pub mod streak;
pub mod user_id;

pub use activity::{ActivityDetails, ActivityEvent, ActivityKind, NewActivity};
pub use badge::{AwardResult, BadgeDecision, BadgeDefinition, BadgeStatus, UserBadge};
pub use engine_event::{EngineEvent, EvaluationSource};
pub use event_bus::EventBus;
pub use rules::{BadgeRule, BadgeRuleSet, RuleKind, UserMetrics};
pub use streak::{StreakAnchor, StreakFamily, StreakRecord, StreakSummary, compute_streak};
pub use user_id::UserId;
