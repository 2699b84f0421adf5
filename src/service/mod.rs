//! Service layer: orchestration over the store and the pure domain.

pub mod activity;
pub mod badges;
pub mod evaluation;
pub mod leaderboard;
pub mod points;
pub mod remote;

pub use activity::ActivityService;
pub use badges::BadgeService;
pub use evaluation::{AwardedBadge, EvaluationOutcome, EvaluationService};
pub use leaderboard::{LeaderboardEntry, LeaderboardService, RankGenerator, SyntheticRankGenerator};
pub use points::PointsService;
pub use remote::{HttpRemoteEvaluator, RemoteEvaluation, RemoteEvaluator};
