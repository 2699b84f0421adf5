//! Evaluation trigger DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::service::evaluation::EvaluationOutcome;

/// Request body for `POST /users/{id}/evaluations`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EvaluateRequest {
    /// The activity kind that triggered this evaluation.
    pub activity_type: String,
    /// Activity metadata forwarded to the evaluator.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// One newly awarded badge in an evaluation response.
#[derive(Debug, Serialize, ToSchema)]
pub struct AwardedBadgeDto {
    /// Catalog name.
    pub name: String,
    /// Badge description.
    pub description: String,
    /// Badge artwork URL.
    pub image_url: Option<String>,
}

/// Response body for `POST /users/{id}/evaluations`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EvaluationResponse {
    /// Whether the evaluation ran to completion.
    pub success: bool,
    /// The user's total earned badge count after evaluation.
    pub badge_count: u32,
    /// Badges newly awarded by this evaluation.
    pub new_badges: Vec<AwardedBadgeDto>,
    /// Which path produced the result: `"remote"`, `"local"`, or
    /// `"fallback"`.
    pub source: String,
}

impl From<EvaluationOutcome> for EvaluationResponse {
    fn from(outcome: EvaluationOutcome) -> Self {
        Self {
            success: outcome.success,
            badge_count: outcome.badge_count,
            new_badges: outcome
                .new_badges
                .into_iter()
                .map(|b| AwardedBadgeDto {
                    name: b.name,
                    description: b.description,
                    image_url: b.image_url,
                })
                .collect(),
            source: outcome.source.as_str().to_string(),
        }
    }
}
