//! Remote authoritative evaluator client.
//!
//! The orchestrator prefers an external evaluator and only falls back
//! to in-process rules when that call fails. [`RemoteEvaluator`] is the
//! seam; [`HttpRemoteEvaluator`] is the production client. The two
//! paths are rule-equivalent: given the same activity history they must
//! produce the same badge decisions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{ActivityKind, UserId};
use crate::error::EngineError;

/// A badge granted by an evaluation, as reported over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteBadge {
    /// Catalog name of the badge.
    pub name: String,
    /// Badge description, when the evaluator includes one.
    #[serde(default)]
    pub description: Option<String>,
    /// Badge artwork URL, when the evaluator includes one.
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Result payload from the remote evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEvaluation {
    /// Whether the evaluation ran to completion remotely.
    pub success: bool,
    /// The user's total earned badge count after evaluation.
    pub badge_count: u32,
    /// Badges newly awarded by this evaluation.
    #[serde(default)]
    pub new_badges: Vec<RemoteBadge>,
}

/// Seam for the external authoritative evaluator.
#[async_trait]
pub trait RemoteEvaluator: Send + Sync + std::fmt::Debug {
    /// Asks the remote side to evaluate all badge rules for the user.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RemoteUnavailable`] on transport errors
    /// or any non-success HTTP status (401/403/5xx included). The
    /// orchestrator treats every error identically: local fallback.
    async fn evaluate(
        &self,
        user_id: UserId,
        kind: ActivityKind,
        metadata: &serde_json::Value,
    ) -> Result<RemoteEvaluation, EngineError>;
}

/// HTTP client for the remote evaluator.
#[derive(Debug, Clone)]
pub struct HttpRemoteEvaluator {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRemoteEvaluator {
    /// Creates a client for the evaluator at `base_url`, forwarding
    /// `token` as a bearer credential when present.
    #[must_use]
    pub fn new(base_url: String, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[derive(Debug, Serialize)]
struct EvaluateRequest<'a> {
    user_id: UserId,
    activity_type: ActivityKind,
    metadata: &'a serde_json::Value,
}

#[async_trait]
impl RemoteEvaluator for HttpRemoteEvaluator {
    async fn evaluate(
        &self,
        user_id: UserId,
        kind: ActivityKind,
        metadata: &serde_json::Value,
    ) -> Result<RemoteEvaluation, EngineError> {
        let url = format!("{}/evaluations", self.base_url);
        let mut request = self.client.post(&url).json(&EvaluateRequest {
            user_id,
            activity_type: kind,
            metadata,
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::RemoteUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::RemoteUnavailable(format!(
                "evaluator answered {status}"
            )));
        }

        response
            .json::<RemoteEvaluation>()
            .await
            .map_err(|e| EngineError::RemoteUnavailable(format!("malformed response: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let evaluator = HttpRemoteEvaluator::new("http://eval.internal/".to_string(), None);
        assert_eq!(evaluator.base_url, "http://eval.internal");
    }

    #[test]
    fn remote_evaluation_deserializes_with_defaults() {
        let parsed: Result<RemoteEvaluation, _> =
            serde_json::from_str(r#"{"success": true, "badge_count": 3}"#);
        let Ok(parsed) = parsed else {
            panic!("deserialization failed");
        };
        assert!(parsed.success);
        assert_eq!(parsed.badge_count, 3);
        assert!(parsed.new_badges.is_empty());
    }
}
