//! Activity events: the append-only input to all derived state.
//!
//! Every trackable user action arrives as an [`ActivityEvent`] with a
//! [`ActivityKind`] discriminator and a kind-specific metadata payload.
//! Payloads are validated at the ingestion boundary via
//! [`ActivityDetails::parse`]; evaluation code downstream trusts them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;
use crate::error::EngineError;

/// Discriminator for the kind of user activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// User signed in.
    Login,
    /// User uploaded a document.
    DocumentUploaded,
    /// User uploaded an audio recording.
    AudioUploaded,
    /// User generated a text summary.
    TextSummarized,
    /// User asked a question.
    QuestionAsked,
    /// User completed an assignment.
    AssignmentCompleted,
    /// User completed a quiz.
    QuizCompleted,
    /// User started a study session.
    StudySessionStart,
    /// User ended a study session.
    StudySessionEnd,
    /// User set a goal.
    GoalSet,
    /// User completed a goal.
    GoalCompleted,
}

impl ActivityKind {
    /// All activity kinds, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Login,
        Self::DocumentUploaded,
        Self::AudioUploaded,
        Self::TextSummarized,
        Self::QuestionAsked,
        Self::AssignmentCompleted,
        Self::QuizCompleted,
        Self::StudySessionStart,
        Self::StudySessionEnd,
        Self::GoalSet,
        Self::GoalCompleted,
    ];

    /// Returns the wire string for this kind (snake_case).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::DocumentUploaded => "document_uploaded",
            Self::AudioUploaded => "audio_uploaded",
            Self::TextSummarized => "text_summarized",
            Self::QuestionAsked => "question_asked",
            Self::AssignmentCompleted => "assignment_completed",
            Self::QuizCompleted => "quiz_completed",
            Self::StudySessionStart => "study_session_start",
            Self::StudySessionEnd => "study_session_end",
            Self::GoalSet => "goal_set",
            Self::GoalCompleted => "goal_completed",
        }
    }

    /// Whether this kind feeds the login streak family.
    #[must_use]
    pub const fn counts_toward_login_streak(&self) -> bool {
        matches!(self, Self::Login)
    }

    /// Whether this kind feeds the study streak family.
    #[must_use]
    pub const fn counts_toward_study_streak(&self) -> bool {
        matches!(self, Self::StudySessionStart | Self::StudySessionEnd)
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| EngineError::InvalidActivityKind(s.to_string()))
    }
}

/// Validated, kind-specific view of an activity's metadata.
///
/// Ingestion parses the raw JSON metadata into this shape and rejects
/// malformed payloads with a client error. The raw JSON is still what
/// gets persisted; this type only gates entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityDetails {
    /// Login carries no required metadata.
    Login,
    /// Content uploads and summaries reference the content item.
    Content {
        /// Identifier of the document, recording, or summary source.
        content_id: String,
    },
    /// A free-form question.
    Question {
        /// The question text (non-empty).
        text: String,
    },
    /// Completion of an assignment or quiz with a score.
    Scored {
        /// Identifier of the assignment or quiz.
        item_id: String,
        /// Score achieved, 0–100.
        score: u8,
    },
    /// Study session boundary; optional session identifier.
    StudySession {
        /// Correlates a start with its end, when the caller tracks one.
        session_id: Option<String>,
    },
    /// Goal lifecycle events reference the goal.
    Goal {
        /// Identifier of the goal.
        goal_id: String,
    },
}

impl ActivityDetails {
    /// Parses and validates raw metadata for the given activity kind.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRequest`] when a required field is
    /// missing, empty, or of the wrong type.
    pub fn parse(kind: ActivityKind, metadata: &serde_json::Value) -> Result<Self, EngineError> {
        match kind {
            ActivityKind::Login => Ok(Self::Login),
            ActivityKind::DocumentUploaded
            | ActivityKind::AudioUploaded
            | ActivityKind::TextSummarized => Ok(Self::Content {
                content_id: require_str(metadata, "content_id")?,
            }),
            ActivityKind::QuestionAsked => Ok(Self::Question {
                text: require_str(metadata, "text")?,
            }),
            ActivityKind::AssignmentCompleted | ActivityKind::QuizCompleted => {
                let score = metadata
                    .get("score")
                    .and_then(serde_json::Value::as_u64)
                    .ok_or_else(|| {
                        EngineError::InvalidRequest("missing or non-numeric score".to_string())
                    })?;
                if score > 100 {
                    return Err(EngineError::InvalidRequest(format!(
                        "score out of range: {score}"
                    )));
                }
                Ok(Self::Scored {
                    item_id: require_str(metadata, "item_id")?,
                    score: u8::try_from(score).unwrap_or(100),
                })
            }
            ActivityKind::StudySessionStart | ActivityKind::StudySessionEnd => {
                let session_id = metadata
                    .get("session_id")
                    .and_then(serde_json::Value::as_str)
                    .map(ToString::to_string);
                Ok(Self::StudySession { session_id })
            }
            ActivityKind::GoalSet | ActivityKind::GoalCompleted => Ok(Self::Goal {
                goal_id: require_str(metadata, "goal_id")?,
            }),
        }
    }
}

fn require_str(metadata: &serde_json::Value, field: &str) -> Result<String, EngineError> {
    let value = metadata
        .get(field)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| EngineError::InvalidRequest(format!("missing {field}")))?;
    if value.is_empty() {
        return Err(EngineError::InvalidRequest(format!("empty {field}")));
    }
    Ok(value.to_string())
}

/// An immutable record of a user action.
///
/// Created by the ingestion interface, never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Store-assigned row id.
    pub id: i64,
    /// Acting user.
    pub user_id: UserId,
    /// Kind discriminator.
    pub kind: ActivityKind,
    /// Kind-specific metadata, validated at ingestion.
    pub metadata: serde_json::Value,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A new activity ready to append, after validation.
#[derive(Debug, Clone)]
pub struct NewActivity {
    /// Acting user.
    pub user_id: UserId,
    /// Kind discriminator.
    pub kind: ActivityKind,
    /// Raw metadata as received (already validated).
    pub metadata: serde_json::Value,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in ActivityKind::ALL {
            let parsed = ActivityKind::from_str(kind.as_str());
            assert_eq!(parsed.ok(), Some(kind));
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(ActivityKind::from_str("page_scrolled").is_err());
        assert!(ActivityKind::from_str("").is_err());
    }

    #[test]
    fn streak_families_are_disjoint() {
        for kind in ActivityKind::ALL {
            assert!(!(kind.counts_toward_login_streak() && kind.counts_toward_study_streak()));
        }
    }

    #[test]
    fn login_needs_no_metadata() {
        let details = ActivityDetails::parse(ActivityKind::Login, &serde_json::json!({}));
        assert_eq!(details.ok(), Some(ActivityDetails::Login));
    }

    #[test]
    fn document_upload_requires_content_id() {
        let missing = ActivityDetails::parse(ActivityKind::DocumentUploaded, &serde_json::json!({}));
        assert!(missing.is_err());

        let empty = ActivityDetails::parse(
            ActivityKind::DocumentUploaded,
            &serde_json::json!({"content_id": ""}),
        );
        assert!(empty.is_err());

        let ok = ActivityDetails::parse(
            ActivityKind::DocumentUploaded,
            &serde_json::json!({"content_id": "doc-42"}),
        );
        assert_eq!(
            ok.ok(),
            Some(ActivityDetails::Content {
                content_id: "doc-42".to_string()
            })
        );
    }

    #[test]
    fn quiz_score_must_be_in_range() {
        let over = ActivityDetails::parse(
            ActivityKind::QuizCompleted,
            &serde_json::json!({"item_id": "quiz-1", "score": 150}),
        );
        assert!(over.is_err());

        let ok = ActivityDetails::parse(
            ActivityKind::QuizCompleted,
            &serde_json::json!({"item_id": "quiz-1", "score": 85}),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn study_session_id_is_optional() {
        let without = ActivityDetails::parse(ActivityKind::StudySessionStart, &serde_json::json!({}));
        assert_eq!(
            without.ok(),
            Some(ActivityDetails::StudySession { session_id: None })
        );

        let with = ActivityDetails::parse(
            ActivityKind::StudySessionEnd,
            &serde_json::json!({"session_id": "s-9"}),
        );
        assert_eq!(
            with.ok(),
            Some(ActivityDetails::StudySession {
                session_id: Some("s-9".to_string())
            })
        );
    }
}
