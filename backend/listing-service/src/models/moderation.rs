use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::post::PostStatus;

/// Verdict the AI moderator can return for a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiDecision {
    Approved,
    Rejected,
}

impl AiDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiDecision::Approved => "approved",
            AiDecision::Rejected => "rejected",
        }
    }
}

/// Result of one AI moderation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiVerdict {
    pub decision: AiDecision,
    /// Confidence in the decision, 0.0..=1.0
    pub confidence: f32,
    pub reason: String,
}

impl AiVerdict {
    /// Fail-open verdict used when the moderation service is unreachable:
    /// a low-confidence pass that still routes the post to a human.
    pub fn soft_pass(reason: impl Into<String>) -> Self {
        Self {
            decision: AiDecision::Approved,
            confidence: 0.5,
            reason: reason.into(),
        }
    }
}

/// Final decision produced by the moderation gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationDecision {
    Approved,
    Rejected,
    ManualReview,
}

impl ModerationDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationDecision::Approved => "approved",
            ModerationDecision::Rejected => "rejected",
            ModerationDecision::ManualReview => "manual_review",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approved" => Some(ModerationDecision::Approved),
            "rejected" => Some(ModerationDecision::Rejected),
            "manual_review" => Some(ModerationDecision::ManualReview),
            _ => None,
        }
    }
}

impl fmt::Display for ModerationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit record written for every automated-moderation invocation.
/// Append-only; purged by the cleanup worker after the retention window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub decision: ModerationDecision,
    pub confidence: f32,
    pub reason: String,
    pub moderated_at: DateTime<Utc>,
}

impl ModerationRecord {
    pub fn from_verdict(post_id: Uuid, verdict: &AiVerdict, now: DateTime<Utc>) -> Self {
        let decision = match verdict.decision {
            AiDecision::Approved => ModerationDecision::Approved,
            AiDecision::Rejected => ModerationDecision::Rejected,
        };
        Self {
            id: Uuid::new_v4(),
            post_id,
            decision,
            confidence: verdict.confidence,
            reason: verdict.reason.clone(),
            moderated_at: now,
        }
    }
}

/// What the moderation gate decided for a freshly created post
#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub decision: ModerationDecision,
    pub ai_verdict: Option<AiVerdict>,
    pub notify_moderator: bool,
    pub next_status: PostStatus,
}

/// Action taken by a human moderator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeratorAction {
    Approve,
    Reject,
}

/// Who made the decision, as reported by the moderation channel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModeratorInfo {
    pub id: Option<i64>,
    pub username: Option<String>,
}

impl ModeratorInfo {
    pub fn display_name(&self) -> String {
        self.username
            .clone()
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Outcome of applying a moderator decision.
///
/// A lost status race (for example the expiration worker archived the post
/// first) is an expected no-op, reported rather than raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// The compare-and-swap won and the post now has `new_status`
    Applied { new_status: PostStatus },
    /// The post had already left the pre-decision states
    Superseded { current: PostStatus },
}

impl DecisionOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, DecisionOutcome::Applied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_pass_routes_to_human() {
        let verdict = AiVerdict::soft_pass("moderation unavailable");
        assert_eq!(verdict.decision, AiDecision::Approved);
        assert_eq!(verdict.confidence, 0.5);
    }

    #[test]
    fn test_decision_roundtrip() {
        for decision in [
            ModerationDecision::Approved,
            ModerationDecision::Rejected,
            ModerationDecision::ManualReview,
        ] {
            assert_eq!(ModerationDecision::parse(decision.as_str()), Some(decision));
        }
    }

    #[test]
    fn test_record_from_verdict() {
        let verdict = AiVerdict {
            decision: AiDecision::Rejected,
            confidence: 0.93,
            reason: "prohibited goods".to_string(),
        };
        let record = ModerationRecord::from_verdict(Uuid::new_v4(), &verdict, Utc::now());
        assert_eq!(record.decision, ModerationDecision::Rejected);
        assert_eq!(record.confidence, 0.93);
    }
}
