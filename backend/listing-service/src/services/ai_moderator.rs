//! AI moderation collaborator
//!
//! Fast-path filter for clearly abusive listings. The production
//! implementation talks to a Mistral-compatible chat-completions API and
//! extracts a structured verdict from the completion text. Transport
//! failures surface as errors here; the moderation gate converts them into
//! its fail-open soft pass.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::ModerationConfig;
use crate::error::{ListingError, Result};
use crate::models::{AiDecision, AiVerdict, PostType};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AiModerator: Send + Sync {
    /// Moderate a listing; confidence is the model's certainty in its own
    /// decision, 0.0..=1.0.
    async fn moderate(
        &self,
        title: &str,
        description: &str,
        post_type: PostType,
    ) -> Result<AiVerdict>;
}

const SYSTEM_PROMPT: &str = "You are a moderator for a classifieds platform. \
Decide whether a listing complies with the platform rules.";

const MODERATION_RULES: &str = "\
PROHIBITED: illegal goods (drugs, weapons, medication), fraud schemes and \
financial pyramids, adult content and escort services, gambling, insults or \
discrimination, spam or advertising of other platforms, sale of accounts or \
documents, copyright infringement, contact details inside the text (phone \
numbers, emails, social handles).\n\
ALLOWED: job offers and job seeking, household and professional services, \
tutoring, repair and construction, IT services, design, delivery, legal \
services.\n\
If in doubt, reject so the listing goes to human review.";

/// Chat-completions client for listing moderation
pub struct MistralModerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    decision: String,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    violations: Vec<String>,
}

impl MistralModerator {
    pub fn new(config: &ModerationConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ListingError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn build_prompt(title: &str, description: &str, post_type: PostType) -> String {
        format!(
            "{MODERATION_RULES}\n\n\
             ANALYZE THIS LISTING:\n\
             Type: {post_type}\n\
             Title: \"{title}\"\n\
             Description: \"{description}\"\n\n\
             Respond with JSON only:\n\
             {{\"decision\": \"approved\" or \"rejected\", \"confidence\": 0.95, \
             \"reason\": \"short explanation\", \"violations\": [\"...\"]}}"
        )
    }

    /// Extract a verdict from the completion text. The model is asked for
    /// pure JSON but sometimes wraps it in prose, so scan for the outermost
    /// braces and fall back to keyword analysis when no JSON is found.
    fn parse_verdict(content: &str) -> AiVerdict {
        let start = content.find('{');
        let end = content.rfind('}');

        if let (Some(start), Some(end)) = (start, end) {
            if start < end {
                if let Ok(raw) = serde_json::from_str::<RawVerdict>(&content[start..=end]) {
                    let decision = match raw.decision.as_str() {
                        "rejected" => AiDecision::Rejected,
                        _ => AiDecision::Approved,
                    };
                    let mut reason = raw
                        .reason
                        .unwrap_or_else(|| "AI moderation completed".to_string());
                    if !raw.violations.is_empty() {
                        reason.push_str(&format!("; violations: {}", raw.violations.join(", ")));
                    }
                    return AiVerdict {
                        decision,
                        confidence: raw.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
                        reason,
                    };
                }
            }
        }

        let lowered = content.to_lowercase();
        if ["reject", "violat", "prohibit"]
            .iter()
            .any(|kw| lowered.contains(kw))
        {
            AiVerdict {
                decision: AiDecision::Rejected,
                confidence: 0.8,
                reason: "AI flagged potential violations".to_string(),
            }
        } else {
            AiVerdict {
                decision: AiDecision::Approved,
                confidence: 0.7,
                reason: "AI approved the listing".to_string(),
            }
        }
    }
}

#[async_trait]
impl AiModerator for MistralModerator {
    async fn moderate(
        &self,
        title: &str,
        description: &str,
        post_type: PostType,
    ) -> Result<AiVerdict> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": Self::build_prompt(title, description, post_type) },
            ],
            "temperature": 0.1,
            "max_tokens": 200,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ListingError::Moderation(format!(
                "moderation API returned {}",
                response.status()
            )));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| ListingError::Moderation("empty completion".to_string()))?;

        Ok(Self::parse_verdict(content))
    }
}
