//! Moderator notification collaborator
//!
//! Best-effort delivery into the human moderation channel. The production
//! implementation posts to the Telegram Bot API with an inline
//! approve/reject keyboard; the decision callbacks come back through the
//! webhook surface, which is outside this service.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{ListingError, Result};
use crate::models::{AiDecision, AiVerdict, ModerationDecision, ModeratorInfo, Post, PostType};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModeratorNotifier: Send + Sync {
    /// Ask a human to review a listing. Fire-and-forget: a `false` return
    /// or an error means the message did not go out, nothing more.
    async fn send_moderation_request<'a>(
        &self,
        post: &Post,
        ai_verdict: Option<&'a AiVerdict>,
    ) -> Result<bool>;

    /// Announce the final decision back into the moderation channel.
    async fn send_status_update<'a>(
        &self,
        post: &Post,
        decision: ModerationDecision,
        moderator: Option<&'a ModeratorInfo>,
    ) -> Result<bool>;
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Telegram Bot API implementation of [`ModeratorNotifier`]
pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ListingError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: format!("https://api.telegram.org/bot{bot_token}"),
            chat_id,
        })
    }

    fn format_moderation_message(post: &Post, ai_verdict: Option<&AiVerdict>) -> String {
        let type_name = match post.post_type {
            PostType::Job => "Job",
            PostType::Service => "Service",
        };
        let price_info = match post.price {
            Some(price) => format!(
                "{} {}",
                price,
                post.currency_id.as_deref().unwrap_or("")
            ),
            None => "not specified".to_string(),
        };

        let mut message = format!(
            "\u{1F50D} <b>NEW LISTING AWAITING MODERATION</b>\n\n\
             \u{1F4CB} <b>Type:</b> {type_name}\n\
             \u{1F4DD} <b>Title:</b> {}\n\
             \u{1F4B0} <b>Price:</b> {price_info}\n\n\
             \u{1F4C4} <b>Description:</b>\n{}\n\n\
             \u{1F464} <b>Author:</b> {}\n\
             \u{1F194} <b>Post ID:</b> {}\n\
             \u{23F0} <b>Created:</b> {}",
            post.title,
            post.description,
            post.author_id,
            post.id,
            post.created_at.format("%H:%M %d.%m.%Y"),
        );

        if let Some(verdict) = ai_verdict {
            let decision_label = match verdict.decision {
                AiDecision::Approved => "\u{2705} Approved",
                AiDecision::Rejected => "\u{274C} Rejected",
            };
            message.push_str(&format!(
                "\n\n\u{1F916} <b>AI MODERATION:</b>\n\
                 {decision_label} (confidence: {:.0}%)\n\
                 \u{1F4AD} {}",
                verdict.confidence * 100.0,
                verdict.reason,
            ));
        }

        message.push_str("\n\n<b>Choose an action:</b>");
        message
    }

    fn moderation_keyboard(post: &Post) -> serde_json::Value {
        serde_json::json!({
            "inline_keyboard": [
                [
                    { "text": "\u{2705} Publish", "callback_data": format!("approve_{}", post.id) },
                    { "text": "\u{274C} Reject", "callback_data": format!("reject_{}", post.id) },
                ],
            ]
        })
    }

    async fn send_message(&self, body: serde_json::Value) -> Result<bool> {
        let response = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .json(&body)
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}

#[async_trait]
impl ModeratorNotifier for TelegramNotifier {
    async fn send_moderation_request<'a>(
        &self,
        post: &Post,
        ai_verdict: Option<&'a AiVerdict>,
    ) -> Result<bool> {
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": Self::format_moderation_message(post, ai_verdict),
            "reply_markup": Self::moderation_keyboard(post),
            "parse_mode": "HTML",
        });

        self.send_message(body).await
    }

    async fn send_status_update<'a>(
        &self,
        post: &Post,
        decision: ModerationDecision,
        moderator: Option<&'a ModeratorInfo>,
    ) -> Result<bool> {
        let status_text = match decision {
            ModerationDecision::Approved => "\u{2705} PUBLISHED",
            ModerationDecision::Rejected => "\u{274C} REJECTED",
            ModerationDecision::ManualReview => "\u{1F50D} SENT TO REVIEW",
        };
        let moderator_info = moderator
            .and_then(|m| m.username.as_deref())
            .map(|username| format!(" by moderator @{username}"))
            .unwrap_or_default();

        let text = format!(
            "{status_text}\n\n\
             \u{1F4DD} <b>Listing:</b> {}\n\
             \u{1F194} <b>ID:</b> {}\n\
             \u{1F464} <b>Author:</b> {}\n\
             \u{23F0} <b>Processed:</b> {}{moderator_info}",
            post.title,
            post.id,
            post.author_id,
            post.updated_at.format("%H:%M %d.%m.%Y"),
        );

        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML",
        });

        self.send_message(body).await
    }
}
