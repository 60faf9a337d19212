use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::PostStatus;

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Post not found: {0}")]
    PostNotFound(Uuid),

    #[error("Free post quota exhausted, next free post at {next_free_at}")]
    FreeQuotaExhausted { next_free_at: DateTime<Utc> },

    #[error("Invalid post status transition: {from} -> {to}")]
    InvalidStatusTransition { from: PostStatus, to: PostStatus },

    #[error("AI moderation error: {0}")]
    Moderation(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for ListingError {
    fn from(err: validator::ValidationErrors) -> Self {
        ListingError::Validation(err.to_string())
    }
}

impl ResponseError for ListingError {
    fn status_code(&self) -> StatusCode {
        match self {
            ListingError::Database(_)
            | ListingError::Http(_)
            | ListingError::Config(_)
            | ListingError::Moderation(_)
            | ListingError::Notification(_)
            | ListingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ListingError::Validation(_) => StatusCode::BAD_REQUEST,
            ListingError::PostNotFound(_) => StatusCode::NOT_FOUND,
            ListingError::FreeQuotaExhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
            ListingError::InvalidStatusTransition { .. } => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        HttpResponse::build(status).json(serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }))
    }
}

pub type Result<T> = std::result::Result<T, ListingError>;
