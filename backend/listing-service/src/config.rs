/// Configuration management for Listing Service
///
/// This module handles loading and managing configuration from environment
/// variables.
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// AI moderation configuration
    pub moderation: ModerationConfig,
    /// Telegram moderator-channel configuration
    pub telegram: TelegramConfig,
    /// Background scheduler configuration
    pub scheduler: SchedulerConfig,
    /// Post creation configuration
    pub posts: PostConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
}

/// AI moderation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// API key for the moderation model; AI moderation is disabled when absent
    pub api_key: Option<String>,
    /// Chat-completions endpoint base URL
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Per-call timeout for the moderation API
    pub timeout_secs: u64,
    /// Rejections at or below this confidence still go to a human
    pub auto_block_confidence: f32,
}

/// Telegram moderator-channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token; notifications are disabled when absent
    pub bot_token: Option<String>,
    /// Chat where moderation requests are posted
    pub moderator_chat_id: Option<String>,
}

/// Background scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Expiration worker polling interval (seconds)
    pub expiration_interval_secs: u64,
    /// Boost worker polling interval (seconds)
    pub boost_interval_secs: u64,
    /// Cleanup worker polling interval (seconds)
    pub cleanup_interval_secs: u64,
    /// Delay before retrying a worker tick after an error (seconds)
    pub error_backoff_secs: u64,
    /// Moderation log retention window (days)
    pub moderation_log_retention_days: i64,
    /// Post view retention window (days)
    pub post_view_retention_days: i64,
    /// How long shutdown waits for in-flight sweeps to drain (seconds)
    pub shutdown_timeout_secs: u64,
}

/// Post creation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostConfig {
    /// Lifetime for posts created without a package (days)
    pub default_lifetime_days: i64,
    /// Cooldown between free posts per user (days)
    pub free_post_cooldown_days: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let telegram = TelegramConfig {
            bot_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            moderator_chat_id: std::env::var("TELEGRAM_MODERATOR_CHAT_ID").ok(),
        };

        // Manual review is the safety backstop for every uncertain listing;
        // production must have a moderator channel to route it to.
        if app_env.eq_ignore_ascii_case("production")
            && (telegram.bot_token.is_none() || telegram.moderator_chat_id.is_none())
        {
            return Err(
                "TELEGRAM_BOT_TOKEN and TELEGRAM_MODERATOR_CHAT_ID must be set in production"
                    .to_string(),
            );
        }

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: std::env::var("LISTING_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("LISTING_SERVICE_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8085),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/lystra".to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(10),
            },
            moderation: ModerationConfig {
                api_key: std::env::var("MISTRAL_API_KEY").ok(),
                base_url: std::env::var("MISTRAL_BASE_URL")
                    .unwrap_or_else(|_| "https://api.mistral.ai/v1".to_string()),
                model: std::env::var("MISTRAL_MODEL")
                    .unwrap_or_else(|_| "mistral-small-latest".to_string()),
                timeout_secs: env_u64("MODERATION_TIMEOUT_SECS", 30),
                auto_block_confidence: parse_env_or_default(
                    "MODERATION_AUTO_BLOCK_CONFIDENCE",
                    0.8,
                )?,
            },
            telegram,
            scheduler: SchedulerConfig {
                expiration_interval_secs: env_u64("EXPIRATION_INTERVAL_SECS", 3600),
                boost_interval_secs: env_u64("BOOST_INTERVAL_SECS", 1800),
                cleanup_interval_secs: env_u64("CLEANUP_INTERVAL_SECS", 86_400),
                error_backoff_secs: env_u64("WORKER_ERROR_BACKOFF_SECS", 60),
                moderation_log_retention_days: env_i64("MODERATION_LOG_RETENTION_DAYS", 30),
                post_view_retention_days: env_i64("POST_VIEW_RETENTION_DAYS", 90),
                shutdown_timeout_secs: env_u64("SCHEDULER_SHUTDOWN_TIMEOUT_SECS", 30),
            },
            posts: PostConfig {
                default_lifetime_days: env_i64("DEFAULT_POST_LIFETIME_DAYS", 30),
                free_post_cooldown_days: env_i64("FREE_POST_COOLDOWN_DAYS", 7),
            },
        })
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_or_default(key: &str, default: f32) -> Result<f32, String> {
    match std::env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}
