/// Listing Service Library
///
/// Owns the post lifecycle for the Lystra classifieds platform: moderation
/// of new listings, publication, scheduled promotion ("boosts") and
/// expiration into the archive.
///
/// # Modules
///
/// - `models`: Data structures for posts, package entitlements, moderation
/// - `db`: Store contracts and their Postgres / in-memory implementations
/// - `services`: Business logic layer (post creation, the moderation gate
///   and its external collaborators)
/// - `jobs`: The three background workers and the scheduler that owns them
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Observability and metrics collection
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{ListingError, Result};
