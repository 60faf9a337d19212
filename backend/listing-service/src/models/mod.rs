/// Data models for listing-service
///
/// This module defines structures for:
/// - Post: classified listings and their lifecycle status
/// - PackageSnapshot: entitlements copied from the purchased package
/// - BoostSchedule / FreePostQuota: promotion cursor and free-tier throttle
/// - Moderation: AI verdicts, audit records and moderator decisions
pub mod boost;
pub mod moderation;
pub mod package;
pub mod post;

pub use boost::{BoostSchedule, FreePostQuota};
pub use moderation::{
    AiDecision, AiVerdict, DecisionOutcome, GateOutcome, ModerationDecision, ModerationRecord,
    ModeratorAction, ModeratorInfo,
};
pub use package::{PackageSnapshot, PackageType};
pub use post::{Post, PostStatus, PostType, PostView};
