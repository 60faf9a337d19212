/// Business logic layer
pub mod ai_moderator;
pub mod moderation;
pub mod notifier;
pub mod posts;
pub mod refunds;

pub use ai_moderator::{AiModerator, MistralModerator};
pub use moderation::ModerationGate;
pub use notifier::{ModeratorNotifier, TelegramNotifier};
pub use posts::{CreatePostInput, CreatedPost, FreePostAvailability, PostService};
pub use refunds::{PackageRefundHook, RefundHook};
