pub mod post;
pub mod reaction;
pub mod reply;

pub use post::{MediaMetadata, Post};
pub use reaction::{ReactionCounts, ReactionKind, QUICK_REACTIONS};
pub use reply::{normalize_content, NewReply, Reply};
