use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::reaction::ReactionCounts;
use crate::error::CoreError;
use crate::types::{PostId, ReplyId, UserId};

/// One entry in a spiral. Replies are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub id: ReplyId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub parent_reply_id: Option<ReplyId>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reactions: ReactionCounts,
}

/// A reply that has passed validation and is ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReply {
    pub post_id: PostId,
    pub author_id: UserId,
    pub parent_reply_id: Option<ReplyId>,
    pub content: String,
}

pub fn normalize_content(raw: &str, max_chars: usize) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::EmptyContent);
    }
    if trimmed.chars().count() > max_chars {
        return Err(CoreError::ContentTooLong(max_chars));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::normalize_content;
    use crate::error::CoreError;

    #[test]
    fn whitespace_only_content_is_empty() {
        assert_eq!(normalize_content(" \n\t ", 10), Err(CoreError::EmptyContent));
    }

    #[test]
    fn content_is_trimmed_and_bounded_by_chars() {
        assert_eq!(normalize_content("  hi  ", 2).unwrap(), "hi");
        assert_eq!(normalize_content("☕☕☕", 3).unwrap(), "☕☕☕");
        assert_eq!(normalize_content("☕☕☕☕", 3), Err(CoreError::ContentTooLong(3)));
    }
}
