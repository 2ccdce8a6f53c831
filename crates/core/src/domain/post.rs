use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::reaction::ReactionCounts;
use crate::types::{PostId, UserId};

/// A thought, as far as spirals care about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub reactions: ReactionCounts,
    pub media: Option<MediaMetadata>,
    /// Scheduled posts stay closed until this instant.
    pub release_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub url: String,
    pub mime_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Post {
    pub fn is_released(&self, now: DateTime<Utc>) -> bool {
        self.release_at.is_none_or(|release_at| release_at <= now)
    }
}
