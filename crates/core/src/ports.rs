//! Seams between the spiral model and the outside world: the hosted storage
//! backend and the user-facing notification surface.

use std::future::Future;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::domain::{NewReply, Post, ReactionKind, Reply};
use crate::types::{PostId, ReplyId, UserId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend rejected request: {0}")]
    Rejected(String),
    #[error("invalid backend data: {0}")]
    InvalidData(String),
}

/// Storage collaborator for spirals. Every call is a single round trip.
pub trait ReplyStore {
    /// `Ok(None)` when the post does not exist or is not visible to the caller.
    fn fetch_post(
        &self,
        post_id: &PostId,
    ) -> impl Future<Output = Result<Option<Post>, StoreError>> + Send;

    /// All replies of a post, oldest first.
    fn fetch_replies(
        &self,
        post_id: &PostId,
    ) -> impl Future<Output = Result<Vec<Reply>, StoreError>> + Send;

    /// Reactions the given user has placed on replies of a post.
    fn fetch_viewer_reactions(
        &self,
        post_id: &PostId,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Vec<(ReplyId, ReactionKind)>, StoreError>> + Send;

    fn create_reply(
        &self,
        reply: &NewReply,
    ) -> impl Future<Output = Result<Reply, StoreError>> + Send;

    /// Idempotent: adding an existing reaction or removing a missing one is a no-op.
    fn set_reaction(
        &self,
        reply_id: &ReplyId,
        user_id: &UserId,
        kind: ReactionKind,
        active: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient, user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Fire-and-forget notification surface; delivery is best effort.
pub trait Notifier {
    fn notify(&self, notice: Notice);
}

impl Notifier for UnboundedSender<Notice> {
    fn notify(&self, notice: Notice) {
        // A closed receiver means nobody is looking anymore.
        let _ = self.send(notice);
    }
}
