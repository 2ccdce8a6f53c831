use std::fmt;
use std::str::FromStr;

use spiral_core::domain::{NewReply, Post, ReactionKind, Reply};
use spiral_core::ports::{ReplyStore, StoreError};
use spiral_core::types::{PostId, ReplyId, UserId};
use thiserror::Error;

use crate::db::PgReplyStore;
use crate::memory::MemoryReplyStore;
use crate::rest::RestReplyStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Postgres,
    Rest,
}

#[derive(Debug, Error)]
#[error("unknown backend `{0}` (expected memory, postgres or rest)")]
pub struct UnknownBackend(pub String);

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Postgres => "postgres",
            BackendKind::Rest => "rest",
        }
    }
}

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "postgres" | "pg" => Ok(BackendKind::Postgres),
            "rest" => Ok(BackendKind::Rest),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The store the service was configured with.
#[derive(Debug, Clone)]
pub enum Backend {
    Memory(MemoryReplyStore),
    Postgres(PgReplyStore),
    Rest(RestReplyStore),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Memory(_) => BackendKind::Memory,
            Backend::Postgres(_) => BackendKind::Postgres,
            Backend::Rest(_) => BackendKind::Rest,
        }
    }

    /// Store to use for one request. Only the REST backend forwards the
    /// caller's token; the others trust the already verified user id.
    pub fn for_session(&self, access_token: Option<&str>) -> Backend {
        match self {
            Backend::Rest(store) => Backend::Rest(store.for_session(access_token)),
            other => other.clone(),
        }
    }
}

impl ReplyStore for Backend {
    async fn fetch_post(&self, post_id: &PostId) -> Result<Option<Post>, StoreError> {
        match self {
            Backend::Memory(store) => store.fetch_post(post_id).await,
            Backend::Postgres(store) => store.fetch_post(post_id).await,
            Backend::Rest(store) => store.fetch_post(post_id).await,
        }
    }

    async fn fetch_replies(&self, post_id: &PostId) -> Result<Vec<Reply>, StoreError> {
        match self {
            Backend::Memory(store) => store.fetch_replies(post_id).await,
            Backend::Postgres(store) => store.fetch_replies(post_id).await,
            Backend::Rest(store) => store.fetch_replies(post_id).await,
        }
    }

    async fn fetch_viewer_reactions(
        &self,
        post_id: &PostId,
        user_id: &UserId,
    ) -> Result<Vec<(ReplyId, ReactionKind)>, StoreError> {
        match self {
            Backend::Memory(store) => store.fetch_viewer_reactions(post_id, user_id).await,
            Backend::Postgres(store) => store.fetch_viewer_reactions(post_id, user_id).await,
            Backend::Rest(store) => store.fetch_viewer_reactions(post_id, user_id).await,
        }
    }

    async fn create_reply(&self, reply: &NewReply) -> Result<Reply, StoreError> {
        match self {
            Backend::Memory(store) => store.create_reply(reply).await,
            Backend::Postgres(store) => store.create_reply(reply).await,
            Backend::Rest(store) => store.create_reply(reply).await,
        }
    }

    async fn set_reaction(
        &self,
        reply_id: &ReplyId,
        user_id: &UserId,
        kind: ReactionKind,
        active: bool,
    ) -> Result<(), StoreError> {
        match self {
            Backend::Memory(store) => store.set_reaction(reply_id, user_id, kind, active).await,
            Backend::Postgres(store) => store.set_reaction(reply_id, user_id, kind, active).await,
            Backend::Rest(store) => store.set_reaction(reply_id, user_id, kind, active).await,
        }
    }
}
