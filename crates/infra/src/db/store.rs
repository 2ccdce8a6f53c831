use std::collections::HashMap;

use spiral_core::domain::{MediaMetadata, NewReply, Post, ReactionCounts, ReactionKind, Reply};
use spiral_core::ports::{ReplyStore, StoreError};
use spiral_core::types::{PostId, ReplyId, UserId};

use super::{
    delete_reaction, find_post, insert_discussion, insert_reaction, list_discussions,
    list_post_reaction_counts, list_reaction_counts, list_user_reactions, DbPool,
    DiscussionRecord, DiscussionsRepoError, NewDiscussionRecord,
};
use crate::convert::{parse_id, reaction_counts, viewer_reactions};

/// Spirals stored directly in Postgres.
#[derive(Debug, Clone)]
pub struct PgReplyStore {
    pool: DbPool,
}

impl PgReplyStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl ReplyStore for PgReplyStore {
    async fn fetch_post(&self, post_id: &PostId) -> Result<Option<Post>, StoreError> {
        let Some(record) = find_post(&self.pool, post_id.as_str()).await? else {
            return Ok(None);
        };
        let counts = list_post_reaction_counts(&self.pool, post_id.as_str()).await?;
        let media = match record.media_metadata {
            Some(value) if !value.is_null() => Some(
                serde_json::from_value::<MediaMetadata>(value)
                    .map_err(|err| StoreError::InvalidData(format!("media metadata: {err}")))?,
            ),
            _ => None,
        };
        Ok(Some(Post {
            id: parse_id(record.id)?,
            author_id: parse_id(record.user_id)?,
            title: record.title,
            content: record.content,
            tags: record.tags,
            reactions: reaction_counts(counts),
            media,
            release_at: record.release_at,
            created_at: record.created_at,
        }))
    }

    async fn fetch_replies(&self, post_id: &PostId) -> Result<Vec<Reply>, StoreError> {
        let records = list_discussions(&self.pool, post_id.as_str()).await?;
        let counts = list_reaction_counts(&self.pool, post_id.as_str()).await?;
        let mut by_discussion: HashMap<String, Vec<(String, i64)>> = HashMap::new();
        for count in counts {
            by_discussion
                .entry(count.discussion_id)
                .or_default()
                .push((count.kind, count.count));
        }
        records
            .into_iter()
            .map(|record| {
                let counts = by_discussion.remove(&record.id).unwrap_or_default();
                map_reply(record, reaction_counts(counts))
            })
            .collect()
    }

    async fn fetch_viewer_reactions(
        &self,
        post_id: &PostId,
        user_id: &UserId,
    ) -> Result<Vec<(ReplyId, ReactionKind)>, StoreError> {
        let pairs = list_user_reactions(&self.pool, post_id.as_str(), user_id.as_str()).await?;
        viewer_reactions(pairs)
    }

    async fn create_reply(&self, reply: &NewReply) -> Result<Reply, StoreError> {
        let record = insert_discussion(
            &self.pool,
            &NewDiscussionRecord {
                post_id: reply.post_id.as_str(),
                user_id: reply.author_id.as_str(),
                parent_discussion_id: reply.parent_reply_id.as_ref().map(ReplyId::as_str),
                content: &reply.content,
            },
        )
        .await?;
        map_reply(record, ReactionCounts::default())
    }

    async fn set_reaction(
        &self,
        reply_id: &ReplyId,
        user_id: &UserId,
        kind: ReactionKind,
        active: bool,
    ) -> Result<(), StoreError> {
        if active {
            insert_reaction(&self.pool, reply_id.as_str(), user_id.as_str(), kind.as_str()).await?;
        } else {
            delete_reaction(&self.pool, reply_id.as_str(), user_id.as_str(), kind.as_str()).await?;
        }
        Ok(())
    }
}

fn map_reply(record: DiscussionRecord, reactions: ReactionCounts) -> Result<Reply, StoreError> {
    Ok(Reply {
        id: parse_id(record.id)?,
        post_id: parse_id(record.post_id)?,
        author_id: parse_id(record.user_id)?,
        parent_reply_id: record.parent_discussion_id.map(parse_id).transpose()?,
        content: record.content,
        created_at: record.created_at,
        reactions,
    })
}

impl From<DiscussionsRepoError> for StoreError {
    fn from(err: DiscussionsRepoError) -> Self {
        match err {
            DiscussionsRepoError::Sqlx(sqlx::Error::Database(db)) => {
                StoreError::Rejected(db.message().to_string())
            }
            DiscussionsRepoError::Sqlx(
                err @ (sqlx::Error::ColumnDecode { .. }
                | sqlx::Error::ColumnNotFound(_)
                | sqlx::Error::Decode(_)),
            ) => StoreError::InvalidData(err.to_string()),
            DiscussionsRepoError::Sqlx(err) => StoreError::Unavailable(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use spiral_core::domain::{ReactionCounts, ReactionKind};
    use spiral_core::ports::StoreError;

    use super::map_reply;
    use crate::convert::reaction_counts;
    use crate::db::{DiscussionRecord, DiscussionsRepoError};

    fn record(parent: Option<&str>) -> DiscussionRecord {
        DiscussionRecord {
            id: "d2".to_string(),
            post_id: "p1".to_string(),
            user_id: "u1".to_string(),
            parent_discussion_id: parent.map(str::to_string),
            content: "second cup".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn maps_rows_to_replies() {
        let counts = reaction_counts(vec![("felt_that".to_string(), 3)]);
        let reply = map_reply(record(Some("d1")), counts).unwrap();
        assert_eq!(reply.id.as_str(), "d2");
        assert_eq!(reply.parent_reply_id.unwrap().as_str(), "d1");
        assert_eq!(reply.reactions.get(ReactionKind::FeltThat), 3);
    }

    #[test]
    fn rejects_rows_with_blank_ids() {
        let mut bad = record(None);
        bad.user_id = " ".to_string();
        let err = map_reply(bad, ReactionCounts::default()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[test]
    fn pool_errors_mean_the_backend_is_unavailable() {
        let err: StoreError = DiscussionsRepoError::Sqlx(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
