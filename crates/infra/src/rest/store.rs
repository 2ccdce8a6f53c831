use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spiral_core::domain::{MediaMetadata, NewReply, Post, ReactionKind, Reply};
use spiral_core::ports::{ReplyStore, StoreError};
use spiral_core::types::{PostId, ReplyId, UserId};

use super::client::{eq, RestClient, RestError};
use crate::convert::{parse_id, reaction_counts, viewer_reactions};

const DISCUSSION_COLUMNS: &str =
    "id,post_id,user_id,parent_discussion_id,content,created_at,discussion_reactions(kind)";
const POST_COLUMNS: &str =
    "id,user_id,title,content,tags,media_metadata,release_at,created_at,post_reactions(kind)";

/// Spirals served by the hosted backend's table API.
#[derive(Debug, Clone)]
pub struct RestReplyStore {
    client: RestClient,
}

impl RestReplyStore {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    /// Same store, acting as the user behind `access_token`.
    pub fn for_session(&self, access_token: Option<&str>) -> Self {
        Self {
            client: self.client.with_access_token(access_token),
        }
    }
}

#[derive(Debug, Deserialize)]
struct KindRow {
    kind: String,
}

#[derive(Debug, Deserialize)]
struct DiscussionRow {
    id: String,
    post_id: String,
    user_id: String,
    parent_discussion_id: Option<String>,
    content: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    discussion_reactions: Vec<KindRow>,
}

#[derive(Debug, Deserialize)]
struct PostRow {
    id: String,
    user_id: String,
    title: String,
    content: String,
    tags: Option<Vec<String>>,
    media_metadata: Option<MediaMetadata>,
    release_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    post_reactions: Vec<KindRow>,
}

#[derive(Debug, Deserialize)]
struct ViewerReactionRow {
    discussion_id: String,
    kind: String,
}

#[derive(Debug, Serialize)]
struct NewDiscussionBody<'a> {
    post_id: &'a str,
    user_id: &'a str,
    parent_discussion_id: Option<&'a str>,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ReactionBody<'a> {
    discussion_id: &'a str,
    user_id: &'a str,
    kind: &'a str,
}

impl ReplyStore for RestReplyStore {
    async fn fetch_post(&self, post_id: &PostId) -> Result<Option<Post>, StoreError> {
        let rows: Vec<PostRow> = self
            .client
            .select(
                "posts",
                &[
                    ("select", POST_COLUMNS.to_string()),
                    ("id", eq(post_id.as_str())),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        rows.into_iter().next().map(map_post).transpose()
    }

    async fn fetch_replies(&self, post_id: &PostId) -> Result<Vec<Reply>, StoreError> {
        let rows: Vec<DiscussionRow> = self
            .client
            .select_all(
                "discussions",
                &[
                    ("select", DISCUSSION_COLUMNS.to_string()),
                    ("post_id", eq(post_id.as_str())),
                    ("order", "created_at.asc,id.asc".to_string()),
                ],
            )
            .await?;
        rows.into_iter().map(map_discussion).collect()
    }

    async fn fetch_viewer_reactions(
        &self,
        post_id: &PostId,
        user_id: &UserId,
    ) -> Result<Vec<(ReplyId, ReactionKind)>, StoreError> {
        let rows: Vec<ViewerReactionRow> = self
            .client
            .select_all(
                "discussion_reactions",
                &[
                    ("select", "discussion_id,kind,discussions!inner(post_id)".to_string()),
                    ("user_id", eq(user_id.as_str())),
                    ("discussions.post_id", eq(post_id.as_str())),
                    ("order", "discussion_id.asc,kind.asc".to_string()),
                ],
            )
            .await?;
        viewer_reactions(rows.into_iter().map(|row| (row.discussion_id, row.kind)))
    }

    async fn create_reply(&self, reply: &NewReply) -> Result<Reply, StoreError> {
        let row: DiscussionRow = self
            .client
            .insert_returning(
                "discussions",
                &NewDiscussionBody {
                    post_id: reply.post_id.as_str(),
                    user_id: reply.author_id.as_str(),
                    parent_discussion_id: reply.parent_reply_id.as_ref().map(ReplyId::as_str),
                    content: &reply.content,
                },
            )
            .await?;
        map_discussion(row)
    }

    async fn set_reaction(
        &self,
        reply_id: &ReplyId,
        user_id: &UserId,
        kind: ReactionKind,
        active: bool,
    ) -> Result<(), StoreError> {
        if active {
            self.client
                .insert_ignoring_duplicates(
                    "discussion_reactions",
                    &ReactionBody {
                        discussion_id: reply_id.as_str(),
                        user_id: user_id.as_str(),
                        kind: kind.as_str(),
                    },
                )
                .await?;
        } else {
            self.client
                .delete(
                    "discussion_reactions",
                    &[
                        ("discussion_id", eq(reply_id.as_str())),
                        ("user_id", eq(user_id.as_str())),
                        ("kind", eq(kind.as_str())),
                    ],
                )
                .await?;
        }
        Ok(())
    }
}

impl From<RestError> for StoreError {
    fn from(err: RestError) -> Self {
        match &err {
            RestError::Status { status, .. } if status.is_client_error() => {
                StoreError::Rejected(err.to_string())
            }
            RestError::InvalidResponse(_) => StoreError::InvalidData(err.to_string()),
            RestError::Http(_) | RestError::Status { .. } => {
                StoreError::Unavailable(err.to_string())
            }
        }
    }
}

fn kind_counts(rows: Vec<KindRow>) -> impl Iterator<Item = (String, i64)> {
    rows.into_iter().map(|row| (row.kind, 1))
}

fn map_discussion(row: DiscussionRow) -> Result<Reply, StoreError> {
    Ok(Reply {
        id: parse_id(row.id)?,
        post_id: parse_id(row.post_id)?,
        author_id: parse_id(row.user_id)?,
        parent_reply_id: row.parent_discussion_id.map(parse_id).transpose()?,
        content: row.content,
        created_at: row.created_at,
        reactions: reaction_counts(kind_counts(row.discussion_reactions)),
    })
}

fn map_post(row: PostRow) -> Result<Post, StoreError> {
    Ok(Post {
        id: parse_id(row.id)?,
        author_id: parse_id(row.user_id)?,
        title: row.title,
        content: row.content,
        tags: row.tags.unwrap_or_default(),
        reactions: reaction_counts(kind_counts(row.post_reactions)),
        media: row.media_metadata,
        release_at: row.release_at,
        created_at: row.created_at,
    })
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;
    use spiral_core::domain::ReactionKind;
    use spiral_core::ports::StoreError;

    use super::{map_discussion, map_post, DiscussionRow, PostRow};
    use crate::rest::RestError;

    #[test]
    fn discussion_rows_fold_embedded_reactions() {
        let row: DiscussionRow = serde_json::from_value(json!({
            "id": "r2",
            "post_id": "p1",
            "user_id": "u1",
            "parent_discussion_id": "r1",
            "content": "same here",
            "created_at": "2024-03-01T10:00:00.123456+00:00",
            "discussion_reactions": [
                {"kind": "felt_that"},
                {"kind": "felt_that"},
                {"kind": "same_spiral"},
                {"kind": "confetti"}
            ]
        }))
        .unwrap();
        let reply = map_discussion(row).unwrap();
        assert_eq!(reply.parent_reply_id.unwrap().as_str(), "r1");
        assert_eq!(reply.reactions.get(ReactionKind::FeltThat), 2);
        assert_eq!(reply.reactions.get(ReactionKind::SameSpiral), 1);
        assert_eq!(reply.reactions.total(), 3);
    }

    #[test]
    fn rows_with_blank_ids_are_invalid_data() {
        let row: DiscussionRow = serde_json::from_value(json!({
            "id": " ",
            "post_id": "p1",
            "user_id": "u1",
            "parent_discussion_id": null,
            "content": "hi",
            "created_at": "2024-03-01T10:00:00Z"
        }))
        .unwrap();
        assert!(matches!(map_discussion(row), Err(StoreError::InvalidData(_))));
    }

    #[test]
    fn post_rows_tolerate_null_tags_and_media() {
        let row: PostRow = serde_json::from_value(json!({
            "id": "p1",
            "user_id": "u9",
            "title": "late night",
            "content": "thinking about spirals",
            "tags": null,
            "media_metadata": null,
            "release_at": "2030-01-01T00:00:00Z",
            "created_at": "2024-03-01T09:00:00Z",
            "post_reactions": [{"kind": "mind_blown"}]
        }))
        .unwrap();
        let post = map_post(row).unwrap();
        assert!(post.tags.is_empty());
        assert!(post.media.is_none());
        assert!(post.release_at.is_some());
        assert_eq!(post.reactions.get(ReactionKind::MindBlown), 1);
    }

    #[test]
    fn client_errors_are_rejections_and_server_errors_are_outages() {
        let rejected = StoreError::from(RestError::Status {
            status: StatusCode::FORBIDDEN,
            body: "row-level security".to_string(),
        });
        assert!(matches!(rejected, StoreError::Rejected(_)));

        let outage = StoreError::from(RestError::Status {
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        });
        assert!(matches!(outage, StoreError::Unavailable(_)));

        let garbage = StoreError::from(RestError::InvalidResponse("oops".to_string()));
        assert!(matches!(garbage, StoreError::InvalidData(_)));
    }
}
