use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use super::DiscussionsRepoError;

#[derive(Debug, Clone)]
pub struct PostRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub media_metadata: Option<serde_json::Value>,
    pub release_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub async fn find_post(
    pool: &PgPool,
    post_id: &str,
) -> Result<Option<PostRecord>, DiscussionsRepoError> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, title, content, tags, media_metadata, release_at, created_at
        FROM posts
        WHERE id = $1
        "#,
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    Ok(Some(PostRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        tags: row.try_get("tags")?,
        media_metadata: row.try_get("media_metadata")?,
        release_at: row.try_get("release_at")?,
        created_at: row.try_get("created_at")?,
    }))
}

pub async fn list_post_reaction_counts(
    pool: &PgPool,
    post_id: &str,
) -> Result<Vec<(String, i64)>, DiscussionsRepoError> {
    let rows = sqlx::query(
        r#"
        SELECT kind, COUNT(*) AS count
        FROM post_reactions
        WHERE post_id = $1
        GROUP BY kind
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;
    let mut counts = Vec::with_capacity(rows.len());
    for row in rows {
        counts.push((row.try_get("kind")?, row.try_get("count")?));
    }
    Ok(counts)
}
