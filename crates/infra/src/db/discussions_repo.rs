use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscussionsRepoError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct DiscussionRecord {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub parent_discussion_id: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDiscussionRecord<'a> {
    pub post_id: &'a str,
    pub user_id: &'a str,
    pub parent_discussion_id: Option<&'a str>,
    pub content: &'a str,
}

#[derive(Debug, Clone)]
pub struct ReactionCountRecord {
    pub discussion_id: String,
    pub kind: String,
    pub count: i64,
}

pub async fn list_discussions(
    pool: &PgPool,
    post_id: &str,
) -> Result<Vec<DiscussionRecord>, DiscussionsRepoError> {
    let rows = sqlx::query(
        r#"
        SELECT id, post_id, user_id, parent_discussion_id, content, created_at
        FROM discussions
        WHERE post_id = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        records.push(map_discussion(&row)?);
    }
    Ok(records)
}

pub async fn insert_discussion(
    pool: &PgPool,
    record: &NewDiscussionRecord<'_>,
) -> Result<DiscussionRecord, DiscussionsRepoError> {
    let row = sqlx::query(
        r#"
        INSERT INTO discussions (post_id, user_id, parent_discussion_id, content)
        VALUES ($1, $2, $3, $4)
        RETURNING id, post_id, user_id, parent_discussion_id, content, created_at
        "#,
    )
    .bind(record.post_id)
    .bind(record.user_id)
    .bind(record.parent_discussion_id)
    .bind(record.content)
    .fetch_one(pool)
    .await?;
    Ok(map_discussion(&row)?)
}

pub async fn list_reaction_counts(
    pool: &PgPool,
    post_id: &str,
) -> Result<Vec<ReactionCountRecord>, DiscussionsRepoError> {
    let rows = sqlx::query(
        r#"
        SELECT r.discussion_id, r.kind, COUNT(*) AS count
        FROM discussion_reactions r
        JOIN discussions d ON d.id = r.discussion_id
        WHERE d.post_id = $1
        GROUP BY r.discussion_id, r.kind
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;
    let mut counts = Vec::with_capacity(rows.len());
    for row in rows {
        counts.push(ReactionCountRecord {
            discussion_id: row.try_get("discussion_id")?,
            kind: row.try_get("kind")?,
            count: row.try_get("count")?,
        });
    }
    Ok(counts)
}

/// `(discussion_id, kind)` pairs the user has reacted with under one post.
pub async fn list_user_reactions(
    pool: &PgPool,
    post_id: &str,
    user_id: &str,
) -> Result<Vec<(String, String)>, DiscussionsRepoError> {
    let rows = sqlx::query(
        r#"
        SELECT r.discussion_id, r.kind
        FROM discussion_reactions r
        JOIN discussions d ON d.id = r.discussion_id
        WHERE d.post_id = $1 AND r.user_id = $2
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    let mut pairs = Vec::with_capacity(rows.len());
    for row in rows {
        pairs.push((row.try_get("discussion_id")?, row.try_get("kind")?));
    }
    Ok(pairs)
}

pub async fn insert_reaction(
    pool: &PgPool,
    discussion_id: &str,
    user_id: &str,
    kind: &str,
) -> Result<bool, DiscussionsRepoError> {
    let result = sqlx::query(
        r#"
        INSERT INTO discussion_reactions (discussion_id, user_id, kind)
        VALUES ($1, $2, $3)
        ON CONFLICT (discussion_id, user_id, kind) DO NOTHING
        "#,
    )
    .bind(discussion_id)
    .bind(user_id)
    .bind(kind)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_reaction(
    pool: &PgPool,
    discussion_id: &str,
    user_id: &str,
    kind: &str,
) -> Result<bool, DiscussionsRepoError> {
    let result = sqlx::query(
        r#"
        DELETE FROM discussion_reactions
        WHERE discussion_id = $1 AND user_id = $2 AND kind = $3
        "#,
    )
    .bind(discussion_id)
    .bind(user_id)
    .bind(kind)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

fn map_discussion(row: &sqlx::postgres::PgRow) -> Result<DiscussionRecord, sqlx::Error> {
    Ok(DiscussionRecord {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        user_id: row.try_get("user_id")?,
        parent_discussion_id: row.try_get("parent_discussion_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}
