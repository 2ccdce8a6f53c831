use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use reqwest::Client;
use spiral_core::domain::{Post, ReactionCounts, ReactionKind, Reply};
use spiral_core::error::CoreError;
use spiral_core::ports::{ReplyStore, StoreError};
use spiral_core::types::{PostId, ReplyId, UserId};
use spiral_infra::db::{connect_lazy, DbPoolError, PgReplyStore};
use spiral_infra::memory::MemoryReplyStore;
use spiral_infra::rest::{RestClient, RestReplyStore};
use spiral_infra::session::SessionVerifier;
use spiral_infra::{Backend, BackendKind};
use thiserror::Error;
use tracing::info;

use crate::config::AppConfig;
use crate::inflight::InflightRegistry;
use crate::state::AppState;

pub const DEMO_POST_ID: &str = "welcome-to-the-cafe";

#[derive(Debug, Error)]
pub enum WiringError {
    #[error("missing setting: {0}")]
    MissingSetting(&'static str),
    #[error("db pool error: {0}")]
    Db(#[from] DbPoolError),
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("demo data error: {0}")]
    Demo(String),
}

impl From<CoreError> for WiringError {
    fn from(err: CoreError) -> Self {
        WiringError::Demo(err.to_string())
    }
}

impl From<StoreError> for WiringError {
    fn from(err: StoreError) -> Self {
        WiringError::Demo(err.to_string())
    }
}

pub fn build_state(config: AppConfig) -> Result<AppState, WiringError> {
    let mut db = None;
    let store = match config.backend {
        BackendKind::Memory => Backend::Memory(MemoryReplyStore::new()),
        BackendKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or(WiringError::MissingSetting("SPIRAL_DATABASE_URL"))?;
            let pool = connect_lazy(url, config.db_max_connections, config.request_timeout)?;
            db = Some(pool.clone());
            Backend::Postgres(PgReplyStore::new(pool))
        }
        BackendKind::Rest => {
            let url = config
                .rest_url
                .as_deref()
                .ok_or(WiringError::MissingSetting("SPIRAL_REST_URL"))?;
            let api_key = config
                .rest_api_key
                .clone()
                .ok_or(WiringError::MissingSetting("SPIRAL_REST_API_KEY"))?;
            let http = Client::builder().timeout(config.request_timeout).build()?;
            Backend::Rest(RestReplyStore::new(RestClient::new(http, url, api_key)))
        }
    };
    let sessions = config
        .jwt_secret
        .as_deref()
        .map(|secret| Arc::new(SessionVerifier::new(secret)));
    info!(
        backend = %store.kind(),
        sessions = sessions.is_some(),
        "spiral state wired"
    );
    Ok(AppState {
        config: Arc::new(config),
        store,
        db,
        sessions,
        inflight: Arc::new(InflightRegistry::default()),
    })
}

/// Fills an in-memory store with one post and a spiral deep enough to show
/// every affordance.
pub async fn seed_demo(store: &MemoryReplyStore) -> Result<(), WiringError> {
    let post_id = PostId::try_from(DEMO_POST_ID)?;
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).single().unwrap_or_else(Utc::now);
    store
        .insert_post(Post {
            id: post_id.clone(),
            author_id: UserId::try_from("barista")?,
            title: "What keeps you up at night?".to_string(),
            content: "Pour a cup and follow the thought wherever it spirals.".to_string(),
            tags: vec!["welcome".to_string(), "late-night".to_string()],
            reactions: [(ReactionKind::SendingWarmth, 3)].into_iter().collect(),
            media: None,
            release_at: None,
            created_at: start,
        })
        .await;

    let thread: [(&str, Option<&str>, &str, &str); 8] = [
        ("demo-1", None, "mika", "Whether the last message I sent sounded cold."),
        ("demo-2", Some("demo-1"), "jo", "It almost never reads the way we fear."),
        ("demo-3", Some("demo-2"), "mika", "Then why does the fear arrive first?"),
        ("demo-4", Some("demo-3"), "ren", "Because it is faster than reading."),
        ("demo-5", Some("demo-4"), "jo", "Faster, not truer."),
        ("demo-6", Some("demo-5"), "mika", "Writing that on a sticky note."),
        ("demo-7", Some("demo-6"), "ren", "Make two, one for the fridge."),
        ("demo-8", None, "sol", "Mostly whether I left the oven on."),
    ];
    for (step, (id, parent, author, content)) in thread.into_iter().enumerate() {
        store
            .insert_reply(Reply {
                id: ReplyId::try_from(id)?,
                post_id: post_id.clone(),
                author_id: UserId::try_from(author)?,
                parent_reply_id: parent.map(ReplyId::try_from).transpose()?,
                content: content.to_string(),
                created_at: start + Duration::minutes(step as i64 + 1),
                reactions: ReactionCounts::default(),
            })
            .await;
    }

    let reactions = [
        ("demo-1", "jo", ReactionKind::FeltThat),
        ("demo-1", "ren", ReactionKind::FeltThat),
        ("demo-2", "mika", ReactionKind::SendingWarmth),
        ("demo-5", "mika", ReactionKind::MindBlown),
    ];
    for (reply, user, kind) in reactions {
        store
            .set_reaction(&ReplyId::try_from(reply)?, &UserId::try_from(user)?, kind, true)
            .await?;
    }
    info!(post_id = %post_id, "demo spiral seeded");
    Ok(())
}
