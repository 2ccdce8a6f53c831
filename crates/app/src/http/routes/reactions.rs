use axum::extract::{Extension, Path, State};
use axum::Json;
use serde::Serialize;
use spiral_core::domain::ReactionKind;
use spiral_core::ports::{Notice, Notifier};
use spiral_core::spiral::{ReactionDisplay, SpiralError};
use spiral_core::types::{PostId, ReplyId};
use tracing::info;

use crate::http::error::ApiError;
use crate::http::middleware::session::Session;
use crate::http::notices::NoticeSink;
use crate::http::routes::page::{open_view, ViewRequest};
use crate::inflight::{InflightKey, Operation};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ReactionToggled {
    pub reply_id: ReplyId,
    pub kind: ReactionKind,
    pub active: bool,
    pub reactions: ReactionDisplay,
    pub notices: Vec<Notice>,
}

pub async fn toggle_reaction(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path((post_id, reply_id, kind)): Path<(String, String, String)>,
) -> Result<Json<ReactionToggled>, ApiError> {
    let post_id = PostId::try_from(post_id)?;
    let reply_id = ReplyId::try_from(reply_id)?;
    let kind: ReactionKind = kind.parse()?;
    let mut sink = NoticeSink::new();
    let opened = open_view(&state, &session, post_id, &ViewRequest::default(), &sink).await;
    let (store, mut view) = (opened.store, opened.view);
    if let Err(err) = opened.loaded {
        return Err(ApiError::spiral(err, sink.drain(view.post_id())));
    }

    let guard = match session.viewer.user_id() {
        Some(user_id) => {
            let key = InflightKey {
                user_id: user_id.clone(),
                post_id: view.post_id().clone(),
                operation: Operation::React(reply_id.clone(), kind),
            };
            match state.inflight.try_begin(key) {
                Some(guard) => Some(guard),
                None => {
                    let err = SpiralError::ReactionPending;
                    sink.notifier().notify(Notice::error(err.user_message()));
                    return Err(ApiError::spiral(err, sink.drain(view.post_id())));
                }
            }
        }
        None => None,
    };
    let toggled = view
        .toggle_reaction(&reply_id, kind, &store, sink.notifier())
        .await;
    drop(guard);

    let notices = sink.drain(view.post_id());
    let active = toggled.map_err(|err| ApiError::spiral(err, notices.clone()))?;
    let reactions = view
        .reaction_display(&reply_id)
        .ok_or_else(|| ApiError::spiral(SpiralError::ReplyNotFound(reply_id.clone()), Vec::new()))?;
    info!(
        post_id = %view.post_id(),
        reply_id = %reply_id,
        kind = %kind,
        active,
        "reaction toggled"
    );
    Ok(Json(ReactionToggled {
        reply_id,
        kind,
        active,
        reactions,
        notices,
    }))
}
