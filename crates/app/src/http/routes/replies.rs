use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use spiral_core::domain::Reply;
use spiral_core::ports::{Notice, Notifier};
use spiral_core::spiral::SpiralError;
use spiral_core::types::{PostId, ReplyId};
use tracing::info;

use crate::http::error::ApiError;
use crate::http::middleware::session::Session;
use crate::http::notices::NoticeSink;
use crate::http::routes::page::{open_view, SpiralPage, ViewParams};
use crate::inflight::{InflightKey, Operation};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewReplyBody {
    pub content: String,
    #[serde(default)]
    pub parent_reply_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReplyCreated {
    pub reply: Reply,
    pub page: SpiralPage,
}

pub async fn post_reply(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(post_id): Path<String>,
    Query(params): Query<ViewParams>,
    Json(body): Json<NewReplyBody>,
) -> Result<(StatusCode, Json<ReplyCreated>), ApiError> {
    let post_id = PostId::try_from(post_id)?;
    let target = body
        .parent_reply_id
        .map(ReplyId::try_from)
        .transpose()?;
    let request = params.parse()?;
    let mut sink = NoticeSink::new();
    let opened = open_view(&state, &session, post_id, &request, &sink).await;
    let (store, mut view) = (opened.store, opened.view);
    if let Err(err) = opened.loaded {
        return Err(ApiError::spiral(err, sink.drain(view.post_id())));
    }

    // Anonymous callers are turned away by the view before any write.
    let guard = match session.viewer.user_id() {
        Some(user_id) => {
            let key = InflightKey {
                user_id: user_id.clone(),
                post_id: view.post_id().clone(),
                operation: Operation::Submit(target.clone()),
            };
            match state.inflight.try_begin(key) {
                Some(guard) => Some(guard),
                None => {
                    let err = SpiralError::AlreadySubmitting;
                    sink.notifier().notify(Notice::error(err.user_message()));
                    return Err(ApiError::spiral(err, sink.drain(view.post_id())));
                }
            }
        }
        None => None,
    };

    let submitted = match view.write_draft(target.as_ref(), &body.content) {
        Ok(()) => view.submit_reply(target.as_ref(), &store, sink.notifier()).await,
        Err(err) => Err(err),
    };
    drop(guard);

    let notices = sink.drain(view.post_id());
    match submitted {
        Ok(reply) => {
            info!(
                post_id = %view.post_id(),
                reply_id = %reply.id,
                parent_reply_id = ?reply.parent_reply_id.as_ref().map(ReplyId::as_str),
                "reply added to spiral"
            );
            let page = SpiralPage::from_view(&view, notices);
            Ok((StatusCode::CREATED, Json(ReplyCreated { reply, page })))
        }
        Err(err) => {
            Err(ApiError::spiral(err, notices).with_composer(view.composer(target.as_ref())))
        }
    }
}
