use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use spiral_core::types::PostId;
use tracing::warn;

use crate::http::error::ApiError;
use crate::http::middleware::session::Session;
use crate::http::notices::NoticeSink;
use crate::http::routes::page::{open_view, SpiralPage, ViewParams};
use crate::state::AppState;

/// Renders a post's spiral. Backend trouble still yields a page: an empty
/// spiral with an error notice.
pub async fn get_spiral(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(post_id): Path<String>,
    Query(params): Query<ViewParams>,
) -> Result<Json<SpiralPage>, ApiError> {
    let post_id = PostId::try_from(post_id)?;
    let request = params.parse()?;
    let mut sink = NoticeSink::new();
    let opened = open_view(&state, &session, post_id, &request, &sink).await;
    if let Err(err) = &opened.loaded {
        warn!(post_id = %opened.view.post_id(), error = %err, "spiral rendered without fresh data");
    }
    let notices = sink.drain(opened.view.post_id());
    Ok(Json(SpiralPage::from_view(&opened.view, notices)))
}
