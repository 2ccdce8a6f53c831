//! What every spiral endpoint shares: view parameters from the query string,
//! building a per-request view, and the rendered page.

use serde::{Deserialize, Serialize};
use spiral_core::domain::Post;
use spiral_core::error::CoreError;
use spiral_core::ports::Notice;
use spiral_core::spiral::{
    ComposerView, PostStatus, RenderNode, SpiralConfig, SpiralError, SpiralView,
};
use spiral_core::types::{PostId, ReplyId};
use spiral_infra::Backend;
use tracing::debug;

use crate::http::middleware::session::Session;
use crate::http::notices::NoticeSink;
use crate::state::AppState;

/// Per-node view state carried in the URL, since views do not outlive a request.
///
/// `expand`, `collapse` and `compose` are comma separated reply ids.
#[derive(Debug, Default, Deserialize)]
pub struct ViewParams {
    pub expand: Option<String>,
    pub collapse: Option<String>,
    pub compose: Option<String>,
    pub max_level: Option<usize>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ViewRequest {
    pub expand: Vec<ReplyId>,
    pub collapse: Vec<ReplyId>,
    pub compose: Vec<ReplyId>,
    pub max_level: Option<usize>,
}

impl ViewParams {
    pub fn parse(&self) -> Result<ViewRequest, CoreError> {
        Ok(ViewRequest {
            expand: id_list(self.expand.as_deref())?,
            collapse: id_list(self.collapse.as_deref())?,
            compose: id_list(self.compose.as_deref())?,
            max_level: self.max_level,
        })
    }
}

impl ViewRequest {
    /// Requests may lower the depth limit, never raise it.
    pub fn config(&self, base: &SpiralConfig) -> SpiralConfig {
        match self.max_level {
            Some(level) => base.with_max_level(level.min(base.max_level)),
            None => *base,
        }
    }

    /// Ids that are no longer in the spiral are skipped; links go stale.
    pub fn apply(&self, view: &mut SpiralView) {
        for id in &self.expand {
            if view.set_expanded(id, true).is_err() {
                debug!(reply_id = %id, "expand target not in spiral");
            }
        }
        for id in &self.collapse {
            if view.set_expanded(id, false).is_err() {
                debug!(reply_id = %id, "collapse target not in spiral");
            }
        }
        for id in &self.compose {
            if view.composer(Some(id)).is_some_and(|composer| !composer.visible) {
                let _ = view.toggle_composer(Some(id));
            }
        }
    }
}

fn id_list(raw: Option<&str>) -> Result<Vec<ReplyId>, CoreError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ReplyId::try_from)
        .collect()
}

#[derive(Debug, Serialize)]
pub struct SpiralPage {
    pub post_id: PostId,
    pub status: PostStatus,
    pub post: Option<Post>,
    pub max_level: usize,
    /// Replies attached to the spiral, rendered or not.
    pub total: usize,
    pub nodes: Vec<RenderNode>,
    /// The post-level composer.
    pub composer: Option<ComposerView>,
    pub notices: Vec<Notice>,
}

impl SpiralPage {
    pub fn from_view(view: &SpiralView, notices: Vec<Notice>) -> Self {
        Self {
            post_id: view.post_id().clone(),
            status: view.status(),
            post: view.post().cloned(),
            max_level: view.config().max_level,
            total: view.index().len(),
            nodes: view.render(),
            composer: view.composer(None),
            notices,
        }
    }
}

/// A loaded view for the caller, with the store acting on their behalf.
pub struct OpenedView {
    pub store: Backend,
    pub view: SpiralView,
    pub loaded: Result<(), SpiralError>,
}

pub async fn open_view(
    state: &AppState,
    session: &Session,
    post_id: PostId,
    request: &ViewRequest,
    sink: &NoticeSink,
) -> OpenedView {
    let store = state.store.for_session(session.access_token.as_deref());
    let mut view = SpiralView::new(
        post_id,
        session.viewer.clone(),
        request.config(&state.config.spiral),
    );
    let loaded = view.load(&store, sink.notifier()).await;
    request.apply(&mut view);
    OpenedView {
        store,
        view,
        loaded,
    }
}

#[cfg(test)]
mod tests {
    use spiral_core::spiral::SpiralConfig;

    use super::ViewParams;

    #[test]
    fn id_lists_skip_blanks() {
        let params = ViewParams {
            expand: Some("r1, r2,,".to_string()),
            collapse: None,
            compose: Some(" ".to_string()),
            max_level: None,
        };
        let request = params.parse().unwrap();
        let expand: Vec<&str> = request.expand.iter().map(|id| id.as_str()).collect();
        assert_eq!(expand, vec!["r1", "r2"]);
        assert!(request.collapse.is_empty());
        assert!(request.compose.is_empty());
    }

    #[test]
    fn oversized_ids_are_rejected() {
        let params = ViewParams {
            expand: Some("x".repeat(500)),
            ..ViewParams::default()
        };
        assert!(params.parse().is_err());
    }

    #[test]
    fn max_level_can_only_be_lowered() {
        let base = SpiralConfig::default();
        let lower = ViewParams {
            max_level: Some(1),
            ..ViewParams::default()
        };
        assert_eq!(lower.parse().unwrap().config(&base).max_level, 1);
        let higher = ViewParams {
            max_level: Some(50),
            ..ViewParams::default()
        };
        assert_eq!(higher.parse().unwrap().config(&base).max_level, base.max_level);
    }
}
