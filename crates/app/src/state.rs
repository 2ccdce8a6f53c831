use std::sync::Arc;

use spiral_infra::db::DbPool;
use spiral_infra::session::SessionVerifier;
use spiral_infra::Backend;

use crate::config::AppConfig;
use crate::inflight::InflightRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Backend,
    pub db: Option<DbPool>,
    pub sessions: Option<Arc<SessionVerifier>>,
    pub inflight: Arc<InflightRegistry>,
}
