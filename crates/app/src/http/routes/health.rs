use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
    pub sessions: SessionStatus,
    pub database: DatabaseStatus,
    pub inflight_writes: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub configured: bool,
}

#[derive(Debug, Serialize)]
pub struct DatabaseStatus {
    pub configured: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: state.store.kind().as_str(),
        sessions: SessionStatus {
            configured: state.sessions.is_some(),
        },
        database: DatabaseStatus {
            configured: state.db.is_some(),
        },
        inflight_writes: state.inflight.len(),
    })
}
