use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::http::middleware::session;
use crate::http::routes::{health, reactions, replies, spiral};
use crate::state::AppState;

pub fn build(state: AppState) -> Router {
    let cors = build_cors(&state.config.cors_allow_origins);
    let mut router = Router::new()
        .route("/health", get(health::health))
        .route("/v1/posts/{post_id}/spiral", get(spiral::get_spiral))
        .route("/v1/posts/{post_id}/replies", post(replies::post_reply))
        .route(
            "/v1/posts/{post_id}/replies/{reply_id}/reactions/{kind}/toggle",
            post(reactions::toggle_reaction),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::attach_session,
        ))
        .with_state(state);
    if let Some(cors) = cors {
        router = router.layer(cors);
    }
    router
}

fn build_cors(allow_origins: &[String]) -> Option<CorsLayer> {
    let mut origins = Vec::new();
    let mut allow_any = false;
    for origin in allow_origins {
        if is_wildcard_origin(origin) {
            allow_any = true;
            break;
        }
        match HeaderValue::from_str(origin.trim()) {
            Ok(value) => origins.push(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "invalid CORS origin ignored");
            }
        }
    }

    if !allow_any && origins.is_empty() {
        return None;
    }

    let cors = CorsLayer::new().allow_methods([Method::GET, Method::POST, Method::OPTIONS]);
    if allow_any {
        Some(cors.allow_origin(Any).allow_headers(Any))
    } else {
        Some(
            cors.allow_origin(AllowOrigin::list(origins))
                .allow_headers([CONTENT_TYPE, AUTHORIZATION]),
        )
    }
}

fn is_wildcard_origin(origin: &str) -> bool {
    origin.trim() == "*"
}
