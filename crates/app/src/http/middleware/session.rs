use axum::body::Body;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use spiral_core::spiral::Viewer;
use spiral_infra::session::SessionVerifier;
use tracing::debug;

use crate::state::AppState;

/// Who is calling, resolved once per request.
#[derive(Debug, Clone)]
pub struct Session {
    pub viewer: Viewer,
    /// Bearer token of a verified viewer, forwarded to backends that enforce
    /// row-level access. Unverified tokens are never kept.
    pub access_token: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self {
            viewer: Viewer::anonymous(),
            access_token: None,
        }
    }
}

/// Never rejects: a missing, expired or forged token just means an anonymous
/// viewer, and the spiral refuses writes on its own.
pub async fn attach_session(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = extract_bearer_token(&request);
    let session = resolve_session(state.sessions.as_deref(), token);
    request.extensions_mut().insert(session);
    next.run(request).await
}

fn resolve_session(verifier: Option<&SessionVerifier>, token: Option<String>) -> Session {
    let (Some(verifier), Some(token)) = (verifier, token) else {
        return Session::anonymous();
    };
    match verifier.verify(&token) {
        Ok(user_id) => Session {
            viewer: Viewer::signed_in(user_id),
            access_token: Some(token),
        },
        Err(err) => {
            debug!(error = %err, "session token rejected");
            Session::anonymous()
        }
    }
}

fn extract_bearer_token<B>(request: &Request<B>) -> Option<String> {
    let header = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, value) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use axum::http::header::AUTHORIZATION;
    use axum::http::Request;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use spiral_infra::session::{SessionClaims, SessionVerifier};

    use super::{extract_bearer_token, resolve_session};

    const SECRET: &str = "session-test-secret";

    fn signed(secret: &str, sub: &str, exp_offset: i64) -> String {
        let claims = SessionClaims {
            sub: sub.to_string(),
            exp: (Utc::now().timestamp() + exp_offset) as u64,
            role: None,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn request(header: Option<&str>) -> Request<()> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn bearer_tokens_are_extracted_case_insensitively() {
        assert_eq!(
            extract_bearer_token(&request(Some("Bearer abc.def"))).as_deref(),
            Some("abc.def")
        );
        assert_eq!(
            extract_bearer_token(&request(Some("bearer   xyz "))).as_deref(),
            Some("xyz")
        );
    }

    #[test]
    fn other_schemes_and_blank_tokens_are_ignored() {
        assert!(extract_bearer_token(&request(None)).is_none());
        assert!(extract_bearer_token(&request(Some("Basic dXNlcg=="))).is_none());
        assert!(extract_bearer_token(&request(Some("Bearer "))).is_none());
    }

    #[test]
    fn verified_tokens_are_forwarded() {
        let verifier = SessionVerifier::new(SECRET);
        let token = signed(SECRET, "mika", 600);
        let session = resolve_session(Some(&verifier), Some(token.clone()));
        assert_eq!(session.viewer.user_id().map(|id| id.as_str()), Some("mika"));
        assert_eq!(session.access_token.as_deref(), Some(token.as_str()));
    }

    #[test]
    fn rejected_tokens_are_dropped() {
        let verifier = SessionVerifier::new(SECRET);
        let forged = resolve_session(Some(&verifier), Some(signed("other-secret", "mika", 600)));
        assert!(forged.viewer.user_id().is_none());
        assert!(forged.access_token.is_none());

        let expired = resolve_session(Some(&verifier), Some(signed(SECRET, "mika", -3600)));
        assert!(expired.viewer.user_id().is_none());
        assert!(expired.access_token.is_none());

        let garbage = resolve_session(Some(&verifier), Some("not-a-jwt".to_string()));
        assert!(garbage.access_token.is_none());
    }

    #[test]
    fn tokens_are_dropped_without_a_verifier() {
        let session = resolve_session(None, Some(signed(SECRET, "mika", 600)));
        assert!(session.viewer.user_id().is_none());
        assert!(session.access_token.is_none());
    }
}
