//! Verification of the access tokens the hosted auth service hands out.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use spiral_core::error::CoreError;
use spiral_core::types::UserId;
use thiserror::Error;

const LEEWAY_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("invalid session subject: {0}")]
    Subject(#[from] CoreError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// HS256 verifier for bearer access tokens. The `sub` claim is the user id.
#[derive(Clone)]
pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SessionVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Hosted auth tokens carry an audience this service does not pin.
        validation.validate_aud = false;
        validation.leeway = LEEWAY_SECS;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<UserId, SessionError> {
        let data = decode::<SessionClaims>(token.trim(), &self.key, &self.validation)?;
        Ok(UserId::try_from(data.claims.sub)?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::{SessionClaims, SessionError, SessionVerifier};

    const SECRET: &str = "cafe-secret";

    fn token(secret: &str, sub: &str, exp_offset: i64) -> String {
        let claims = SessionClaims {
            sub: sub.to_string(),
            exp: (Utc::now().timestamp() + exp_offset) as u64,
            role: Some("authenticated".to_string()),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_tokens_yield_the_subject() {
        let verifier = SessionVerifier::new(SECRET);
        let user = verifier.verify(&token(SECRET, "user-42", 600)).unwrap();
        assert_eq!(user.as_str(), "user-42");
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let verifier = SessionVerifier::new(SECRET);
        let err = verifier.verify(&token(SECRET, "user-42", -3600)).unwrap_err();
        assert!(matches!(err, SessionError::Token(_)));
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let verifier = SessionVerifier::new(SECRET);
        assert!(verifier.verify(&token("other", "user-42", 600)).is_err());
    }

    #[test]
    fn blank_subjects_are_rejected() {
        let verifier = SessionVerifier::new(SECRET);
        let err = verifier.verify(&token(SECRET, "  ", 600)).unwrap_err();
        assert!(matches!(err, SessionError::Subject(_)));
    }
}
