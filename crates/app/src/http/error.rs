use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use spiral_core::error::CoreError;
use spiral_core::ports::{Notice, StoreError};
use spiral_core::spiral::{ComposerView, SpiralError};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Invalid(#[from] CoreError),
    #[error("{source}")]
    Spiral {
        source: SpiralError,
        notices: Vec<Notice>,
        /// The composer as it stood after the failure, draft included.
        composer: Option<ComposerView>,
    },
}

impl ApiError {
    pub fn spiral(source: SpiralError, notices: Vec<Notice>) -> Self {
        ApiError::Spiral {
            source,
            notices,
            composer: None,
        }
    }

    pub fn with_composer(self, view: Option<ComposerView>) -> Self {
        match self {
            ApiError::Spiral {
                source, notices, ..
            } => ApiError::Spiral {
                source,
                notices,
                composer: view,
            },
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::Spiral { source, .. } => spiral_status(source),
        }
    }
}

fn spiral_status(err: &SpiralError) -> StatusCode {
    match err {
        SpiralError::Invalid(_) => StatusCode::BAD_REQUEST,
        SpiralError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
        SpiralError::NotReleased => StatusCode::FORBIDDEN,
        SpiralError::PostNotFound | SpiralError::ReplyNotFound(_) => StatusCode::NOT_FOUND,
        SpiralError::AlreadySubmitting | SpiralError::ReactionPending => StatusCode::CONFLICT,
        // Row-level security denials surface as rejections.
        SpiralError::Backend(StoreError::Rejected(_)) => StatusCode::FORBIDDEN,
        SpiralError::Backend(_) => StatusCode::BAD_GATEWAY,
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    notices: Vec<Notice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    composer: Option<ComposerView>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(error = %self, "spiral api error");
        let status = self.status();
        let body = match self {
            ApiError::Invalid(err) => ErrorBody {
                error: err.to_string(),
                notices: Vec::new(),
                composer: None,
            },
            ApiError::Spiral {
                source,
                notices,
                composer,
            } => ErrorBody {
                error: source.user_message(),
                notices,
                composer,
            },
        };
        (status, Json(body)).into_response()
    }
}
