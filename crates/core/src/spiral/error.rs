use thiserror::Error;

use crate::error::CoreError;
use crate::ports::StoreError;
use crate::types::ReplyId;

#[derive(Debug, Error)]
pub enum SpiralError {
    #[error(transparent)]
    Invalid(#[from] CoreError),
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("a reply is already being added here")]
    AlreadySubmitting,
    #[error("that reaction is still being saved")]
    ReactionPending,
    #[error("reply not found: {0}")]
    ReplyNotFound(ReplyId),
    #[error("post not found")]
    PostNotFound,
    #[error("post is not released yet")]
    NotReleased,
    #[error("backend error: {0}")]
    Backend(#[from] StoreError),
}

impl SpiralError {
    /// Text suitable for a toast. Backend details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            SpiralError::Invalid(CoreError::EmptyContent) => {
                "Write something before adding to the spiral".to_string()
            }
            SpiralError::AuthenticationRequired => "Sign in to join the spiral".to_string(),
            SpiralError::Backend(_) => {
                "The café backend did not answer, please try again".to_string()
            }
            other => other.to_string(),
        }
    }
}
