use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid {kind}: {value:?}")]
    InvalidId { kind: &'static str, value: String },
    #[error("unknown reaction kind: {0}")]
    UnknownReaction(String),
    #[error("reply content is empty")]
    EmptyContent,
    #[error("reply content exceeds {0} characters")]
    ContentTooLong(usize),
}
