use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const MAX_ID_LEN: usize = 128;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<&str> for $name {
            type Error = CoreError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                normalize_id(value).map(Self).ok_or_else(|| CoreError::InvalidId {
                    kind: $label,
                    value: value.to_string(),
                })
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::try_from(value.as_str())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Identifier of a post, the root every spiral hangs off.
    PostId,
    "post id"
);
opaque_id!(
    /// Identifier of a single reply in a spiral.
    ReplyId,
    "reply id"
);
opaque_id!(UserId, "user id");

fn normalize_id(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_ID_LEN {
        return None;
    }
    if trimmed.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
        return None;
    }
    Some(trimmed.to_string())
}
