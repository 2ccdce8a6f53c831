pub mod ids;

pub use ids::{PostId, ReplyId, UserId, MAX_ID_LEN};
