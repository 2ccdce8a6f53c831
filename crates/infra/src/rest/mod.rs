pub mod client;
pub mod store;

pub use client::{eq, RestClient, RestError};
pub use store::RestReplyStore;
