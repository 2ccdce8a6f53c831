pub mod backend;
pub mod db;
pub mod memory;
pub mod rest;
pub mod session;

mod convert;

pub use backend::{Backend, BackendKind};
