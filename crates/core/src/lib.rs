pub mod domain;
pub mod error;
pub mod ports;
pub mod spiral;
pub mod types;
