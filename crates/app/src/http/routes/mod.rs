pub mod health;
pub mod page;
pub mod reactions;
pub mod replies;
pub mod spiral;
