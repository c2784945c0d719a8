//! Remote task collection.

pub mod repository;

pub use repository::TaskRepository;
