pub mod error;
pub mod repository;
mod rows;
mod schema;

pub use error::StoreError;
pub use repository::SqliteStore;
