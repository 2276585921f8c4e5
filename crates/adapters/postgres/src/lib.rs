//! aside-adapter-postgres - PostgreSQL 适配器

mod connection;
mod schema;
mod user_repository;

pub use connection::*;
pub use schema::*;
pub use user_repository::*;
