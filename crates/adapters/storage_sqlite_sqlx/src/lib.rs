//! # falldetect-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `falldetect-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `falldetect-app` (for port traits) and `falldetect-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod error;
mod fall_event_repo;
mod link_repo;
mod pool;

pub use error::StorageError;
pub use fall_event_repo::SqliteFallEventRepository;
pub use link_repo::SqliteLinkRepository;
pub use pool::{Config, Database};
