//! uowmap Store - SQLite collaborators for the unit of work
//!
//! Provides:
//! - `SqliteProvider`: connections and transactions over a file or a
//!   shared in-memory SQLite database
//! - Embedded migrations with checksums
//! - The `User` entity and its `UserMapper`
//! - `StoreConfig` loaded from TOML

pub mod config;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod model;
pub mod provider;
pub mod repo;

// Re-export key types
pub use config::{StoreConfig, StoreLocation};
pub use errors::Result;
pub use model::{User, UserSnapshot};
pub use provider::SqliteProvider;
pub use repo::{open_session, user_mappers, UserMapper, Users};
