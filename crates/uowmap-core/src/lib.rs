//! uowmap Core - Unit of Work with an Identity Map
//!
//! This crate provides the session-scoped change tracker:
//! - `Entity` with snapshot-based dirty checking (`Baseline`)
//! - `EntityMapper` capability and the `MapperRegistry` that resolves it
//! - `ConnectionProvider` abstraction with a scoped `Transaction` guard
//! - `UnitOfWork`: identity map, new/tracked/deleted sets, atomic commit
//! - `Repository`: typed facade over a unit of work
//!
//! The core knows nothing about a concrete backing store; see `uowmap-store`
//! for the SQLite collaborators.

pub mod entity;
pub mod errors;
mod identity_map;
pub mod logging_facility;
pub mod mapper;
pub mod provider;
pub mod repository;
pub mod unit_of_work;

pub use uowmap_core_types::{schema, EntityId};

// Re-export commonly used types
pub use entity::{share, Baseline, Entity, EntityKind, Shared};
pub use errors::{ExError, ExErrorKind, Result, UowError};
pub use mapper::{EntityMapper, MapperRegistry};
pub use provider::{ConnectionProvider, Transaction};
pub use repository::Repository;
pub use unit_of_work::{CommitSummary, PendingChanges, UnitOfWork};
