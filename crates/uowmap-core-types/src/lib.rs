//! Core types shared across uowmap crates
//!
//! This crate provides foundational types used by the unit of work,
//! the store and the logging facility:
//!
//! - **Identity**: `EntityId`, the 128-bit random key every entity carries
//! - **Schema constants**: Canonical field keys and event names

pub mod id;
pub mod schema;

pub use id::EntityId;
