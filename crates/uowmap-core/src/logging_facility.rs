//! Structured logging facility
//!
//! - Single initialization point via `init(profile)`
//! - Structured boundary macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! Session boundaries (`UnitOfWork::commit`, lazy loads in `get_by_id`) log
//! through the macros. Lower layers (registry, store) use `tracing::debug!`.
//!
//! # Usage
//!
//! ```rust
//! use uowmap_core::logging_facility::{init, Profile};
//!
//! // Initialize once at application startup
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
