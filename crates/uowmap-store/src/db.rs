//! Database connection management
//!
//! Provides utilities for opening and configuring SQLite connections

use crate::config::StoreConfig;
use crate::errors::{from_rusqlite, Result};
use rusqlite::Connection;
use std::path::Path;

/// Open a SQLite database at the given path
///
/// `file:` URIs are accepted, so this also opens named in-memory databases.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

/// URI of a named in-memory database shared by every connection opening it
pub fn shared_memory_uri(name: &str) -> String {
    format!("file:{}?mode=memory&cache=shared", name)
}

/// Configure a freshly opened connection
pub fn configure(conn: &Connection, config: &StoreConfig) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", true)
        .map_err(from_rusqlite)?;

    conn.busy_timeout(config.busy_timeout())
        .map_err(from_rusqlite)?;

    // WAL only applies to file databases
    if config.wal && config.path().is_some() {
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(from_rusqlite)?;
        tracing::debug!(journal_mode = %mode, "connection configured");
    }

    Ok(())
}
