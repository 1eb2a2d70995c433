//! SQLite connection provider
//!
//! Every `open` returns a new configured connection. In-memory stores use a
//! uniquely named shared-cache database; the provider keeps one connection
//! to it open so the data outlives individual connections.

use crate::config::{StoreConfig, StoreLocation};
use crate::db;
use crate::errors::{from_rusqlite, io_error, Result};
use crate::migrations::apply_migrations;
use rusqlite::Connection;
use std::path::Path;
use std::rc::Rc;
use uowmap_core::ConnectionProvider;
use uuid::Uuid;

/// Cheap to clone; clones share the same database
#[derive(Clone)]
pub struct SqliteProvider {
    inner: Rc<Inner>,
}

struct Inner {
    config: StoreConfig,
    /// Path or `file:` URI handed to `Connection::open`
    target: String,
    /// Holds a shared in-memory database alive
    _keeper: Option<Connection>,
}

impl SqliteProvider {
    /// Open the store described by `config` and bring its schema up to date
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for an invalid config, `Io` when the parent directory
    /// of a file database cannot be created, persistence errors from SQLite
    /// or the migrations.
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;

        let (target, keeper) = match &config.location {
            StoreLocation::File { path } => {
                ensure_parent_dir(path)?;
                (path.to_string_lossy().into_owned(), None)
            }
            StoreLocation::Memory => {
                let name = format!("uowmap-mem-{}", Uuid::new_v4().simple());
                let uri = db::shared_memory_uri(&name);
                let keeper = db::open(&uri)?;
                (uri, Some(keeper))
            }
        };

        let provider = Self {
            inner: Rc::new(Inner {
                config,
                target,
                _keeper: keeper,
            }),
        };

        let mut conn = provider.connect()?;
        let applied = apply_migrations(&mut conn)?;
        tracing::debug!(location = %provider.inner.target, applied, "sqlite store opened");

        Ok(provider)
    }

    /// A private in-memory store
    ///
    /// # Errors
    ///
    /// See [`SqliteProvider::new`].
    pub fn in_memory() -> Result<Self> {
        Self::new(StoreConfig::memory())
    }

    /// A file store at `path` with default settings
    ///
    /// # Errors
    ///
    /// See [`SqliteProvider::new`].
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(StoreConfig::file(path.as_ref()))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    fn connect(&self) -> Result<Connection> {
        let conn = db::open(&self.inner.target)?;
        db::configure(&conn, &self.inner.config)?;
        Ok(conn)
    }
}

impl std::fmt::Debug for SqliteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteProvider")
            .field("target", &self.inner.target)
            .field("config", &self.inner.config)
            .finish()
    }
}

impl ConnectionProvider for SqliteProvider {
    type Connection = Connection;

    fn open(&self) -> Result<Connection> {
        self.connect()
    }

    fn begin(&self, conn: &mut Connection) -> Result<()> {
        // Take the write lock up front
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| from_rusqlite(e).with_op("begin"))
    }

    fn commit(&self, conn: &mut Connection) -> Result<()> {
        conn.execute_batch("COMMIT")
            .map_err(|e| from_rusqlite(e).with_op("commit"))
    }

    fn rollback(&self, conn: &mut Connection) -> Result<()> {
        if conn.is_autocommit() {
            return Ok(());
        }
        conn.execute_batch("ROLLBACK")
            .map_err(|e| from_rusqlite(e).with_op("rollback"))
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| io_error("create_store_dir", e))
        }
        _ => Ok(()),
    }
}
