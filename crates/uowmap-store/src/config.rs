//! Store configuration
//!
//! ```toml
//! busy_timeout_ms = 2000
//! wal = true
//!
//! [location]
//! kind = "file"
//! path = ".uowmap/store.db"
//! ```

use crate::errors::{config_error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Where the database lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreLocation {
    /// Private in-memory database, alive as long as its provider
    Memory,
    File { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub location: StoreLocation,
    /// How long a connection waits on a locked database
    pub busy_timeout_ms: u64,
    /// Use write-ahead logging for file databases
    pub wal: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: StoreLocation::Memory,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            wal: true,
        }
    }
}

impl StoreConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File { path: path.into() },
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// `InvalidConfig` on malformed TOML or invalid values.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| config_error(format!("Invalid store config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// `InvalidConfig` when a file location has an empty path.
    pub fn validate(&self) -> Result<()> {
        if let StoreLocation::File { path } = &self.location {
            if path.as_os_str().is_empty() {
                return Err(config_error("File location requires a non-empty path"));
            }
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            StoreLocation::File { path } => Some(path),
            StoreLocation::Memory => None,
        }
    }
}
