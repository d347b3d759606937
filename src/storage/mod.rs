//! Key/value configuration stores.
//!
//! The watcher never owns its configuration file. It reads a table at
//! startup and writes the whole table back when the watched-target list
//! changes.
//!
//! ## Layout
//!
//! ```text
//! storage/
//! └── config.toml           # [watcher] [otp] [pushover] [server] [[targets]]
//! ```

pub mod local;

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};

// Re-export for convenience
pub use local::LocalConfigStore;

/// Trait for configuration backends.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Read the full key/value table. A missing store reads as empty.
    async fn read(&self) -> Result<toml::Table>;

    /// Replace the full key/value table.
    async fn write(&self, table: &toml::Table) -> Result<()>;
}

/// In-memory store, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    table: Mutex<toml::Table>,
    fail_writes: bool,
}

impl MemoryConfigStore {
    pub fn new(table: toml::Table) -> Self {
        Self {
            table: Mutex::new(table),
            fail_writes: false,
        }
    }

    /// A store whose writes always fail.
    pub fn failing(table: toml::Table) -> Self {
        Self {
            table: Mutex::new(table),
            fail_writes: true,
        }
    }

    pub fn snapshot(&self) -> toml::Table {
        self.table.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn read(&self) -> Result<toml::Table> {
        self.table
            .lock()
            .map(|t| t.clone())
            .map_err(|e| AppError::config(format!("config store poisoned: {e}")))
    }

    async fn write(&self, table: &toml::Table) -> Result<()> {
        if self.fail_writes {
            return Err(AppError::persistence("memory store is read-only"));
        }
        let mut guard = self
            .table
            .lock()
            .map_err(|e| AppError::persistence(format!("config store poisoned: {e}")))?;
        *guard = table.clone();
        Ok(())
    }
}
