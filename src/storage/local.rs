//! Local filesystem configuration store.
//!
//! Reads and writes a single TOML file. Writes go to a temp file that is
//! renamed over the original, so a crash mid-write never leaves a truncated
//! target list behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::ConfigStore;

/// TOML file backend.
#[derive(Debug, Clone)]
pub struct LocalConfigStore {
    path: PathBuf,
}

impl LocalConfigStore {
    /// Create a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for LocalConfigStore {
    async fn read(&self) -> Result<toml::Table> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(toml::from_str::<toml::Table>(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Config file {} not found", self.path.display());
                Ok(toml::Table::new())
            }
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn write(&self, table: &toml::Table) -> Result<()> {
        let text = toml::to_string_pretty(table)?;
        self.write_bytes(text.as_bytes())
            .await
            .map_err(|e| AppError::persistence(format!("{}: {e}", self.path.display())))?;
        log::info!("Configuration written to {}", self.path.display());
        Ok(())
    }
}
