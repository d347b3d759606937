// src/services/registry.rs

//! Watched-target registry.
//!
//! Owns the in-memory target list and is the only writer of the `targets`
//! key in the configuration store. Every mutation persists the whole list
//! first and commits it in memory only after the write succeeded.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use crate::error::{AppError, Result};
use crate::models::Target;
use crate::storage::ConfigStore;
use crate::utils::http::Fetcher;

/// Configuration key holding the serialized target list.
pub const TARGETS_KEY: &str = "targets";

/// In-memory target list backed by a configuration store.
pub struct TargetRegistry {
    targets: Mutex<Vec<Target>>,
    store: Arc<dyn ConfigStore>,
    changes: watch::Sender<u64>,
}

impl TargetRegistry {
    /// Load the target list from `store`.
    pub async fn load(store: Arc<dyn ConfigStore>) -> Result<Self> {
        let table = store.read().await?;
        let targets: Vec<Target> = match table.get(TARGETS_KEY) {
            Some(value) => value.clone().try_into()?,
            None => Vec::new(),
        };
        log::info!("Loaded {} watched targets", targets.len());
        Ok(Self::with_targets(targets, store))
    }

    /// Registry over an explicit list; nothing is read from `store`.
    pub fn with_targets(targets: Vec<Target>, store: Arc<dyn ConfigStore>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            targets: Mutex::new(targets),
            store,
            changes,
        }
    }

    /// Copy of the current list, e.g. for one poll cycle.
    pub async fn snapshot(&self) -> Vec<Target> {
        self.targets.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.targets.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.targets.lock().await.is_empty()
    }

    pub async fn get(&self, url: &str) -> Option<Target> {
        self.targets
            .lock()
            .await
            .iter()
            .find(|t| t.url == url)
            .cloned()
    }

    /// Change notifications. The value is a generation counter bumped after
    /// each successful write; a supervisor can treat it as a reload request.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Add a target after checking it is new and its page is reachable.
    pub async fn add(&self, target: Target, fetcher: &dyn Fetcher) -> Result<()> {
        if self.get(&target.url).await.is_some() {
            return Err(AppError::DuplicateTarget(target.url));
        }

        fetcher
            .fetch(&target.url)
            .await
            .map_err(|e| AppError::unreachable(&target.url, e))?;

        let mut targets = self.targets.lock().await;
        // Re-check under the lock; another add may have won the race.
        if targets.iter().any(|t| t.url == target.url) {
            return Err(AppError::DuplicateTarget(target.url));
        }

        let mut updated = targets.clone();
        updated.push(target.clone());
        self.persist(&updated).await?;
        *targets = updated;
        drop(targets);

        log::info!("Added target {} ({})", target.name, target.url);
        self.notify_changed();
        Ok(())
    }

    /// Remove the target with `url`.
    ///
    /// Returns `None` without touching the store when nothing matches, so a
    /// repeated removal is a no-op. The persisted list is replaced by this
    /// registry's list; edits another process made to the store since `load`
    /// are lost.
    pub async fn remove(&self, url: &str) -> Result<Option<Target>> {
        let mut targets = self.targets.lock().await;
        let Some(index) = targets.iter().position(|t| t.url == url) else {
            log::debug!("Remove requested for unknown target {url}");
            return Ok(None);
        };

        let mut updated = targets.clone();
        let removed = updated.remove(index);
        self.persist(&updated).await?;
        *targets = updated;
        drop(targets);

        log::info!("Removed target {} ({})", removed.name, removed.url);
        self.notify_changed();
        Ok(Some(removed))
    }

    async fn persist(&self, targets: &[Target]) -> Result<()> {
        let result = async {
            let mut table = self.store.read().await?;
            table.insert(TARGETS_KEY.to_string(), toml::Value::try_from(targets)?);
            self.store.write(&table).await
        }
        .await;

        result.map_err(|e| {
            log::error!("Failed to persist watched targets: {e}");
            match e {
                AppError::Persistence(_) => e,
                other => AppError::persistence(other),
            }
        })
    }

    fn notify_changed(&self) {
        self.changes.send_modify(|generation| *generation += 1);
    }
}
