use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use super::tracked_model::{TrackedSet, TrackedSnapshot};
use crate::errors::Result;
use crate::storage::FileStore;

/// In-memory tracked set plus its snapshot file.
///
/// Mutations only touch memory; the file is rewritten when [`persist`](Self::persist)
/// runs, which the server does on a timer and at shutdown. Neither restore nor
/// persist ever fails the caller: losing the snapshot only means the background
/// refresh starts cold after a restart.
pub struct TrackedSetStore {
    file_store: Arc<dyn FileStore>,
    path: PathBuf,
    state: RwLock<TrackedSet>,
}

impl TrackedSetStore {
    pub fn new(file_store: Arc<dyn FileStore>, path: impl Into<PathBuf>) -> Self {
        Self {
            file_store,
            path: path.into(),
            state: RwLock::new(TrackedSet::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lock for reading, recovering from poison.
    ///
    /// A panic mid-insert can at worst leave one extra identifier behind,
    /// which is harmless for a set that only drives background refreshes.
    fn read_state(&self) -> RwLockReadGuard<'_, TrackedSet> {
        self.state.read().unwrap_or_else(|poisoned| {
            warn!("Tracked set lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, TrackedSet> {
        self.state.write().unwrap_or_else(|poisoned| {
            warn!("Tracked set lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Load the last snapshot into memory and return it.
    ///
    /// A missing, unreadable or malformed snapshot yields an empty set (and a
    /// warning); the in-memory set is left untouched in that case.
    pub async fn restore(&self) -> TrackedSet {
        info!("Restoring tracked coins and currencies from {}", self.path.display());

        let value = match self.file_store.read_json(&self.path).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                warn!("No tracked-set snapshot found at {}", self.path.display());
                return TrackedSet::default();
            }
            Err(e) => {
                warn!(
                    "Failed to read tracked-set snapshot {}: {}",
                    self.path.display(),
                    e
                );
                return TrackedSet::default();
            }
        };

        let snapshot: TrackedSnapshot = match serde_json::from_value(value) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("No valid tracked coins or currencies in stored snapshot: {}", e);
                return TrackedSet::default();
            }
        };

        let saved_at = DateTime::<Utc>::from_timestamp_millis(snapshot.time_stamp)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string());
        let restored = snapshot.into_set();

        *self.write_state() = restored.clone();
        info!(
            "Restored {} tracked coins and {} tracked currencies (last saved: {})",
            restored.coins().len(),
            restored.currencies().len(),
            saved_at
        );
        restored
    }

    /// Overwrite the snapshot file with the current set. Failures are logged.
    pub async fn persist(&self) {
        if let Err(e) = self.try_persist().await {
            error!(
                "Failed to persist tracked set to {}: {}",
                self.path.display(),
                e
            );
        }
    }

    async fn try_persist(&self) -> Result<()> {
        let snapshot = TrackedSnapshot::from_set(&self.snapshot(), Utc::now().timestamp_millis());
        let value = serde_json::to_value(&snapshot)?;
        self.file_store.write_json(&self.path, &value).await?;
        info!(
            "Saved {} tracked coins and {} tracked currencies to disk",
            snapshot.tracked_coins.len(),
            snapshot.tracked_currencies.len()
        );
        Ok(())
    }

    /// Copy of the current set.
    pub fn snapshot(&self) -> TrackedSet {
        self.read_state().clone()
    }

    pub fn coins(&self) -> Vec<String> {
        self.read_state().coins().to_vec()
    }

    pub fn currencies(&self) -> Vec<String> {
        self.read_state().currencies().to_vec()
    }

    pub fn add_coin(&self, coin: &str) {
        if self.write_state().add_coin(coin) {
            debug!("Now tracking coin '{}'", coin);
        }
    }

    pub fn add_currency(&self, currency: &str) {
        if self.write_state().add_currency(currency) {
            debug!("Now tracking currency '{}'", currency);
        }
    }

    /// Track several coins quoted in one currency, under a single lock.
    pub fn add_all<'a, I>(&self, coins: I, currency: &str)
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut state = self.write_state();
        for coin in coins {
            state.add_coin(coin);
        }
        state.add_currency(currency);
    }

    pub fn set_coins(&self, coins: &[String]) {
        let mut state = self.write_state();
        state.set_coins(coins);
        info!("Updated tracked coins with {} coins", state.coins().len());
    }

    pub fn set_currencies(&self, currencies: &[String]) {
        let mut state = self.write_state();
        state.set_currencies(currencies);
        info!(
            "Updated tracked currencies with {} currencies",
            state.currencies().len()
        );
    }
}
