//! Insert-only balance snapshot store
//!
//! Snapshots are derived, reconstructible state persisted to balances.json
//! for history display. A snapshot is never modified once written.

use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::{FintraxError, FintraxResult};
use crate::models::{Balance, BalanceScope, Granularity};

use super::file_io::{read_json, write_json_atomic};

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct SnapshotData {
    snapshots: Vec<Balance>,
}

pub struct BalanceSnapshotStore {
    path: Option<PathBuf>,
    /// Insertion order; the history views sort newest first on read
    data: RwLock<Vec<Balance>>,
}

impl BalanceSnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            data: RwLock::new(Vec::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(Vec::new()),
        }
    }

    pub fn load(&self) -> FintraxResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file_data: SnapshotData = read_json(path)?;
        let mut data = self.data.write().map_err(|e| {
            FintraxError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        *data = file_data.snapshots;
        Ok(())
    }

    /// Append a snapshot; the file is rewritten atomically before it becomes visible
    pub fn insert(&self, balance: Balance) -> FintraxResult<()> {
        let mut data = self.data.write().map_err(|e| {
            FintraxError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        if data.iter().any(|b| b.id == balance.id) {
            return Err(FintraxError::Validation(format!(
                "snapshot {} already recorded",
                balance.id
            )));
        }

        if let Some(path) = &self.path {
            let mut snapshots = data.clone();
            snapshots.push(balance.clone());
            write_json_atomic(path, &SnapshotData { snapshots })?;
        }
        data.push(balance);
        Ok(())
    }

    /// Most recently computed snapshot for `scope`
    pub fn latest(&self, scope: &BalanceScope) -> FintraxResult<Option<Balance>> {
        Ok(self.history_where(|b| b.scope == *scope)?.into_iter().next())
    }

    /// Snapshots of every bucket of `granularity`, newest first
    pub fn history(&self, granularity: Granularity) -> FintraxResult<Vec<Balance>> {
        self.history_where(|b| b.scope.granularity() == Some(granularity))
    }

    /// Snapshots of one scope, newest first
    pub fn history_for(&self, scope: &BalanceScope) -> FintraxResult<Vec<Balance>> {
        self.history_where(|b| b.scope == *scope)
    }

    pub fn len(&self) -> FintraxResult<usize> {
        let data = self.data.read().map_err(|e| {
            FintraxError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(data.len())
    }

    pub fn is_empty(&self) -> FintraxResult<bool> {
        Ok(self.len()? == 0)
    }

    fn history_where(&self, keep: impl Fn(&Balance) -> bool) -> FintraxResult<Vec<Balance>> {
        let data = self.data.read().map_err(|e| {
            FintraxError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        // Reverse first so equal computation instants keep newest-inserted first
        let mut snapshots: Vec<Balance> = data.iter().rev().filter(|b| keep(b)).cloned().collect();
        snapshots.sort_by(|a, b| b.computed_at.cmp(&a.computed_at));
        Ok(snapshots)
    }
}
