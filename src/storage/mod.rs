//! Storage layer for fintrax
//!
//! JSON file storage with atomic writes. The ledger is the source of truth;
//! the snapshot store only caches derived balances.

pub mod file_io;
pub mod ledger;
pub mod recurring;
pub mod snapshots;
pub mod transactions;

pub use file_io::{read_json, write_json_atomic};
pub use ledger::{ChangeKind, LedgerChange, LedgerStore};
pub use recurring::MonthlyExpenseStore;
pub use snapshots::BalanceSnapshotStore;
pub use transactions::JsonLedgerStore;

use std::sync::Arc;

use crate::config::paths::FintraxPaths;
use crate::config::settings::Settings;
use crate::error::FintraxError;

/// Main storage coordinator that provides access to all stores
pub struct Storage {
    paths: FintraxPaths,
    pub ledger: Arc<JsonLedgerStore>,
    pub recurring: Arc<MonthlyExpenseStore>,
    pub snapshots: Arc<BalanceSnapshotStore>,
}

impl Storage {
    /// Create a new Storage instance rooted at `paths`
    pub fn new(paths: FintraxPaths, settings: &Settings) -> Result<Self, FintraxError> {
        paths.ensure_directories()?;

        Ok(Self {
            ledger: Arc::new(JsonLedgerStore::new(
                paths.transactions_file(),
                settings.event_buffer,
            )),
            recurring: Arc::new(MonthlyExpenseStore::new(paths.monthly_expenses_file())),
            snapshots: Arc::new(BalanceSnapshotStore::new(paths.balances_file())),
            paths,
        })
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &FintraxPaths {
        &self.paths
    }

    /// Load all data from disk
    pub fn load_all(&self) -> Result<(), FintraxError> {
        self.ledger.load()?;
        self.recurring.load()?;
        self.snapshots.load()?;
        Ok(())
    }

    /// Check if storage has been initialized (has a settings file)
    pub fn is_initialized(&self) -> bool {
        self.paths.is_initialized()
    }
}
