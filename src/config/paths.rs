//! Path management for Fintrax
//!
//! ## Path Resolution Order
//!
//! 1. `FINTRAX_DATA_DIR` environment variable (if set)
//! 2. The platform configuration directory reported by `directories`
//!    (`~/.config/fintrax` on Linux, `~/Library/Application Support/fintrax`
//!    on macOS, `%APPDATA%\fintrax` on Windows)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::FintraxError;

/// Manages all paths used by Fintrax
#[derive(Debug, Clone)]
pub struct FintraxPaths {
    /// Base directory for all Fintrax data
    base_dir: PathBuf,
}

impl FintraxPaths {
    /// Create a new FintraxPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, FintraxError> {
        let base_dir = if let Ok(custom) = std::env::var("FINTRAX_DATA_DIR") {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create FintraxPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory (<base>/data/)
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the export directory (<base>/exports/)
    pub fn export_dir(&self) -> PathBuf {
        self.base_dir.join("exports")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to transactions.json (the ledger)
    pub fn transactions_file(&self) -> PathBuf {
        self.data_dir().join("transactions.json")
    }

    /// Get the path to monthly_expenses.json (recurring obligations)
    pub fn monthly_expenses_file(&self) -> PathBuf {
        self.data_dir().join("monthly_expenses.json")
    }

    /// Get the path to balances.json (derived balance snapshots)
    pub fn balances_file(&self) -> PathBuf {
        self.data_dir().join("balances.json")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), FintraxError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| FintraxError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| FintraxError::Io(format!("Failed to create data directory: {}", e)))?;

        std::fs::create_dir_all(self.export_dir())
            .map_err(|e| FintraxError::Io(format!("Failed to create export directory: {}", e)))?;

        Ok(())
    }

    /// Check if Fintrax has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

fn resolve_default_path() -> Result<PathBuf, FintraxError> {
    ProjectDirs::from("", "", "fintrax")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| FintraxError::Config("Could not determine home directory".into()))
}
