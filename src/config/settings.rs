//! User and engine settings for Fintrax
//!
//! Every field has a serde default so older config files keep loading after
//! new settings are introduced.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::paths::FintraxPaths;
use crate::error::FintraxError;
use crate::models::Granularity;

/// Retry policy for background recomputation against the ledger store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles on every further attempt
    pub base_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 50,
        }
    }
}

impl RetrySettings {
    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }
}

/// User settings for Fintrax
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Currency symbol used when rendering amounts
    #[serde(default = "default_currency")]
    pub currency_symbol: String,

    /// Granularities the balance tracker snapshots on every change
    #[serde(default = "default_tracked_granularities")]
    pub tracked_granularities: Vec<Granularity>,

    /// Number of periods shown by default in trend views
    #[serde(default = "default_trend_periods")]
    pub default_trend_periods: usize,

    /// Retry policy for `StoreUnavailable` failures
    #[serde(default)]
    pub retry: RetrySettings,

    /// Upper bound for a single ledger range query
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Capacity of the change-event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Optional tracing filter directive (RUST_LOG takes precedence)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

fn default_schema_version() -> u32 {
    1
}

fn default_currency() -> String {
    "$".to_string()
}

fn default_tracked_granularities() -> Vec<Granularity> {
    vec![Granularity::Monthly]
}

fn default_trend_periods() -> usize {
    6
}

fn default_query_timeout_ms() -> u64 {
    5_000
}

fn default_event_buffer() -> usize {
    256
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            currency_symbol: default_currency(),
            tracked_granularities: default_tracked_granularities(),
            default_trend_periods: default_trend_periods(),
            retry: RetrySettings::default(),
            query_timeout_ms: default_query_timeout_ms(),
            event_buffer: default_event_buffer(),
            log_filter: None,
        }
    }
}

impl Settings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), FintraxError> {
        if self.retry.max_attempts == 0 {
            return Err(FintraxError::Config(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.query_timeout_ms == 0 {
            return Err(FintraxError::Config(
                "query_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(FintraxError::Config(
                "event_buffer must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &FintraxPaths) -> Result<Self, FintraxError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| FintraxError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                FintraxError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            settings.validate()?;
            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &FintraxPaths) -> Result<(), FintraxError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| FintraxError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| FintraxError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.tracked_granularities, vec![Granularity::Monthly]);
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.default_trend_periods, 6);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = FintraxPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.tracked_granularities = vec![Granularity::Weekly, Granularity::Yearly];
        settings.currency_symbol = "€".into();
        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(
            loaded.tracked_granularities,
            vec![Granularity::Weekly, Granularity::Yearly]
        );
        assert_eq!(loaded.currency_symbol, "€");
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"currency_symbol":"£"}"#).unwrap();
        assert_eq!(settings.currency_symbol, "£");
        assert_eq!(settings.query_timeout_ms, 5_000);
        assert_eq!(settings.event_buffer, 256);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut settings = Settings::default();
        settings.retry.max_attempts = 0;
        assert!(matches!(settings.validate(), Err(FintraxError::Config(_))));
    }
}
