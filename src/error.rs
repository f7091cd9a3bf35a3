//! Custom error types for Fintrax
//!
//! This module defines the error hierarchy for the aggregation engine and its
//! stores using thiserror for ergonomic error definitions.

use thiserror::Error;

/// The main error type for Fintrax operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FintraxError {
    /// Non-positive, overflowing or malformed monetary amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Malformed bucket key or time range
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    /// Validation errors for data models
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors (write paths only; reads return `Option`)
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Ledger store query, subscription or persistence failure
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),
}

impl FintraxError {
    /// Create a "not found" error for transactions
    pub fn transaction_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Transaction",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for monthly expenses
    pub fn monthly_expense_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Monthly expense",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error (including amount and period checks)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InvalidAmount(_) | Self::InvalidPeriod(_)
        )
    }

    /// Whether a background recomputation should retry after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<std::io::Error> for FintraxError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for FintraxError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for Fintrax operations
pub type FintraxResult<T> = Result<T, FintraxError>;
