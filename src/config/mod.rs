//! Configuration module for Fintrax
//!
//! This module provides configuration management including:
//! - Data directory resolution
//! - User and engine settings persistence

pub mod paths;
pub mod settings;

pub use paths::FintraxPaths;
pub use settings::{RetrySettings, Settings};
