//! Tracing setup
//!
//! `RUST_LOG` wins over the configured filter; without either, fintrax logs
//! at info. Output goes to stderr so command output on stdout stays clean.

use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

static TRACING_INIT: Once = Once::new();

const DEFAULT_FILTER: &str = "fintrax=info";

/// Build the filter from `RUST_LOG`, then `configured`, then the default
pub fn filter_for(configured: Option<&str>) -> EnvFilter {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
    }
    configured
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber; later calls are no-ops
pub fn init(configured: Option<&str>) {
    TRACING_INIT.call_once(|| {
        let _ = fmt()
            .with_env_filter(filter_for(configured))
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}
