//! CLI command handlers
//!
//! Bridges clap argument parsing with the engine. Handlers print to stdout
//! and return errors for `main` to report.

pub mod export;
pub mod recurring;
pub mod report;
pub mod transaction;

pub use export::{handle_export_command, ExportArgs};
pub use recurring::{handle_recurring_command, RecurringCommands};
pub use report::{handle_report_command, ReportCommands};
pub use transaction::{handle_transaction_command, TransactionCommands};

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::watch;

use crate::error::{FintraxError, FintraxResult};
use crate::models::Balance;
use crate::services::Aggregate;

/// How long a command waits for the balance to catch up after a write
const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Parse `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp
pub(crate) fn parse_instant(s: &str) -> FintraxResult<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            FintraxError::Validation(format!(
                "Invalid date: '{}'. Use YYYY-MM-DD or an RFC 3339 timestamp",
                s
            ))
        })
}

/// Wait until the balance worker has published past what `rx` has seen
///
/// A one-shot command would otherwise exit before the snapshot is written;
/// the next start reconciles either way.
pub(crate) async fn settle(mut rx: watch::Receiver<Aggregate<Balance>>) {
    let _ = tokio::time::timeout(SETTLE_TIMEOUT, rx.changed()).await;
}
