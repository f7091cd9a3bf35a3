//! Bounded, retried ledger reads
//!
//! Every read an aggregate depends on goes through [`LedgerReader`]: each
//! attempt is capped by the query timeout, and `StoreUnavailable` failures
//! are retried with exponential backoff.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::config::settings::{RetrySettings, Settings};
use crate::error::{FintraxError, FintraxResult};
use crate::models::{TimeRange, Transaction, TransactionId};
use crate::storage::LedgerStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): base × 2^(attempt - 1)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_backoff.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_backoff: settings.base_backoff(),
        }
    }
}

/// Run `op`, retrying retryable failures with backoff
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> FintraxResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FintraxResult<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(operation, attempt, ?delay, error = %e, "retrying ledger read");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Cap a single store call; an elapsed timeout reads as an unavailable store
pub async fn bounded<T>(
    timeout: Duration,
    operation: &str,
    fut: impl Future<Output = FintraxResult<T>>,
) -> FintraxResult<T> {
    tokio::time::timeout(timeout, fut).await.map_err(|_| {
        FintraxError::StoreUnavailable(format!("{} timed out after {:?}", operation, timeout))
    })?
}

/// Ledger handle used by the aggregate components
#[derive(Clone)]
pub struct LedgerReader {
    store: Arc<dyn LedgerStore>,
    timeout: Duration,
    policy: RetryPolicy,
}

impl LedgerReader {
    pub fn new(store: Arc<dyn LedgerStore>, timeout: Duration, policy: RetryPolicy) -> Self {
        Self {
            store,
            timeout,
            policy,
        }
    }

    pub fn from_settings(store: Arc<dyn LedgerStore>, settings: &Settings) -> Self {
        Self::new(
            store,
            settings.query_timeout(),
            RetryPolicy::from(&settings.retry),
        )
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub async fn query_range(&self, range: TimeRange) -> FintraxResult<Vec<Transaction>> {
        retry_with_backoff(&self.policy, "query_range", || {
            bounded(self.timeout, "query_range", self.store.query_range(range))
        })
        .await
    }

    pub async fn get(&self, id: TransactionId) -> FintraxResult<Option<Transaction>> {
        retry_with_backoff(&self.policy, "get", || {
            bounded(self.timeout, "get", self.store.get(id))
        })
        .await
    }

    pub async fn scan_all(&self) -> FintraxResult<Vec<Transaction>> {
        retry_with_backoff(&self.policy, "scan_all", || {
            bounded(self.timeout, "scan_all", self.store.scan_all())
        })
        .await
    }
}
