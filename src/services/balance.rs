//! Balance tracker
//!
//! Keeps the current (lifetime) balance and per-bucket balance history.
//! Lifetime totals are maintained incrementally from an id index; a full
//! ledger scan rebuilds the same figures and is the reference they must
//! agree with.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

use crate::error::FintraxResult;
use crate::models::{
    Balance, BalanceScope, Granularity, Money, PeriodBucket, PeriodTotals, Transaction,
    TransactionId, TransactionType,
};
use crate::storage::{BalanceSnapshotStore, LedgerChange};

use super::observable::{Aggregate, KeyedObservables, Observable};
use super::period::PeriodCalendar;
use super::retry::LedgerReader;
use super::ChangeSubscriber;

#[derive(Debug, Default)]
struct LifetimeIndex {
    entries: HashMap<TransactionId, (TransactionType, Money)>,
    totals: PeriodTotals,
}

impl LifetimeIndex {
    fn from_transactions(transactions: &[Transaction]) -> FintraxResult<Self> {
        let mut index = Self::default();
        for txn in transactions {
            index.set(txn.id, Some(txn))?;
        }
        Ok(index)
    }

    /// Replace whatever is indexed under `id` with `txn`'s current figures
    ///
    /// On error the index is left partially updated; callers mark the
    /// tracker for a full rebuild.
    fn set(&mut self, id: TransactionId, txn: Option<&Transaction>) -> FintraxResult<()> {
        if let Some((kind, amount)) = self.entries.remove(&id) {
            self.totals.remove(kind, amount)?;
        }
        if let Some(txn) = txn {
            self.totals.add(txn.transaction_type, txn.amount)?;
            self.entries.insert(id, (txn.transaction_type, txn.amount));
        }
        Ok(())
    }
}

pub struct BalanceTracker {
    reader: LedgerReader,
    snapshots: Arc<BalanceSnapshotStore>,
    calendar: PeriodCalendar,
    granularities: Vec<Granularity>,
    index: Mutex<LifetimeIndex>,
    /// Set after a failed refresh; the next change forces a full rebuild
    needs_rebuild: AtomicBool,
    current: Observable<Balance>,
    histories: KeyedObservables<Granularity, Vec<Balance>>,
}

impl BalanceTracker {
    pub fn new(
        reader: LedgerReader,
        snapshots: Arc<BalanceSnapshotStore>,
        calendar: PeriodCalendar,
        granularities: Vec<Granularity>,
    ) -> Self {
        let now = calendar.now();
        let initial = snapshots
            .latest(&BalanceScope::Lifetime)
            .ok()
            .flatten()
            .unwrap_or_else(|| Balance::zero(now));

        let mut granularities = granularities;
        granularities.sort();
        granularities.dedup();

        Self {
            reader,
            snapshots,
            calendar,
            granularities,
            index: Mutex::new(LifetimeIndex::default()),
            needs_rebuild: AtomicBool::new(true),
            current: Observable::new(initial, now),
            histories: KeyedObservables::new(),
        }
    }

    pub fn tracked_granularities(&self) -> &[Granularity] {
        &self.granularities
    }

    /// Most recent lifetime snapshot, or a zero balance dated now
    pub fn current_balance(&self) -> Balance {
        match self.snapshots.latest(&BalanceScope::Lifetime) {
            Ok(Some(balance)) => balance,
            Ok(None) => Balance::zero(self.calendar.now()),
            Err(e) => {
                error!(error = %e, "snapshot store unreadable, serving last published balance");
                self.current.current().value
            }
        }
    }

    /// Live current balance
    pub fn watch_current(&self) -> watch::Receiver<Aggregate<Balance>> {
        self.current.subscribe()
    }

    pub fn is_stale(&self) -> bool {
        self.current.is_stale()
    }

    /// Recompute `bucket` from the ledger and append a snapshot for it
    #[instrument(skip_all, fields(component = "balance", bucket = %bucket))]
    pub async fn record_balance(&self, bucket: PeriodBucket) -> FintraxResult<Balance> {
        let transactions = self.reader.query_range(bucket.range()).await?;
        let totals = PeriodTotals::from_transactions(&transactions)?;
        let balance =
            Balance::from_totals(totals, BalanceScope::Bucket(bucket), self.calendar.now());
        self.snapshots.insert(balance.clone())?;
        debug!(net = %balance.net_balance, "bucket snapshot recorded");
        self.refresh_history(bucket.granularity())?;
        Ok(balance)
    }

    /// Balance history for a granularity, newest first
    pub fn history(&self, granularity: Granularity) -> FintraxResult<Vec<Balance>> {
        self.snapshots.history(granularity)
    }

    /// Live balance history for a granularity, newest first
    pub fn watch_history(
        &self,
        granularity: Granularity,
    ) -> FintraxResult<watch::Receiver<Aggregate<Vec<Balance>>>> {
        if let Some(rx) = self.histories.subscribe(&granularity) {
            return Ok(rx);
        }
        let history = self.snapshots.history(granularity)?;
        Ok(self
            .histories
            .subscribe_or_insert(granularity, history, self.calendar.now()))
    }

    fn refresh_history(&self, granularity: Granularity) -> FintraxResult<()> {
        if !self.histories.contains(&granularity) {
            return Ok(());
        }
        let history = self.snapshots.history(granularity)?;
        self.histories.publish(&granularity, history, self.calendar.now());
        Ok(())
    }

    /// Append a lifetime snapshot with `totals` and publish it
    fn record_lifetime(&self, totals: PeriodTotals) -> FintraxResult<Balance> {
        let now = self.calendar.now();
        let balance = Balance::from_totals(totals, BalanceScope::Lifetime, now);
        self.snapshots.insert(balance.clone())?;
        self.current.publish(balance.clone(), now);
        Ok(balance)
    }

    /// Lifetime totals as maintained incrementally
    pub fn incremental_totals(&self) -> PeriodTotals {
        self.index.lock().unwrap_or_else(|p| p.into_inner()).totals
    }

    /// Full-scan totals over the whole ledger
    pub async fn scan_totals(&self) -> FintraxResult<PeriodTotals> {
        let transactions = self.reader.scan_all().await?;
        PeriodTotals::from_transactions(&transactions)
    }

    async fn refresh(&self, change: &LedgerChange) -> FintraxResult<()> {
        if self.needs_rebuild.load(Ordering::SeqCst) {
            return self.reconcile().await;
        }

        let mut buckets = BTreeSet::new();
        for granularity in &self.granularities {
            for instant in change.touched_instants() {
                buckets.insert(self.calendar.bucket(instant, *granularity)?);
            }
        }
        for bucket in buckets {
            self.record_balance(bucket).await?;
        }

        let txn = self.reader.get(change.id).await?;
        let totals = {
            let mut index = self.index.lock().unwrap_or_else(|p| p.into_inner());
            index.set(change.id, txn.as_ref())?;
            index.totals
        };
        let balance = self.record_lifetime(totals)?;
        debug!(kind = ?change.kind, net = %balance.net_balance, "current balance updated");
        Ok(())
    }

    /// Rebuild everything from one full scan
    ///
    /// Writes a snapshot only where the stored figures disagree with the
    /// ledger, so reconciling an unchanged ledger leaves history untouched.
    async fn reconcile(&self) -> FintraxResult<()> {
        let transactions = self.reader.scan_all().await?;
        let rebuilt = LifetimeIndex::from_transactions(&transactions)?;
        let totals = rebuilt.totals;
        *self.index.lock().unwrap_or_else(|p| p.into_inner()) = rebuilt;

        let lifetime = self.snapshots.latest(&BalanceScope::Lifetime)?;
        let stale_lifetime = match &lifetime {
            Some(latest) => latest.totals() != totals,
            None => totals != PeriodTotals::default(),
        };
        if stale_lifetime {
            self.record_lifetime(totals)?;
        } else {
            let now = self.calendar.now();
            let published = lifetime.unwrap_or_else(|| Balance::zero(now));
            self.current.publish(published, now);
        }

        for granularity in &self.granularities {
            self.reconcile_buckets(*granularity, &transactions)?;
        }

        self.needs_rebuild.store(false, Ordering::SeqCst);
        info!(
            transactions = transactions.len(),
            net = %totals.net(),
            "balance tracker reconciled with ledger"
        );
        Ok(())
    }

    fn reconcile_buckets(
        &self,
        granularity: Granularity,
        transactions: &[Transaction],
    ) -> FintraxResult<()> {
        let mut expected: HashMap<PeriodBucket, PeriodTotals> = HashMap::new();
        for txn in transactions {
            let bucket = self.calendar.bucket(txn.occurred_at, granularity)?;
            expected
                .entry(bucket)
                .or_default()
                .add(txn.transaction_type, txn.amount)?;
        }

        // Buckets that were emptied while we weren't listening
        let mut latest: HashMap<PeriodBucket, Balance> = HashMap::new();
        for snapshot in self.snapshots.history(granularity)? {
            if let BalanceScope::Bucket(bucket) = snapshot.scope {
                latest.entry(bucket).or_insert(snapshot);
            }
        }
        for bucket in latest.keys() {
            expected.entry(*bucket).or_default();
        }

        let now = self.calendar.now();
        let mut written = 0;
        let mut ordered: Vec<_> = expected.into_iter().collect();
        ordered.sort_by_key(|(bucket, _)| *bucket);
        for (bucket, totals) in ordered {
            let up_to_date = latest.get(&bucket).is_some_and(|b| b.totals() == totals);
            if !up_to_date {
                self.snapshots
                    .insert(Balance::from_totals(totals, BalanceScope::Bucket(bucket), now))?;
                written += 1;
            }
        }
        if written > 0 {
            debug!(%granularity, written, "bucket snapshots reconciled");
            self.refresh_history(granularity)?;
        }
        Ok(())
    }

    fn mark_stale(&self) {
        self.needs_rebuild.store(true, Ordering::SeqCst);
        self.current.mark_stale();
        for granularity in &self.granularities {
            self.histories.mark_stale(granularity);
        }
    }
}

#[async_trait]
impl ChangeSubscriber for BalanceTracker {
    fn name(&self) -> &'static str {
        "balance"
    }

    async fn apply(&self, change: &LedgerChange) -> FintraxResult<()> {
        let result = self.refresh(change).await;
        if let Err(e) = &result {
            error!(component = "balance", error = %e, "balance marked stale");
            self.mark_stale();
        }
        result
    }

    async fn rebuild(&self) -> FintraxResult<()> {
        let result = self.reconcile().await;
        if let Err(e) = &result {
            error!(component = "balance", error = %e, "balance rebuild failed, marked stale");
            self.mark_stale();
        }
        result
    }
}
