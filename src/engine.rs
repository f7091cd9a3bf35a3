//! Aggregation engine
//!
//! Wires the aggregate components to the ledger's change feed. Each
//! component runs in its own worker with its own receiver, so a slow or
//! failing component never holds back the others.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::settings::Settings;
use crate::error::FintraxResult;
use crate::services::{
    BalanceTracker, CategoryAnalytics, ChangeSubscriber, LedgerReader, PeriodCalendar,
    RecurringService, SummaryCalculator, TransactionService, TrendEngine,
};
use crate::storage::{BalanceSnapshotStore, LedgerChange, LedgerStore, MonthlyExpenseStore, Storage};

/// Running engine: components plus their change workers
pub struct Engine {
    calendar: PeriodCalendar,
    transactions: TransactionService,
    recurring: RecurringService,
    balance: Arc<BalanceTracker>,
    summary: Arc<SummaryCalculator>,
    categories: Arc<CategoryAnalytics>,
    trends: Arc<TrendEngine>,
    shutdown: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Build every component, bring it in line with the ledger and start
    /// consuming changes
    pub async fn start(
        ledger: Arc<dyn LedgerStore>,
        recurring: Arc<MonthlyExpenseStore>,
        snapshots: Arc<BalanceSnapshotStore>,
        calendar: PeriodCalendar,
        settings: &Settings,
    ) -> FintraxResult<Self> {
        settings.validate()?;
        let reader = LedgerReader::from_settings(ledger.clone(), settings);

        let balance = Arc::new(BalanceTracker::new(
            reader.clone(),
            snapshots,
            calendar.clone(),
            settings.tracked_granularities.clone(),
        ));
        let summary = Arc::new(SummaryCalculator::new(reader.clone(), calendar.clone()));
        let categories = Arc::new(CategoryAnalytics::new(reader.clone(), calendar.clone()));
        let trends = Arc::new(TrendEngine::new(reader, calendar.clone()));

        let subscribers: Vec<Arc<dyn ChangeSubscriber>> = vec![
            balance.clone(),
            summary.clone(),
            categories.clone(),
            trends.clone(),
        ];

        // Subscribe before rebuilding so nothing committed in between is missed
        let mut receivers = Vec::with_capacity(subscribers.len());
        for subscriber in &subscribers {
            receivers.push((subscriber.clone(), ledger.subscribe()?));
        }
        for subscriber in &subscribers {
            subscriber.rebuild().await?;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let workers = receivers
            .into_iter()
            .map(|(subscriber, events)| {
                tokio::spawn(run_worker(subscriber, events, shutdown_rx.clone()))
            })
            .collect();

        info!(components = subscribers.len(), "aggregation engine started");

        Ok(Self {
            transactions: TransactionService::new(ledger, calendar.clone()),
            recurring: RecurringService::new(recurring, calendar.clone()),
            calendar,
            balance,
            summary,
            categories,
            trends,
            shutdown,
            workers,
        })
    }

    /// Start over the stores of an opened data directory
    pub async fn open(
        storage: &Storage,
        calendar: PeriodCalendar,
        settings: &Settings,
    ) -> FintraxResult<Self> {
        storage.load_all()?;
        Self::start(
            storage.ledger.clone(),
            storage.recurring.clone(),
            storage.snapshots.clone(),
            calendar,
            settings,
        )
        .await
    }

    pub fn calendar(&self) -> &PeriodCalendar {
        &self.calendar
    }

    pub fn transactions(&self) -> &TransactionService {
        &self.transactions
    }

    pub fn recurring(&self) -> &RecurringService {
        &self.recurring
    }

    pub fn balance(&self) -> &BalanceTracker {
        &self.balance
    }

    pub fn summary(&self) -> &SummaryCalculator {
        &self.summary
    }

    pub fn categories(&self) -> &CategoryAnalytics {
        &self.categories
    }

    pub fn trends(&self) -> &TrendEngine {
        &self.trends
    }

    /// Stop every worker and wait for in-flight work to be abandoned
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "change worker ended abnormally");
            }
        }
        info!("aggregation engine stopped");
    }
}

async fn run_worker(
    subscriber: Arc<dyn ChangeSubscriber>,
    mut events: broadcast::Receiver<LedgerChange>,
    mut shutdown: watch::Receiver<bool>,
) {
    let component = subscriber.name();
    debug!(component, "change worker started");

    loop {
        let received = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            received = events.recv() => received,
        };

        match received {
            Ok(change) => {
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    result = subscriber.apply(&change) => {
                        if let Err(e) = result {
                            warn!(component, id = %change.id, error = %e, "change not applied");
                        }
                    }
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(component, skipped, "change feed lagged, rebuilding");
                if let Err(e) = subscriber.rebuild().await {
                    warn!(component, error = %e, "rebuild after lag failed");
                }
            }
            Err(RecvError::Closed) => break,
        }

        if *shutdown.borrow() {
            break;
        }
    }

    debug!(component, "change worker stopped");
}
