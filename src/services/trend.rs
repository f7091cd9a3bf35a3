//! Trend engine
//!
//! Fixed-length, gap-free series of per-bucket totals for charting, and
//! the year-over-year comparison of year-to-date net balance.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, error, instrument};

use crate::error::FintraxResult;
use crate::models::{
    Granularity, PeriodBucket, PeriodTotals, TimeRange, Transaction, TrendData, YearOverYear,
};
use crate::storage::LedgerChange;

use super::observable::{Aggregate, KeyedObservables};
use super::period::PeriodCalendar;
use super::retry::LedgerReader;
use super::ChangeSubscriber;

/// Trend window identity: granularity and number of buckets
pub type TrendWindow = (Granularity, usize);

/// One entry per bucket, zero-valued where nothing happened
pub fn series_of(
    buckets: &[PeriodBucket],
    transactions: &[Transaction],
) -> FintraxResult<Vec<TrendData>> {
    let mut totals: HashMap<PeriodBucket, PeriodTotals> = HashMap::new();
    for txn in transactions {
        if let Some(bucket) = buckets.iter().find(|b| b.contains(txn.occurred_at)) {
            totals
                .entry(*bucket)
                .or_default()
                .add(txn.transaction_type, txn.amount)?;
        }
    }

    Ok(buckets
        .iter()
        .map(|bucket| {
            let t = totals.get(bucket).copied().unwrap_or_default();
            TrendData {
                period: bucket.key(),
                bucket: *bucket,
                income: t.income,
                expenses: t.expenses,
                net: t.net(),
            }
        })
        .collect())
}

pub struct TrendEngine {
    reader: LedgerReader,
    calendar: PeriodCalendar,
    watched: KeyedObservables<TrendWindow, Vec<TrendData>>,
}

impl TrendEngine {
    pub fn new(reader: LedgerReader, calendar: PeriodCalendar) -> Self {
        Self {
            reader,
            calendar,
            watched: KeyedObservables::new(),
        }
    }

    /// The `n` buckets ending at now, oldest first
    #[instrument(skip(self), fields(component = "trend"))]
    pub async fn trend(&self, granularity: Granularity, n: usize) -> FintraxResult<Vec<TrendData>> {
        let buckets = self
            .calendar
            .previous_periods(n, granularity, self.calendar.now())?;
        let (Some(first), Some(last)) = (buckets.first(), buckets.last()) else {
            return Ok(Vec::new());
        };

        // One range query covers the whole window
        let window = TimeRange::new(first.start(), last.end())?;
        let transactions = self.reader.query_range(window).await?;
        let series = series_of(&buckets, &transactions)?;
        debug!(entries = series.len(), "trend computed");
        Ok(series)
    }

    pub async fn monthly_trend(&self, n: usize) -> FintraxResult<Vec<TrendData>> {
        self.trend(Granularity::Monthly, n).await
    }

    /// Year-to-date net against the same span one year earlier
    #[instrument(skip(self), fields(component = "trend"))]
    pub async fn year_over_year_comparison(&self) -> FintraxResult<YearOverYear> {
        let (current_span, previous_span) = self.calendar.year_to_date_spans()?;
        let current = self.reader.query_range(current_span).await?;
        let previous = self.reader.query_range(previous_span).await?;

        let current_net = PeriodTotals::from_transactions(&current)?.net();
        let previous_net = PeriodTotals::from_transactions(&previous)?.net();
        let yoy = YearOverYear::compute(current_span, previous_span, current_net, previous_net);
        debug!(change = %yoy.change, "year over year computed");
        Ok(yoy)
    }

    /// Live trend window
    pub async fn watch_trend(
        &self,
        granularity: Granularity,
        n: usize,
    ) -> FintraxResult<watch::Receiver<Aggregate<Vec<TrendData>>>> {
        let window = (granularity, n);
        if let Some(rx) = self.watched.subscribe(&window) {
            return Ok(rx);
        }
        let series = self.trend(granularity, n).await?;
        Ok(self
            .watched
            .subscribe_or_insert(window, series, self.calendar.now()))
    }

    async fn refresh(&self, windows: Vec<TrendWindow>) -> FintraxResult<()> {
        let mut first_error = None;
        for window in windows {
            let (granularity, n) = window;
            match self.trend(granularity, n).await {
                Ok(series) => {
                    self.watched.publish(&window, series, self.calendar.now());
                }
                Err(e) => {
                    error!(component = "trend", %granularity, n, error = %e, "trend marked stale");
                    self.watched.mark_stale(&window);
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Whether a change, or the passage of time, affects a window
    fn affects(&self, window: &TrendWindow, instants: &[DateTime<Utc>]) -> bool {
        let (granularity, n) = *window;
        match self
            .calendar
            .previous_periods(n, granularity, self.calendar.now())
        {
            Ok(buckets) => match (buckets.first(), buckets.last()) {
                (Some(first), Some(last)) => {
                    let published_last = self
                        .watched
                        .current(window)
                        .and_then(|agg| agg.value.last().map(|t| t.bucket));
                    let moved = published_last != Some(*last);
                    moved
                        || instants
                            .iter()
                            .any(|ts| *ts >= first.start() && *ts < last.end())
                }
                _ => false,
            },
            Err(_) => true,
        }
    }
}

#[async_trait]
impl ChangeSubscriber for TrendEngine {
    fn name(&self) -> &'static str {
        "trend"
    }

    async fn apply(&self, change: &LedgerChange) -> FintraxResult<()> {
        let instants = change.touched_instants();
        let affected: Vec<TrendWindow> = self
            .watched
            .prune()
            .into_iter()
            .filter(|window| self.affects(window, &instants))
            .collect();
        self.refresh(affected).await
    }

    async fn rebuild(&self) -> FintraxResult<()> {
        let watched = self.watched.prune();
        self.refresh(watched).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FintraxError;
    use crate::models::{Category, Money, Percentage, YoyChange};
    use crate::services::period::FixedClock;
    use crate::services::retry::RetryPolicy;
    use crate::storage::{JsonLedgerStore, LedgerStore};
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::time::Duration;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn engine(now: DateTime<Utc>) -> (Arc<JsonLedgerStore>, TrendEngine) {
        let store = Arc::new(JsonLedgerStore::in_memory(64));
        let reader = LedgerReader::new(store.clone(), Duration::from_secs(1), RetryPolicy::default());
        let calendar = PeriodCalendar::new(Arc::new(FixedClock::new(now)));
        (store, TrendEngine::new(reader, calendar))
    }

    #[tokio::test]
    async fn test_trend_is_gap_free_and_oldest_first() {
        let (store, trends) = engine(at(2024, 4, 15));
        store
            .insert(Transaction::income(Money::from_cents(100_000), "Pay", at(2024, 2, 1)).unwrap())
            .await
            .unwrap();
        store
            .insert(
                Transaction::expense(Money::from_cents(2_000), "Lunch", Category::Food, at(2024, 4, 2))
                    .unwrap(),
            )
            .await
            .unwrap();

        let series = trends.monthly_trend(4).await.unwrap();
        let keys: Vec<&str> = series.iter().map(|t| t.period.as_str()).collect();
        assert_eq!(keys, vec!["2024-01", "2024-02", "2024-03", "2024-04"]);
        assert!(series[0].net.is_zero());
        assert_eq!(series[1].income.cents(), 100_000);
        assert!(series[2].income.is_zero() && series[2].expenses.is_zero());
        assert_eq!(series[3].net.cents(), -2_000);
    }

    #[tokio::test]
    async fn test_trend_zero_length() {
        let (_, trends) = engine(at(2024, 4, 15));
        assert!(trends.monthly_trend(0).await.unwrap().is_empty());
        assert_eq!(trends.trend(Granularity::Weekly, 3).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_oversized_window_is_invalid_period() {
        let (_, trends) = engine(at(2024, 4, 15));
        let err = trends.monthly_trend(4_000_000).await.unwrap_err();
        assert!(matches!(err, FintraxError::InvalidPeriod(_)));
        assert!(trends.watch_trend(Granularity::Daily, usize::MAX).await.is_err());
    }

    #[tokio::test]
    async fn test_series_overflow_is_invalid_amount() {
        let (store, trends) = engine(at(2024, 4, 15));
        for day in [1, 2] {
            let pay = Money::from_cents(i64::MAX / 2 + 1);
            store
                .insert(Transaction::income(pay, "Windfall", at(2024, 4, day)).unwrap())
                .await
                .unwrap();
        }
        let err = trends.monthly_trend(2).await.unwrap_err();
        assert!(matches!(err, FintraxError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn test_yoy_undefined_when_previous_year_nets_zero() {
        let (store, trends) = engine(at(2024, 6, 1));
        store
            .insert(Transaction::income(Money::from_cents(50_000), "Pay", at(2024, 3, 1)).unwrap())
            .await
            .unwrap();
        let yoy = trends.year_over_year_comparison().await.unwrap();
        assert_eq!(yoy.current_net.cents(), 50_000);
        assert!(yoy.previous_net.is_zero());
        assert_eq!(yoy.change, YoyChange::Undefined);
    }

    #[tokio::test]
    async fn test_yoy_only_counts_same_span_last_year() {
        let (store, trends) = engine(at(2024, 6, 1));
        for txn in [
            Transaction::income(Money::from_cents(20_000), "Pay", at(2024, 2, 1)).unwrap(),
            Transaction::income(Money::from_cents(10_000), "Pay", at(2023, 2, 1)).unwrap(),
            // after the shifted "now", outside the comparison span
            Transaction::income(Money::from_cents(99_999), "Late", at(2023, 11, 1)).unwrap(),
        ] {
            store.insert(txn).await.unwrap();
        }
        let yoy = trends.year_over_year_comparison().await.unwrap();
        assert_eq!(yoy.previous_net.cents(), 10_000);
        assert_eq!(
            yoy.change,
            YoyChange::Percent(Percentage::from_basis_points(10_000))
        );
    }
}
