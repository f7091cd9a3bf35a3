//! Summary calculator
//!
//! Income, expense and net totals for one bucket, plus the 30-day
//! normalized average and the largest income and expense.

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, error, instrument};

use crate::error::FintraxResult;
use crate::models::{FinancialSummary, Granularity, Money, PeriodBucket, PeriodTotals, Transaction};
use crate::storage::LedgerChange;

use super::observable::{Aggregate, KeyedObservables};
use super::period::PeriodCalendar;
use super::retry::LedgerReader;
use super::ChangeSubscriber;

/// Days in the normalized month used by `monthly_average`
pub const NORMALIZED_MONTH_DAYS: i64 = 30;

/// Summarize transactions already known to fall inside `bucket`
///
/// `monthly_average` is the bucket's net scaled to a 30-day month by the
/// number of days the bucket covers (a week is scaled by 30/7), rounded
/// half-up to the cent. It is a normalization, not a mean over months.
pub fn summarize(
    bucket: PeriodBucket,
    transactions: &[Transaction],
) -> FintraxResult<FinancialSummary> {
    if transactions.is_empty() {
        return Ok(FinancialSummary::empty(bucket));
    }

    let totals = PeriodTotals::from_transactions(transactions)?;
    let net = totals.net();
    let monthly_average = net.mul_div_round(NORMALIZED_MONTH_DAYS, bucket.days())?;

    Ok(FinancialSummary {
        bucket,
        total_income: totals.income,
        total_expenses: totals.expenses,
        net_balance: net,
        monthly_average,
        biggest_expense: largest(transactions.iter().filter(|t| t.is_expense())).cloned(),
        biggest_income: largest(transactions.iter().filter(|t| t.is_income())).cloned(),
        transaction_count: transactions.len(),
    })
}

/// Largest amount; ties go to the earliest transaction, then the lowest id
fn largest<'a>(transactions: impl Iterator<Item = &'a Transaction>) -> Option<&'a Transaction> {
    transactions.min_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then(a.occurred_at.cmp(&b.occurred_at))
            .then(a.id.cmp(&b.id))
    })
}

pub struct SummaryCalculator {
    reader: LedgerReader,
    calendar: PeriodCalendar,
    watched: KeyedObservables<PeriodBucket, FinancialSummary>,
}

impl SummaryCalculator {
    pub fn new(reader: LedgerReader, calendar: PeriodCalendar) -> Self {
        Self {
            reader,
            calendar,
            watched: KeyedObservables::new(),
        }
    }

    /// Summary of `bucket`; an empty bucket yields zero totals, not an error
    #[instrument(skip_all, fields(component = "summary", bucket = %bucket))]
    pub async fn summary(&self, bucket: PeriodBucket) -> FintraxResult<FinancialSummary> {
        let transactions = self.reader.query_range(bucket.range()).await?;
        let summary = summarize(bucket, &transactions)?;
        debug!(count = summary.transaction_count, net = %summary.net_balance, "summary computed");
        Ok(summary)
    }

    /// Summary of the bucket containing now
    pub async fn current_summary(&self, granularity: Granularity) -> FintraxResult<FinancialSummary> {
        self.summary(self.calendar.current(granularity)?).await
    }

    /// Normalized monthly average of the current month
    pub async fn monthly_average(&self) -> FintraxResult<Money> {
        Ok(self.current_summary(Granularity::Monthly).await?.monthly_average)
    }

    /// Live summary of one bucket, computed on first subscription
    pub async fn watch_summary(
        &self,
        bucket: PeriodBucket,
    ) -> FintraxResult<watch::Receiver<Aggregate<FinancialSummary>>> {
        if let Some(rx) = self.watched.subscribe(&bucket) {
            return Ok(rx);
        }
        let summary = self.summary(bucket).await?;
        Ok(self
            .watched
            .subscribe_or_insert(bucket, summary, self.calendar.now()))
    }

    async fn refresh(&self, buckets: Vec<PeriodBucket>) -> FintraxResult<()> {
        let mut first_error = None;
        for bucket in buckets {
            match self.summary(bucket).await {
                Ok(summary) => {
                    self.watched.publish(&bucket, summary, self.calendar.now());
                }
                Err(e) => {
                    error!(component = "summary", bucket = %bucket, error = %e, "summary marked stale");
                    self.watched.mark_stale(&bucket);
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl ChangeSubscriber for SummaryCalculator {
    fn name(&self) -> &'static str {
        "summary"
    }

    async fn apply(&self, change: &LedgerChange) -> FintraxResult<()> {
        let instants = change.touched_instants();
        let affected: Vec<PeriodBucket> = self
            .watched
            .prune()
            .into_iter()
            .filter(|bucket| instants.iter().any(|ts| bucket.contains(*ts)))
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
    use crate::models::{Category, TransactionType};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, h, 0, 0).unwrap()
    }

    fn month(key: &str) -> PeriodBucket {
        PeriodBucket::parse(Granularity::Monthly, key).unwrap()
    }

    fn expense(cents: i64, description: &str, ts: DateTime<Utc>) -> Transaction {
        Transaction::expense(Money::from_cents(cents), description, Category::Food, ts).unwrap()
    }

    #[test]
    fn test_empty_bucket_is_zero_summary() {
        let summary = summarize(month("2024-01"), &[]).unwrap();
        assert!(summary.is_empty());
        assert!(summary.net_balance.is_zero());
        assert!(summary.biggest_expense.is_none());
        assert!(summary.biggest_income.is_none());
    }

    #[test]
    fn test_totals_and_extremes() {
        let salary = Transaction::income(Money::from_cents(300_000), "Salary", at(1, 1, 9)).unwrap();
        let bonus = Transaction::income(Money::from_cents(50_000), "Bonus", at(1, 20, 9)).unwrap();
        let rent = Transaction::new(
            TransactionType::Expense,
            Money::from_cents(120_000),
            "Rent",
            Category::Housing,
            at(1, 2, 9),
        )
        .unwrap();
        let food = expense(10_000, "Food", at(1, 3, 9));

        let summary = summarize(
            month("2024-01"),
            &[salary.clone(), rent.clone(), food, bonus],
        )
        .unwrap();
        assert_eq!(summary.total_income.cents(), 350_000);
        assert_eq!(summary.total_expenses.cents(), 130_000);
        assert_eq!(summary.net_balance.cents(), 220_000);
        assert_eq!(summary.biggest_income, Some(salary));
        assert_eq!(summary.biggest_expense, Some(rent));
        assert_eq!(summary.transaction_count, 4);
    }

    #[test]
    fn test_totals_overflow_is_invalid_amount() {
        let half = Money::from_cents(i64::MAX / 2 + 1);
        let first = Transaction::income(half, "Windfall", at(1, 1, 9)).unwrap();
        let second = Transaction::income(half, "Windfall", at(1, 2, 9)).unwrap();
        let err = summarize(month("2024-01"), &[first, second]).unwrap_err();
        assert!(matches!(err, crate::error::FintraxError::InvalidAmount(_)));
    }

    #[test]
    fn test_biggest_tie_breaks_on_earliest() {
        let later = expense(5_000, "Later", at(1, 10, 9));
        let earlier = expense(5_000, "Earlier", at(1, 10, 8));
        let summary = summarize(month("2024-01"), &[later, earlier.clone()]).unwrap();
        assert_eq!(summary.biggest_expense, Some(earlier));
    }

    #[test]
    fn test_monthly_average_normalizes_to_thirty_days() {
        // 31-day month: 310.00 * 30 / 31 = 300.00
        let salary = Transaction::income(Money::from_cents(31_000), "Pay", at(1, 5, 0)).unwrap();
        let summary = summarize(month("2024-01"), &[salary]).unwrap();
        assert_eq!(summary.monthly_average.cents(), 30_000);

        // week: 100.00 * 30 / 7 = 428.571.. -> 428.57
        let week = PeriodBucket::containing(at(1, 10, 0), Granularity::Weekly).unwrap();
        let pay = Transaction::income(Money::from_cents(10_000), "Pay", at(1, 10, 0)).unwrap();
        let summary = summarize(week, &[pay]).unwrap();
        assert_eq!(summary.monthly_average.cents(), 42_857);

        // day: -0.01 * 30 = -0.30
        let day = PeriodBucket::containing(at(1, 10, 0), Granularity::Daily).unwrap();
        let gum = expense(1, "Gum", at(1, 10, 0));
        let summary = summarize(day, &[gum]).unwrap();
        assert_eq!(summary.monthly_average.cents(), -30);
    }

    #[test]
    fn test_monthly_average_rounds_half_up() {
        // 0.01 * 30 / 7 = 0.0428.. -> 0.04
        let week = PeriodBucket::containing(at(1, 10, 0), Granularity::Weekly).unwrap();
        let two = Transaction::income(Money::from_cents(2), "Two", at(1, 10, 0)).unwrap();
        // 0.02 * 30 / 7 = 0.0857.. -> 0.09
        assert_eq!(summarize(week, &[two]).unwrap().monthly_average.cents(), 9);
        let tip = Transaction::income(Money::from_cents(1), "Tip", at(1, 10, 0)).unwrap();
        assert_eq!(summarize(week, &[tip]).unwrap().monthly_average.cents(), 4);

        // February 2024 has 29 days: 0.01 * 30 / 29 = 0.0103.. -> 0.01
        let feb = month("2024-02");
        let coin = Transaction::income(Money::from_cents(1), "Coin", at(2, 2, 0)).unwrap();
        assert_eq!(summarize(feb, &[coin]).unwrap().monthly_average.cents(), 1);
    }
}
