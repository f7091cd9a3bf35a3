//! Category analytics
//!
//! Per-category totals, shares and rankings for a bucket. Expenses and
//! income are broken down separately: the Income category only ever holds
//! income, so mixing them would inflate every expense share.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, error, instrument};

use crate::error::FintraxResult;
use crate::models::{
    Category, CategoryBreakdown, ChartData, Granularity, Money, Percentage, PeriodBucket,
    Transaction, TransactionType,
};
use crate::storage::LedgerChange;

use super::observable::{Aggregate, KeyedObservables};
use super::period::PeriodCalendar;
use super::retry::LedgerReader;
use super::ChangeSubscriber;

/// Group transactions of one type by category
///
/// Entries are ordered by total descending, ties in category declaration
/// order. Each percentage is the entry's share of the grand total, rounded
/// half-up to 0.01%, so the shares sum to 100% within 0.01% per entry.
pub fn breakdown_of(
    transactions: &[Transaction],
    transaction_type: TransactionType,
) -> FintraxResult<Vec<CategoryBreakdown>> {
    let mut grouped: BTreeMap<Category, (Money, usize)> = BTreeMap::new();
    for txn in transactions.iter().filter(|t| t.transaction_type == transaction_type) {
        let entry = grouped.entry(txn.category).or_insert((Money::zero(), 0));
        entry.0 = entry.0.checked_add(txn.amount)?;
        entry.1 += 1;
    }

    let grand_total = Money::checked_sum(grouped.values().map(|(total, _)| *total))?;

    let mut breakdown: Vec<CategoryBreakdown> = grouped
        .into_iter()
        .map(|(category, (total_amount, transaction_count))| CategoryBreakdown {
            category,
            total_amount,
            transaction_count,
            percentage: Percentage::ratio(total_amount, grand_total).unwrap_or(Percentage::ZERO),
        })
        .collect();

    // BTreeMap iteration is already in category order; a stable sort keeps it for ties
    breakdown.sort_by(|a, b| b.total_amount.cmp(&a.total_amount));
    Ok(breakdown)
}

/// First `limit` entries; a non-positive limit yields nothing
pub fn top_n(breakdown: Vec<CategoryBreakdown>, limit: i64) -> Vec<CategoryBreakdown> {
    let Ok(limit) = usize::try_from(limit) else {
        return Vec::new();
    };
    breakdown.into_iter().take(limit).collect()
}

pub fn chart_of(breakdown: &[CategoryBreakdown]) -> Vec<ChartData> {
    breakdown.iter().map(ChartData::from).collect()
}

pub struct CategoryAnalytics {
    reader: LedgerReader,
    calendar: PeriodCalendar,
    watched: KeyedObservables<PeriodBucket, Vec<CategoryBreakdown>>,
}

impl CategoryAnalytics {
    pub fn new(reader: LedgerReader, calendar: PeriodCalendar) -> Self {
        Self {
            reader,
            calendar,
            watched: KeyedObservables::new(),
        }
    }

    #[instrument(skip_all, fields(component = "categories", bucket = %bucket, kind = %transaction_type))]
    async fn breakdown(
        &self,
        bucket: PeriodBucket,
        transaction_type: TransactionType,
    ) -> FintraxResult<Vec<CategoryBreakdown>> {
        let transactions = self.reader.query_range(bucket.range()).await?;
        let breakdown = breakdown_of(&transactions, transaction_type)?;
        debug!(categories = breakdown.len(), "breakdown computed");
        Ok(breakdown)
    }

    /// Expense totals per category in `bucket`
    pub async fn category_breakdown(
        &self,
        bucket: PeriodBucket,
    ) -> FintraxResult<Vec<CategoryBreakdown>> {
        self.breakdown(bucket, TransactionType::Expense).await
    }

    /// Income totals per category in `bucket`
    pub async fn income_breakdown(
        &self,
        bucket: PeriodBucket,
    ) -> FintraxResult<Vec<CategoryBreakdown>> {
        self.breakdown(bucket, TransactionType::Income).await
    }

    /// Highest-spending categories of the current month
    pub async fn top_categories(&self, limit: i64) -> FintraxResult<Vec<CategoryBreakdown>> {
        let bucket = self.calendar.current(Granularity::Monthly)?;
        self.top_categories_in(bucket, limit).await
    }

    pub async fn top_categories_in(
        &self,
        bucket: PeriodBucket,
        limit: i64,
    ) -> FintraxResult<Vec<CategoryBreakdown>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        Ok(top_n(self.category_breakdown(bucket).await?, limit))
    }

    pub async fn expense_chart(&self, bucket: PeriodBucket) -> FintraxResult<Vec<ChartData>> {
        Ok(chart_of(&self.category_breakdown(bucket).await?))
    }

    pub async fn income_chart(&self, bucket: PeriodBucket) -> FintraxResult<Vec<ChartData>> {
        Ok(chart_of(&self.income_breakdown(bucket).await?))
    }

    /// Live expense breakdown of one bucket
    pub async fn watch_breakdown(
        &self,
        bucket: PeriodBucket,
    ) -> FintraxResult<watch::Receiver<Aggregate<Vec<CategoryBreakdown>>>> {
        if let Some(rx) = self.watched.subscribe(&bucket) {
            return Ok(rx);
        }
        let breakdown = self.category_breakdown(bucket).await?;
        Ok(self
            .watched
            .subscribe_or_insert(bucket, breakdown, self.calendar.now()))
    }

    async fn refresh(&self, buckets: Vec<PeriodBucket>) -> FintraxResult<()> {
        let mut first_error = None;
        for bucket in buckets {
            match self.category_breakdown(bucket).await {
                Ok(breakdown) => {
                    self.watched.publish(&bucket, breakdown, self.calendar.now());
                }
                Err(e) => {
                    error!(component = "categories", bucket = %bucket, error = %e, "breakdown marked stale");
                    self.watched.mark_stale(&bucket);
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl ChangeSubscriber for CategoryAnalytics {
    fn name(&self) -> &'static str {
        "categories"
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
