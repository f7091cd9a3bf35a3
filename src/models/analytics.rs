//! View-model values produced by the analytics components
//!
//! None of these are persisted as a source of truth.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::{Money, Percentage};
use super::period::{PeriodBucket, TimeRange};
use super::transaction::Category;

/// Per-category totals for one bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: Category,
    /// Magnitude of the category's transactions
    pub total_amount: Money,
    pub transaction_count: usize,
    /// Share of the bucket's grand total, rounded half-up to 0.01%
    pub percentage: Percentage,
}

/// Chart slice derived from a [`CategoryBreakdown`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartData {
    pub label: String,
    pub value: Money,
    pub percentage: Percentage,
    /// Hex colour, e.g. "#FF9800"
    pub color: String,
}

impl From<&CategoryBreakdown> for ChartData {
    fn from(entry: &CategoryBreakdown) -> Self {
        Self {
            label: entry.category.label().to_string(),
            value: entry.total_amount,
            percentage: entry.percentage,
            color: entry.category.color().to_string(),
        }
    }
}

/// One point of a gap-free trend series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendData {
    /// Bucket key, e.g. "2024-01"
    pub period: String,
    pub bucket: PeriodBucket,
    pub income: Money,
    pub expenses: Money,
    pub net: Money,
}

/// Percentage change between two year-to-date spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum YoyChange {
    Percent(Percentage),
    /// The previous span netted exactly zero, or the change does not fit
    Undefined,
}

impl fmt::Display for YoyChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(p) => write!(f, "{}", p),
            Self::Undefined => write!(f, "undefined (previous net is zero)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearOverYear {
    pub current_span: TimeRange,
    pub previous_span: TimeRange,
    pub current_net: Money,
    pub previous_net: Money,
    pub change: YoyChange,
}

impl YearOverYear {
    /// `(current - previous) / |previous| * 100`, undefined when previous is zero
    pub fn compute(
        current_span: TimeRange,
        previous_span: TimeRange,
        current_net: Money,
        previous_net: Money,
    ) -> Self {
        let change = Percentage::change(current_net, previous_net)
            .map(YoyChange::Percent)
            .unwrap_or(YoyChange::Undefined);
        Self {
            current_span,
            previous_span,
            current_net,
            previous_net,
            change,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn span() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_yoy_undefined_when_previous_zero() {
        let yoy = YearOverYear::compute(span(), span(), Money::from_cents(50_000), Money::zero());
        assert_eq!(yoy.change, YoyChange::Undefined);
    }

    #[test]
    fn test_yoy_uses_absolute_previous() {
        // from -100.00 to 50.00 is +150%
        let yoy = YearOverYear::compute(
            span(),
            span(),
            Money::from_cents(5_000),
            Money::from_cents(-10_000),
        );
        assert_eq!(
            yoy.change,
            YoyChange::Percent(Percentage::from_basis_points(15_000))
        );
    }

    #[test]
    fn test_chart_data_from_breakdown() {
        let entry = CategoryBreakdown {
            category: Category::Food,
            total_amount: Money::from_cents(1234),
            transaction_count: 2,
            percentage: Percentage::from_basis_points(5000),
        };
        let chart = ChartData::from(&entry);
        assert_eq!(chart.label, "Food");
        assert_eq!(chart.color, "#FF9800");
        assert_eq!(chart.value, entry.total_amount);
    }
}
