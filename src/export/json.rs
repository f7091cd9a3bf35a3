//! JSON report export
//!
//! A [`ReportBundle`] is a point-in-time snapshot of every aggregate for one
//! bucket, versioned so it can be read back and checked.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::{FintraxError, FintraxResult};
use crate::models::{
    Balance, CategoryBreakdown, FinancialSummary, Granularity, MonthlyExpense, PeriodBucket,
    TrendData,
};

/// Current report schema version
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Every aggregate for one bucket, captured at `generated_at`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportBundle {
    pub schema_version: String,

    pub generated_at: DateTime<Utc>,

    /// Application version that produced the report
    pub app_version: String,

    /// Lifetime balance
    pub balance: Balance,

    pub summary: FinancialSummary,

    /// Expense breakdown of the summary's bucket
    pub breakdown: Vec<CategoryBreakdown>,

    pub income_breakdown: Vec<CategoryBreakdown>,

    /// Monthly trend ending at the current month, oldest first
    pub trend: Vec<TrendData>,

    /// Unpaid recurring obligations of the current month
    #[serde(default)]
    pub obligations: Vec<MonthlyExpense>,
}

impl ReportBundle {
    /// Collect a bundle for `bucket` from a running engine
    pub async fn collect(
        engine: &Engine,
        bucket: PeriodBucket,
        trend_periods: usize,
    ) -> FintraxResult<Self> {
        Ok(Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            generated_at: engine.calendar().now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            balance: engine.balance().current_balance(),
            summary: engine.summary().summary(bucket).await?,
            breakdown: engine.categories().category_breakdown(bucket).await?,
            income_breakdown: engine.categories().income_breakdown(bucket).await?,
            trend: engine
                .trends()
                .trend(Granularity::Monthly, trend_periods)
                .await?,
            obligations: engine.recurring().current_obligations()?,
        })
    }

    /// Check a bundle read back from disk
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version != REPORT_SCHEMA_VERSION {
            return Err(format!(
                "Schema version mismatch: expected {}, got {}",
                REPORT_SCHEMA_VERSION, self.schema_version
            ));
        }

        let bucket = self.summary.bucket;
        let expense_total =
            crate::models::Money::checked_sum(self.breakdown.iter().map(|b| b.total_amount))
                .map_err(|e| e.to_string())?;
        if expense_total != self.summary.total_expenses {
            return Err(format!(
                "Breakdown total {} does not match expenses {} for {}",
                expense_total, self.summary.total_expenses, bucket
            ));
        }

        if self
            .trend
            .windows(2)
            .any(|pair| pair[0].bucket >= pair[1].bucket)
        {
            return Err("Trend entries are not in ascending bucket order".to_string());
        }

        Ok(())
    }
}

/// Write a bundle as JSON
pub fn export_report_json<W: Write>(
    bundle: &ReportBundle,
    writer: &mut W,
    pretty: bool,
) -> FintraxResult<()> {
    if pretty {
        serde_json::to_writer_pretty(writer, bundle)
    } else {
        serde_json::to_writer(writer, bundle)
    }
    .map_err(|e| FintraxError::Export(e.to_string()))?;

    Ok(())
}

/// Read a bundle back and validate it
pub fn import_report_json(json_str: &str) -> FintraxResult<ReportBundle> {
    let bundle: ReportBundle =
        serde_json::from_str(json_str).map_err(|e| FintraxError::Export(e.to_string()))?;
    bundle.validate().map_err(FintraxError::Export)?;
    Ok(bundle)
}
