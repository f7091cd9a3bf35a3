//! Aggregate display formatting

use tabled::Tabled;

use super::{render_table, truncate};
use crate::models::{
    Balance, CategoryBreakdown, FinancialSummary, MonthlyExpense, TrendData, YearOverYear,
};

pub fn format_balance(balance: &Balance, symbol: &str, stale: bool) -> String {
    let mut output = String::new();
    output.push_str(&format!("Balance ({})\n", balance.scope));
    output.push_str(&format!(
        "  Income:   {:>14}\n",
        balance.total_income.format_with_symbol(symbol)
    ));
    output.push_str(&format!(
        "  Expenses: {:>14}\n",
        balance.total_expenses.format_with_symbol(symbol)
    ));
    output.push_str(&format!(
        "  Net:      {:>14}\n",
        balance.net_balance.format_with_symbol(symbol)
    ));
    output.push_str(&format!(
        "  As of:    {}\n",
        balance.computed_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if stale {
        output.push_str("  (stale: last recomputation failed)\n");
    }
    output
}

#[derive(Tabled)]
struct BalanceRow {
    #[tabled(rename = "Period")]
    period: String,
    #[tabled(rename = "Income")]
    income: String,
    #[tabled(rename = "Expenses")]
    expenses: String,
    #[tabled(rename = "Net")]
    net: String,
    #[tabled(rename = "Recorded")]
    recorded: String,
}

/// Snapshot history, in the order given (newest first from the store)
pub fn format_balance_history(history: &[Balance], symbol: &str) -> String {
    let rows = history
        .iter()
        .map(|b| BalanceRow {
            period: b.scope.to_string(),
            income: b.total_income.format_with_symbol(symbol),
            expenses: b.total_expenses.format_with_symbol(symbol),
            net: b.net_balance.format_with_symbol(symbol),
            recorded: b.computed_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();
    render_table(rows, "No balance history recorded.")
}

pub fn format_summary(summary: &FinancialSummary, symbol: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!("Summary for {}\n", summary.bucket));
    output.push_str(&format!(
        "  Income:          {:>14}\n",
        summary.total_income.format_with_symbol(symbol)
    ));
    output.push_str(&format!(
        "  Expenses:        {:>14}\n",
        summary.total_expenses.format_with_symbol(symbol)
    ));
    output.push_str(&format!(
        "  Net:             {:>14}\n",
        summary.net_balance.format_with_symbol(symbol)
    ));
    output.push_str(&format!(
        "  Monthly average: {:>14}\n",
        summary.monthly_average.format_with_symbol(symbol)
    ));
    output.push_str(&format!("  Transactions:    {:>14}\n", summary.transaction_count));
    if let Some(txn) = &summary.biggest_expense {
        output.push_str(&format!(
            "  Biggest expense: {} ({})\n",
            txn.amount.format_with_symbol(symbol),
            truncate(&txn.description, 40)
        ));
    }
    if let Some(txn) = &summary.biggest_income {
        output.push_str(&format!(
            "  Biggest income:  {} ({})\n",
            txn.amount.format_with_symbol(symbol),
            truncate(&txn.description, 40)
        ));
    }
    output
}

#[derive(Tabled)]
struct BreakdownRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Count")]
    count: usize,
    #[tabled(rename = "Share")]
    share: String,
    #[tabled(rename = "")]
    bar: String,
}

pub fn format_breakdown(breakdown: &[CategoryBreakdown], symbol: &str) -> String {
    let rows = breakdown
        .iter()
        .map(|entry| BreakdownRow {
            category: entry.category.to_string(),
            total: entry.total_amount.format_with_symbol(symbol),
            count: entry.transaction_count,
            share: entry.percentage.to_string(),
            // one block per 5%
            bar: "█".repeat((entry.percentage.basis_points().max(0) / 500) as usize),
        })
        .collect();
    render_table(rows, "No spending in this period.")
}

#[derive(Tabled)]
struct TrendRow {
    #[tabled(rename = "Period")]
    period: String,
    #[tabled(rename = "Income")]
    income: String,
    #[tabled(rename = "Expenses")]
    expenses: String,
    #[tabled(rename = "Net")]
    net: String,
}

pub fn format_trend(trend: &[TrendData], symbol: &str) -> String {
    let rows = trend
        .iter()
        .map(|t| TrendRow {
            period: t.period.clone(),
            income: t.income.format_with_symbol(symbol),
            expenses: t.expenses.format_with_symbol(symbol),
            net: t.net.format_with_symbol(symbol),
        })
        .collect();
    render_table(rows, "No periods requested.")
}

pub fn format_year_over_year(yoy: &YearOverYear, symbol: &str) -> String {
    let mut output = String::new();
    output.push_str("Year over year (year to date)\n");
    output.push_str(&format!(
        "  This year: {:>14}  ({} .. {})\n",
        yoy.current_net.format_with_symbol(symbol),
        yoy.current_span.start.format("%Y-%m-%d"),
        yoy.current_span.end.format("%Y-%m-%d")
    ));
    output.push_str(&format!(
        "  Last year: {:>14}  ({} .. {})\n",
        yoy.previous_net.format_with_symbol(symbol),
        yoy.previous_span.start.format("%Y-%m-%d"),
        yoy.previous_span.end.format("%Y-%m-%d")
    ));
    output.push_str(&format!("  Change:    {:>14}\n", yoy.change.to_string()));
    output
}

#[derive(Tabled)]
struct ObligationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Due")]
    due_day: u32,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Last paid")]
    last_paid: String,
    #[tabled(rename = "Active")]
    active: String,
}

pub fn format_obligations(expenses: &[MonthlyExpense], symbol: &str) -> String {
    let rows = expenses
        .iter()
        .map(|e| ObligationRow {
            id: e.id.to_string(),
            due_day: e.due_day,
            description: truncate(&e.description, 32),
            category: e.category.to_string(),
            amount: e.amount.format_with_symbol(symbol),
            last_paid: e.last_paid_month().unwrap_or_else(|| "never".to_string()),
            active: if e.is_active { "yes" } else { "no" }.to_string(),
        })
        .collect();
    render_table(rows, "No monthly expenses.")
}
