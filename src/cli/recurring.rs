//! Recurring obligation CLI commands

use clap::Subcommand;

use super::parse_instant;
use crate::config::settings::Settings;
use crate::display::format_obligations;
use crate::engine::Engine;
use crate::error::{FintraxError, FintraxResult};
use crate::models::{Category, Granularity, Money, MonthlyExpense};
use crate::services::CreateMonthlyExpenseInput;

/// Recurring subcommands
#[derive(Subcommand, Debug)]
pub enum RecurringCommands {
    /// Add a monthly expense
    Add {
        /// Amount due each month
        amount: String,
        description: String,
        /// Day of month it falls due (1-31, clamped to short months)
        #[arg(long)]
        due_day: u32,
        #[arg(short, long, default_value = "Other")]
        category: Category,
    },
    /// List monthly expenses
    List {
        /// Include deactivated expenses
        #[arg(short, long)]
        all: bool,
    },
    /// Unpaid obligations for a month
    Due {
        /// Month key (e.g. "2024-03"), defaults to the current month
        #[arg(short, long)]
        period: Option<String>,
    },
    /// Stop an expense from recurring
    Deactivate {
        /// Expense ID (short form accepted)
        id: String,
    },
    /// Record a payment
    Pay {
        /// Expense ID (short form accepted)
        id: String,
        /// Payment date (YYYY-MM-DD or RFC 3339), defaults to now
        #[arg(short, long)]
        date: Option<String>,
    },
}

fn resolve(engine: &Engine, identifier: &str) -> FintraxResult<MonthlyExpense> {
    engine
        .recurring()
        .find(identifier)?
        .ok_or_else(|| FintraxError::monthly_expense_not_found(identifier))
}

/// Handle a recurring command
pub fn handle_recurring_command(
    engine: &Engine,
    settings: &Settings,
    cmd: RecurringCommands,
) -> FintraxResult<()> {
    let symbol = settings.currency_symbol.as_str();
    let service = engine.recurring();

    match cmd {
        RecurringCommands::Add {
            amount,
            description,
            due_day,
            category,
        } => {
            let expense = service.add(CreateMonthlyExpenseInput {
                amount: Money::parse_amount(&amount)?,
                description,
                category,
                due_day,
            })?;
            println!(
                "Added monthly expense {}: {} due on day {}",
                expense.id,
                expense.amount.format_with_symbol(symbol),
                expense.due_day
            );
        }

        RecurringCommands::List { all } => {
            let expenses = if all {
                service.list_all()?
            } else {
                service.list_active()?
            };
            print!("{}", format_obligations(&expenses, symbol));
        }

        RecurringCommands::Due { period } => {
            let bucket = engine
                .calendar()
                .parse_or_current(Granularity::Monthly, period.as_deref())?;
            let owed = service.obligations_for(bucket)?;
            let outstanding = Money::checked_sum(owed.iter().map(|e| e.amount))?;
            println!("Unpaid obligations for {}", bucket);
            print!("{}", format_obligations(&owed, symbol));
            println!("Outstanding: {}", outstanding.format_with_symbol(symbol));
        }

        RecurringCommands::Deactivate { id } => {
            let expense = resolve(engine, &id)?;
            let expense = service.deactivate(expense.id)?;
            println!("Deactivated {} ({})", expense.id, expense.description);
        }

        RecurringCommands::Pay { id, date } => {
            let expense = resolve(engine, &id)?;
            let paid_at = date.as_deref().map(parse_instant).transpose()?;
            let expense = service.mark_paid(expense.id, paid_at)?;
            println!(
                "Marked {} ({}) paid for {}",
                expense.id,
                expense.description,
                expense.last_paid_month().unwrap_or_default()
            );
        }
    }

    Ok(())
}
