//! Transaction CLI commands

use clap::Subcommand;

use super::{parse_instant, settle};
use crate::config::settings::Settings;
use crate::display::{format_transaction_details, format_transaction_table};
use crate::engine::Engine;
use crate::error::{FintraxError, FintraxResult};
use crate::models::{Category, Granularity, Money, RecurrencePeriod, TransactionType};
use crate::services::{CreateTransactionInput, TransactionFilter, UpdateTransactionInput};

/// Transaction subcommands
#[derive(Subcommand, Debug)]
pub enum TransactionCommands {
    /// Record a new transaction
    Add {
        /// income or expense
        kind: TransactionType,
        /// Amount, always positive (e.g. "45.50")
        amount: String,
        /// What it was for
        description: String,
        /// Category (defaults to Income for income, Other for expenses)
        #[arg(short, long)]
        category: Option<Category>,
        /// When it happened (YYYY-MM-DD or RFC 3339), defaults to now
        #[arg(short, long)]
        date: Option<String>,
        /// Mark as recurring (daily, weekly, monthly, yearly)
        #[arg(short, long)]
        recurrence: Option<RecurrencePeriod>,
    },
    /// List transactions, newest first
    List {
        /// Only transactions in this period (e.g. "2024-03", "2024-W10")
        #[arg(short, long)]
        period: Option<String>,
        /// Granularity of --period
        #[arg(short, long, default_value = "monthly")]
        granularity: Granularity,
        /// Filter by category
        #[arg(short = 'C', long)]
        category: Option<Category>,
        /// Filter by type
        #[arg(short = 't', long = "type")]
        kind: Option<TransactionType>,
        /// Number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Show transaction details
    Show {
        /// Transaction ID (short form accepted)
        id: String,
    },
    /// Change fields of a transaction
    Update {
        /// Transaction ID (short form accepted)
        id: String,
        #[arg(short = 't', long = "type")]
        kind: Option<TransactionType>,
        #[arg(short, long)]
        amount: Option<String>,
        #[arg(short = 'D', long)]
        description: Option<String>,
        #[arg(short, long)]
        category: Option<Category>,
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short, long, conflicts_with = "no_recurrence")]
        recurrence: Option<RecurrencePeriod>,
        /// Clear the recurrence marker
        #[arg(long)]
        no_recurrence: bool,
    },
    /// Delete a transaction
    Delete {
        /// Transaction ID (short form accepted)
        id: String,
    },
}

async fn resolve(engine: &Engine, identifier: &str) -> FintraxResult<crate::models::Transaction> {
    engine
        .transactions()
        .find(identifier)
        .await?
        .ok_or_else(|| FintraxError::transaction_not_found(identifier))
}

/// Handle a transaction command
pub async fn handle_transaction_command(
    engine: &Engine,
    settings: &Settings,
    cmd: TransactionCommands,
) -> FintraxResult<()> {
    let symbol = settings.currency_symbol.as_str();
    let service = engine.transactions();

    match cmd {
        TransactionCommands::Add {
            kind,
            amount,
            description,
            category,
            date,
            recurrence,
        } => {
            let amount = Money::parse_amount(&amount)?;
            let occurred_at = date.as_deref().map(parse_instant).transpose()?;

            let rx = engine.balance().watch_current();
            let txn = service
                .create(CreateTransactionInput {
                    transaction_type: kind,
                    amount,
                    description,
                    category,
                    occurred_at,
                    recurrence,
                })
                .await?;
            settle(rx).await;

            println!("Recorded transaction:");
            print!("{}", format_transaction_details(&txn, symbol));
        }

        TransactionCommands::List {
            period,
            granularity,
            category,
            kind,
            limit,
        } => {
            let mut filter = TransactionFilter::new().limit(limit);
            if let Some(key) = period.as_deref() {
                let bucket = engine.calendar().parse_or_current(granularity, Some(key))?;
                filter = filter.range(bucket.range());
            }
            if let Some(category) = category {
                filter = filter.category(category);
            }
            if let Some(kind) = kind {
                filter = filter.transaction_type(kind);
            }

            let transactions = service.list(filter).await?;
            print!("{}", format_transaction_table(&transactions, symbol));
        }

        TransactionCommands::Show { id } => {
            let txn = resolve(engine, &id).await?;
            print!("{}", format_transaction_details(&txn, symbol));
        }

        TransactionCommands::Update {
            id,
            kind,
            amount,
            description,
            category,
            date,
            recurrence,
            no_recurrence,
        } => {
            let txn = resolve(engine, &id).await?;
            let input = UpdateTransactionInput {
                transaction_type: kind,
                amount: amount.as_deref().map(Money::parse_amount).transpose()?,
                description,
                category,
                occurred_at: date.as_deref().map(parse_instant).transpose()?,
                recurrence: if no_recurrence {
                    Some(None)
                } else {
                    recurrence.map(Some)
                },
            };

            let rx = engine.balance().watch_current();
            let updated = service.update(txn.id, input).await?;
            settle(rx).await;

            println!("Updated transaction:");
            print!("{}", format_transaction_details(&updated, symbol));
        }

        TransactionCommands::Delete { id } => {
            let txn = resolve(engine, &id).await?;
            let rx = engine.balance().watch_current();
            let removed = service.delete(txn.id).await?;
            settle(rx).await;
            println!("Deleted transaction {} ({})", removed.id, removed.description);
        }
    }

    Ok(())
}
