//! CLI commands for balances and reports

use clap::Subcommand;

use crate::config::settings::Settings;
use crate::display::{
    format_balance, format_balance_history, format_breakdown, format_summary, format_trend,
    format_year_over_year,
};
use crate::engine::Engine;
use crate::error::FintraxResult;
use crate::models::Granularity;

/// Report subcommands
#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Show the current balance
    Balance {
        /// Show recorded snapshots for a granularity instead
        #[arg(long, value_name = "GRANULARITY")]
        history: Option<Granularity>,
    },

    /// Summarize one period
    Summary {
        #[arg(short, long, default_value = "monthly")]
        granularity: Granularity,
        /// Period key (e.g. "2024-03"), defaults to the current one
        #[arg(short, long)]
        period: Option<String>,
    },

    /// Spending by category
    Categories {
        #[arg(short, long, default_value = "monthly")]
        granularity: Granularity,
        #[arg(short, long)]
        period: Option<String>,
        /// Break down income instead of expenses
        #[arg(long)]
        income: bool,
    },

    /// Highest-spending categories this month
    Top {
        /// How many categories to show
        #[arg(allow_negative_numbers = true)]
        limit: i64,
    },

    /// Per-period income, expenses and net
    Trend {
        /// Number of periods, ending with the current one
        #[arg(short = 'n', long = "months")]
        periods: Option<usize>,
        #[arg(short, long, default_value = "monthly")]
        granularity: Granularity,
    },

    /// Year-to-date net against the same span last year
    Yoy,
}

/// Handle a report command
pub async fn handle_report_command(
    engine: &Engine,
    settings: &Settings,
    cmd: ReportCommands,
) -> FintraxResult<()> {
    let symbol = settings.currency_symbol.as_str();

    match cmd {
        ReportCommands::Balance { history: None } => {
            let balance = engine.balance().current_balance();
            print!(
                "{}",
                format_balance(&balance, symbol, engine.balance().is_stale())
            );
        }

        ReportCommands::Balance {
            history: Some(granularity),
        } => {
            let history = engine.balance().history(granularity)?;
            print!("{}", format_balance_history(&history, symbol));
        }

        ReportCommands::Summary {
            granularity,
            period,
        } => {
            let bucket = engine
                .calendar()
                .parse_or_current(granularity, period.as_deref())?;
            let summary = engine.summary().summary(bucket).await?;
            print!("{}", format_summary(&summary, symbol));
        }

        ReportCommands::Categories {
            granularity,
            period,
            income,
        } => {
            let bucket = engine
                .calendar()
                .parse_or_current(granularity, period.as_deref())?;
            let breakdown = if income {
                engine.categories().income_breakdown(bucket).await?
            } else {
                engine.categories().category_breakdown(bucket).await?
            };
            let kind = if income { "Income" } else { "Spending" };
            println!("{} by category for {}", kind, bucket);
            print!("{}", format_breakdown(&breakdown, symbol));
        }

        ReportCommands::Top { limit } => {
            let top = engine.categories().top_categories(limit).await?;
            print!("{}", format_breakdown(&top, symbol));
        }

        ReportCommands::Trend {
            periods,
            granularity,
        } => {
            let n = periods.unwrap_or(settings.default_trend_periods);
            let trend = engine.trends().trend(granularity, n).await?;
            print!("{}", format_trend(&trend, symbol));
        }

        ReportCommands::Yoy => {
            let yoy = engine.trends().year_over_year_comparison().await?;
            print!("{}", format_year_over_year(&yoy, symbol));
        }
    }

    Ok(())
}
