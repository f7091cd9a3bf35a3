use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use fintrax::cli::{
    handle_export_command, handle_recurring_command, handle_report_command,
    handle_transaction_command, ExportArgs, RecurringCommands, ReportCommands,
    TransactionCommands,
};
use fintrax::config::{paths::FintraxPaths, settings::Settings};
use fintrax::engine::Engine;
use fintrax::services::PeriodCalendar;
use fintrax::storage::Storage;

#[derive(Parser)]
#[command(
    name = "fintrax",
    version,
    about = "Personal-finance tracker with live balances, summaries and trends",
    long_about = "fintrax records income and expenses and keeps balances, period \
                  summaries, category breakdowns and trends up to date as the \
                  ledger changes."
)]
struct Cli {
    /// Data directory (defaults to the platform config directory)
    #[arg(long, env = "FINTRAX_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Transaction management commands
    #[command(subcommand, alias = "transaction")]
    Txn(TransactionCommands),

    #[command(flatten)]
    Report(ReportCommands),

    /// Recurring monthly obligations
    #[command(subcommand)]
    Recurring(RecurringCommands),

    /// Export transactions or a report bundle
    Export(ExportArgs),

    /// Write a settings file with defaults
    Init,

    /// Show current configuration and paths
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = match cli.data_dir {
        Some(dir) => FintraxPaths::with_base_dir(dir),
        None => FintraxPaths::new()?,
    };
    let settings = Settings::load_or_create(&paths)?;
    fintrax::logging::init(settings.log_filter.as_deref());

    let Some(command) = cli.command else {
        println!("fintrax - personal finance tracker");
        println!();
        println!("Run 'fintrax --help' for usage information.");
        return Ok(());
    };

    match command {
        Commands::Init => {
            settings.save(&paths)?;
            paths.ensure_directories()?;
            println!("Initialized fintrax at: {}", paths.base_dir().display());
            return Ok(());
        }
        Commands::Config => {
            println!("fintrax Configuration");
            println!("=====================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Export directory: {}", paths.export_dir().display());
            println!("Initialized:      {}", paths.is_initialized());
            println!();
            println!("Settings:");
            println!("  Currency symbol:       {}", settings.currency_symbol);
            println!(
                "  Tracked granularities: {}",
                settings
                    .tracked_granularities
                    .iter()
                    .map(|g| g.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            println!("  Trend periods:         {}", settings.default_trend_periods);
            println!(
                "  Retry:                 {} attempts, {} ms base backoff",
                settings.retry.max_attempts, settings.retry.base_backoff_ms
            );
            println!("  Query timeout:         {} ms", settings.query_timeout_ms);
            return Ok(());
        }
        _ => {}
    }

    let storage = Storage::new(paths.clone(), &settings)?;
    let engine = Engine::open(&storage, PeriodCalendar::system(), &settings).await?;

    let result = match command {
        Commands::Txn(cmd) => handle_transaction_command(&engine, &settings, cmd).await,
        Commands::Report(cmd) => handle_report_command(&engine, &settings, cmd).await,
        Commands::Recurring(cmd) => handle_recurring_command(&engine, &settings, cmd),
        Commands::Export(args) => handle_export_command(&engine, &settings, &paths, args).await,
        Commands::Init | Commands::Config => Ok(()),
    };

    engine.shutdown().await;
    Ok(result?)
}
