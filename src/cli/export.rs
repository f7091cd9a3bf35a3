//! CLI command for data export

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::config::paths::FintraxPaths;
use crate::config::settings::Settings;
use crate::engine::Engine;
use crate::error::{FintraxError, FintraxResult};
use crate::export::{export_report_json, export_report_yaml, export_transactions_csv, ReportBundle};
use crate::models::Granularity;
use crate::services::TransactionFilter;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Transactions as CSV
    Csv,
    /// Report bundle as JSON
    Json,
    /// Report bundle as YAML (human-readable)
    Yaml,
}

impl ExportFormat {
    fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: ExportFormat,

    /// Output file; "-" writes to stdout. Defaults to the exports directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Period to report on (CSV: only its transactions)
    #[arg(short, long)]
    pub period: Option<String>,

    #[arg(short, long, default_value = "monthly")]
    pub granularity: Granularity,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// Handle the export command
pub async fn handle_export_command(
    engine: &Engine,
    settings: &Settings,
    paths: &FintraxPaths,
    args: ExportArgs,
) -> FintraxResult<()> {
    let bucket = engine
        .calendar()
        .parse_or_current(args.granularity, args.period.as_deref())?;

    let to_stdout = args.output.as_deref().is_some_and(|p| p.as_os_str() == "-");
    let path = args.output.clone().unwrap_or_else(|| {
        paths
            .export_dir()
            .join(format!("fintrax-{}.{}", bucket, args.format.extension()))
    });

    let mut writer: Box<dyn Write> = if to_stdout {
        Box::new(std::io::stdout().lock())
    } else {
        let file = File::create(&path)
            .map_err(|e| FintraxError::Export(format!("{}: {}", path.display(), e)))?;
        Box::new(BufWriter::new(file))
    };

    match args.format {
        ExportFormat::Csv => {
            let mut filter = TransactionFilter::new();
            if args.period.is_some() {
                filter = filter.range(bucket.range());
            }
            let mut transactions = engine.transactions().list(filter).await?;
            // oldest first reads better in a spreadsheet
            transactions.reverse();
            export_transactions_csv(&transactions, &mut writer)?;
        }
        ExportFormat::Json => {
            let bundle =
                ReportBundle::collect(engine, bucket, settings.default_trend_periods).await?;
            export_report_json(&bundle, &mut writer, args.pretty)?;
            writeln!(writer)?;
        }
        ExportFormat::Yaml => {
            let bundle =
                ReportBundle::collect(engine, bucket, settings.default_trend_periods).await?;
            export_report_yaml(&bundle, &mut writer)?;
        }
    }
    writer.flush()?;

    if !to_stdout {
        println!("Exported {} to {}", bucket, path.display());
    }
    Ok(())
}
