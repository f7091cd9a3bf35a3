//! YAML report export, for reading by eye

use std::io::Write;

use crate::error::{FintraxError, FintraxResult};
use crate::export::json::ReportBundle;

fn export_error(err: impl std::fmt::Display) -> FintraxError {
    FintraxError::Export(err.to_string())
}

/// Write a bundle as YAML, preceded by a short comment header
pub fn export_report_yaml<W: Write>(bundle: &ReportBundle, writer: &mut W) -> FintraxResult<()> {
    writeln!(writer, "# fintrax report for {}", bundle.summary.bucket).map_err(export_error)?;
    writeln!(writer, "# Generated: {}", bundle.generated_at).map_err(export_error)?;
    writeln!(writer, "# App Version: {}", bundle.app_version).map_err(export_error)?;
    writeln!(writer).map_err(export_error)?;

    serde_yaml::to_writer(writer, bundle).map_err(export_error)?;
    Ok(())
}

/// Read a YAML bundle back and validate it
pub fn import_report_yaml(yaml_str: &str) -> FintraxResult<ReportBundle> {
    let bundle: ReportBundle = serde_yaml::from_str(yaml_str).map_err(export_error)?;
    bundle.validate().map_err(FintraxError::Export)?;
    Ok(bundle)
}
