use std::fs;
use std::path::Path;

use crate::quickbooks::item_bills::error::Result;
use crate::quickbooks::item_bills::model::ReconciliationReport;

/// Report file name used when no output path is given.
pub const DEFAULT_REPORT_NAME: &str = "item_bills_report.json";

/// Writes the report as pretty-printed JSON, creating missing parent
/// directories.
pub fn write_report(path: &Path, report: &ReconciliationReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json_string = serde_json::to_string_pretty(report)?;
    fs::write(path, json_string)?;
    Ok(())
}

/// Loads a report written by [`write_report`].
pub fn read_report(path: &Path) -> Result<ReconciliationReport> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
