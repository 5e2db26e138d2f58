use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Local};
use tracing::{info, instrument, warn};

use crate::quickbooks::item_bills::error::Result;
use crate::quickbooks::item_bills::io::excel_read::{self, DEFAULT_SHEET};
use crate::quickbooks::item_bills::io::report::{self, DEFAULT_REPORT_NAME};
use crate::quickbooks::item_bills::io::session::QuickBooksSource;
use crate::quickbooks::item_bills::model::{Reconciliation, ReconciliationReport, Source};
use crate::quickbooks::item_bills::reconcile::{index_records, reconcile};

/// Inputs of one synchronisation run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Excel workbook exported from the company books.
    pub workbook: PathBuf,
    /// Worksheet holding the item bills.
    pub sheet: String,
    /// Where the JSON report is written.
    pub output: PathBuf,
    /// Push bills found only in Excel to QuickBooks.
    pub apply: bool,
}

impl SyncOptions {
    pub fn new(workbook: impl Into<PathBuf>) -> Self {
        Self {
            workbook: workbook.into(),
            sheet: DEFAULT_SHEET.to_string(),
            output: PathBuf::from(DEFAULT_REPORT_NAME),
            apply: false,
        }
    }
}

/// Reconciles the workbook against QuickBooks and writes the report.
///
/// Failures while reading either source, reconciling, or applying additions
/// are recorded in an error report rather than returned; only a failure to
/// write the report itself surfaces as `Err`.
#[instrument(
    level = "info",
    skip_all,
    fields(workbook = %options.workbook.display(), output = %options.output.display())
)]
pub fn sync_item_bills<S, F>(options: &SyncOptions, open_quickbooks: F) -> Result<ReconciliationReport>
where
    S: QuickBooksSource,
    F: FnOnce() -> Result<S>,
{
    let report = match collect(options, open_quickbooks) {
        Ok(reconciliation) => ReconciliationReport::success(reconciliation, timestamp()),
        Err(error) => {
            warn!(%error, "item bill synchronisation failed");
            ReconciliationReport::failure(error.to_string(), timestamp())
        }
    };

    report::write_report(&options.output, &report)?;
    info!(status = ?report.status, "report written");
    Ok(report)
}

fn collect<S, F>(options: &SyncOptions, open_quickbooks: F) -> Result<Reconciliation>
where
    S: QuickBooksSource,
    F: FnOnce() -> Result<S>,
{
    let excel_bills = excel_read::read_item_bills(&options.workbook, &options.sheet)?;
    info!(bill_count = excel_bills.len(), "read bills from workbook");

    let mut quickbooks = open_quickbooks()?;
    let qb_bills = quickbooks.fetch_item_bills()?;

    let excel = index_records(Source::Excel, excel_bills)?;
    let qb = index_records(Source::QuickBooks, qb_bills)?;
    let reconciliation = reconcile(&excel, &qb);
    info!(
        added = reconciliation.added_itembills.len(),
        conflicts = reconciliation.conflicts.len(),
        same = reconciliation.same_itembills,
        "reconciliation complete"
    );

    if options.apply {
        apply_additions(&mut quickbooks, &reconciliation)?;
    }

    Ok(reconciliation)
}

/// Adds every Excel-only bill in report order. The first failure aborts.
fn apply_additions<S: QuickBooksSource>(
    quickbooks: &mut S,
    reconciliation: &Reconciliation,
) -> Result<()> {
    for bill in &reconciliation.added_itembills {
        let stored = quickbooks.add_item_bill(bill)?;
        if stored.record_id != bill.record_id || !stored.same_fields(bill) {
            warn!(
                record_id = %bill.record_id,
                stored_record_id = %stored.record_id,
                ?stored,
                "QuickBooks stored the bill with different values"
            );
        }
    }
    info!(
        added = reconciliation.added_itembills.len(),
        "added bills to QuickBooks"
    );
    Ok(())
}

fn timestamp() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}
