use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Key used to match a bill across the Excel export and QuickBooks. Excel
/// builds it from the `Parent ID`/`Child ID` columns, QuickBooks stores it in
/// the bill memo.
pub type RecordId = String;

/// Identifies where a record was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Excel,
    QuickBooks,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Excel => write!(f, "excel"),
            Source::QuickBooks => write!(f, "quickbooks"),
        }
    }
}

/// One item bill observed in either source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemBillRecord {
    /// Matching key, unique within its source.
    pub record_id: RecordId,
    pub supplier_name: Option<String>,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,
}

impl ItemBillRecord {
    /// Creates a record with only its identifier populated.
    pub fn new(record_id: impl Into<RecordId>) -> Self {
        Self {
            record_id: record_id.into(),
            supplier_name: None,
            invoice_number: None,
            invoice_date: None,
        }
    }

    pub fn with_supplier(mut self, supplier_name: impl Into<String>) -> Self {
        self.supplier_name = Some(supplier_name.into());
        self
    }

    pub fn with_invoice_number(mut self, invoice_number: impl Into<String>) -> Self {
        self.invoice_number = Some(invoice_number.into());
        self
    }

    pub fn with_invoice_date(mut self, invoice_date: NaiveDate) -> Self {
        self.invoice_date = Some(invoice_date);
        self
    }

    /// Returns `true` when supplier, invoice number and invoice date are
    /// equal. Comparison is exact: no trimming and no case folding.
    pub fn same_fields(&self, other: &ItemBillRecord) -> bool {
        self.supplier_name == other.supplier_name
            && self.invoice_number == other.invoice_number
            && self.invoice_date == other.invoice_date
    }
}

/// Why a record id ended up in the conflict list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// Present in both sources with at least one differing field.
    DataMismatch,
    /// Present only in QuickBooks.
    MissingInExcel,
    /// Present only in Excel. Part of the report contract, but Excel-only
    /// records are reported as added bills instead.
    MissingInQuickbooks,
}

/// A discrepancy for one record id, carrying both sides' values untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub record_id: RecordId,
    pub reason: ConflictReason,
    pub excel_supplier_name: Option<String>,
    pub qb_supplier_name: Option<String>,
    pub excel_invoice_number: Option<String>,
    pub qb_invoice_number: Option<String>,
    pub excel_invoice_date: Option<NaiveDate>,
    pub qb_invoice_date: Option<NaiveDate>,
}

impl Conflict {
    /// Builds a conflict from the Excel and QuickBooks sides of a record id.
    /// Either side may be absent.
    pub fn between(
        record_id: impl Into<RecordId>,
        reason: ConflictReason,
        excel: Option<&ItemBillRecord>,
        quickbooks: Option<&ItemBillRecord>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            reason,
            excel_supplier_name: excel.and_then(|bill| bill.supplier_name.clone()),
            qb_supplier_name: quickbooks.and_then(|bill| bill.supplier_name.clone()),
            excel_invoice_number: excel.and_then(|bill| bill.invoice_number.clone()),
            qb_invoice_number: quickbooks.and_then(|bill| bill.invoice_number.clone()),
            excel_invoice_date: excel.and_then(|bill| bill.invoice_date),
            qb_invoice_date: quickbooks.and_then(|bill| bill.invoice_date),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Success,
    Error,
}

/// Classification produced by a single reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Records present only in Excel, in Excel order.
    pub added_itembills: Vec<ItemBillRecord>,
    /// Mismatches first in Excel order, then QuickBooks-only ids in
    /// QuickBooks order.
    pub conflicts: Vec<Conflict>,
    /// Number of ids present in both sources with identical fields.
    pub same_itembills: usize,
}

impl Reconciliation {
    /// Number of distinct record ids the classification covers.
    pub fn record_count(&self) -> usize {
        self.added_itembills.len() + self.conflicts.len() + self.same_itembills
    }
}

/// The JSON document written at the end of every run. Field order is the key
/// order of the serialized report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub status: ReportStatus,
    pub generated_at: DateTime<FixedOffset>,
    pub added_itembills: Vec<ItemBillRecord>,
    pub conflicts: Vec<Conflict>,
    pub same_itembills: usize,
    pub error: Option<String>,
}

impl ReconciliationReport {
    /// Stamps a successful reconciliation.
    pub fn success(reconciliation: Reconciliation, generated_at: DateTime<FixedOffset>) -> Self {
        Self {
            status: ReportStatus::Success,
            generated_at,
            added_itembills: reconciliation.added_itembills,
            conflicts: reconciliation.conflicts,
            same_itembills: reconciliation.same_itembills,
            error: None,
        }
    }

    /// Builds the empty report written when a run fails.
    pub fn failure(message: impl Into<String>, generated_at: DateTime<FixedOffset>) -> Self {
        Self {
            status: ReportStatus::Error,
            generated_at,
            added_itembills: Vec::new(),
            conflicts: Vec::new(),
            same_itembills: 0,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ReportStatus::Success
    }
}
