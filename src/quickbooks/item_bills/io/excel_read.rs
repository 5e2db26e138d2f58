use std::collections::HashMap;
use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::quickbooks::item_bills::error::{Result, ToolError};
use crate::quickbooks::item_bills::model::ItemBillRecord;

/// Worksheet holding the vendor item bills in the company export.
pub const DEFAULT_SHEET: &str = "account debit vendor";

const SUPPLIER_HEADER: &str = "supplier name";
const INVOICE_DATE_HEADER: &str = "invoice date";
const INVOICE_NUMBER_HEADER: &str = "invoice num";
const PARENT_ID_HEADER: &str = "parent id";
const CHILD_ID_HEADER: &str = "child id";

// Largest serial Excel accepts (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Reads item bills from the named worksheet of an Excel workbook.
///
/// The first row holds the headers, matched case-insensitively. Rows without a
/// supplier name or invoice number are skipped. The record id is
/// `<Parent ID>-<Child ID>` when either part is present, otherwise the invoice
/// number.
pub fn read_item_bills(path: &Path, sheet: &str) -> Result<Vec<ItemBillRecord>> {
    if !path.exists() {
        return Err(ToolError::MissingInput(path.to_path_buf()));
    }

    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = read_required_sheet(&mut workbook, sheet)?;

    let mut rows = range.rows();
    let columns = match rows.next() {
        Some(header_row) => Columns::locate(header_row)?,
        None => return Ok(Vec::new()),
    };

    let mut bills = Vec::new();
    for (row_idx, row) in rows.enumerate() {
        match columns.read_row(row) {
            Some(bill) => bills.push(bill),
            None => debug!(row = row_idx + 2, "skipping row without supplier or invoice number"),
        }
    }

    Ok(bills)
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<calamine::Range<DataType>> {
    let wanted = normalize_header(name);
    let sheet_name = workbook
        .sheet_names()
        .iter()
        .find(|candidate| normalize_header(candidate) == wanted)
        .cloned()
        .ok_or_else(|| ToolError::InvalidWorkbook(format!("missing sheet '{name}'")))?;

    let range_result = workbook
        .worksheet_range(&sheet_name)
        .ok_or_else(|| ToolError::InvalidWorkbook(format!("missing sheet '{name}'")))?;
    let range = range_result.map_err(ToolError::from)?;
    Ok(range)
}

/// Column positions resolved from the header row.
struct Columns {
    supplier: usize,
    invoice_number: usize,
    invoice_date: Option<usize>,
    parent_id: Option<usize>,
    child_id: Option<usize>,
}

impl Columns {
    fn locate(header_row: &[DataType]) -> Result<Self> {
        let index: HashMap<String, usize> = header_row
            .iter()
            .enumerate()
            .map(|(idx, cell)| (normalize_header(&cell_to_string(Some(cell))), idx))
            .collect();

        let required = |header: &str| {
            index.get(header).copied().ok_or_else(|| {
                ToolError::InvalidWorkbook(format!("missing required column '{header}'"))
            })
        };

        Ok(Self {
            supplier: required(SUPPLIER_HEADER)?,
            invoice_number: required(INVOICE_NUMBER_HEADER)?,
            invoice_date: index.get(INVOICE_DATE_HEADER).copied(),
            parent_id: index.get(PARENT_ID_HEADER).copied(),
            child_id: index.get(CHILD_ID_HEADER).copied(),
        })
    }

    fn read_row(&self, row: &[DataType]) -> Option<ItemBillRecord> {
        let supplier = cell_to_string(row.get(self.supplier));
        let invoice_number = cell_to_string(row.get(self.invoice_number));
        if supplier.is_empty() || invoice_number.is_empty() {
            return None;
        }

        let invoice_date = self
            .invoice_date
            .and_then(|idx| row.get(idx))
            .and_then(cell_to_date);

        let parent = self
            .parent_id
            .map(|idx| cell_to_string(row.get(idx)))
            .unwrap_or_default();
        let child = self
            .child_id
            .map(|idx| cell_to_string(row.get(idx)))
            .unwrap_or_default();
        let record_id = if parent.is_empty() && child.is_empty() {
            invoice_number.clone()
        } else {
            format!("{parent}-{child}")
        };

        let mut bill = ItemBillRecord::new(record_id)
            .with_supplier(supplier)
            .with_invoice_number(invoice_number);
        bill.invoice_date = invoice_date;
        Some(bill)
    }
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Renders a cell as trimmed text. Integer-valued numbers lose their
/// fractional part so that `60956.0` reads as `60956`.
fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.trim().to_string(),
        Some(DataType::Float(value)) => format_number(*value),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string().trim().to_string(),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

fn cell_to_date(cell: &DataType) -> Option<NaiveDate> {
    match cell {
        DataType::DateTime(serial) | DataType::Float(serial) => serial_to_date(*serial),
        DataType::Int(serial) => serial_to_date(*serial as f64),
        DataType::String(value) => parse_iso_date(value),
        DataType::Empty => None,
        other => parse_iso_date(&other.to_string()),
    }
}

/// Converts a 1900-system Excel serial to a date. Serial 1 is 1900-01-01.
/// Serial 60 is Excel's phantom 1900-02-29 and has no date; serials after it
/// are shifted back by that extra day.
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let days = serial.floor() as i64;
    let epoch = match days {
        ..=59 => NaiveDate::from_ymd_opt(1899, 12, 31)?,
        60 => return None,
        _ => NaiveDate::from_ymd_opt(1899, 12, 30)?,
    };
    epoch.checked_add_signed(Duration::days(days))
}

/// Parses a text date: a plain `YYYY-MM-DD`, an RFC 3339 timestamp, or a
/// local date-time with optional fractional seconds. Timestamps keep the
/// calendar date they were written with.
fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|dt| dt.date())
        })
}
