//! QBXML request construction and response parsing for vendor bills.

use chrono::NaiveDate;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

use crate::quickbooks::item_bills::error::{Result, ToolError};
use crate::quickbooks::item_bills::model::ItemBillRecord;

/// QBXML specification version sent in every request.
pub const QBXML_VERSION: &str = "16.0";

const QBXML_DATE_FORMAT: &str = "%Y-%m-%d";

/// Marks a memo written by [`bill_add_request`]. Only memos carrying it are
/// read back as record ids; anything else is free text typed in QuickBooks.
pub const MEMO_RECORD_PREFIX: &str = "record_id:";

/// Kind of operation a request performs. Request processors use it to refuse
/// writes they cannot honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    BillQuery,
    BillAdd,
}

/// A ready-to-send QBXML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QbxmlRequest {
    pub kind: RequestKind,
    pub body: String,
}

/// Builds a `BillQueryRq` listing every bill in the open company file.
pub fn bill_query_request() -> QbxmlRequest {
    QbxmlRequest {
        kind: RequestKind::BillQuery,
        body: envelope("    <BillQueryRq>\n    </BillQueryRq>\n"),
    }
}

/// Builds a `BillAddRq` for the record. The record id travels in the memo,
/// behind [`MEMO_RECORD_PREFIX`], so later queries can match the bill back to
/// its Excel row.
pub fn bill_add_request(record: &ItemBillRecord) -> Result<QbxmlRequest> {
    let supplier = record
        .supplier_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ToolError::InvalidRecord {
            record_id: record.record_id.clone(),
            reason: "supplier name is required to add a bill".into(),
        })?;

    let mut bill = String::new();
    bill.push_str("      <BillAdd>\n");
    bill.push_str(&format!(
        "        <VendorRef>\n          <FullName>{}</FullName>\n        </VendorRef>\n",
        escape(supplier)
    ));
    if let Some(date) = record.invoice_date {
        bill.push_str(&format!(
            "        <TxnDate>{}</TxnDate>\n",
            date.format(QBXML_DATE_FORMAT)
        ));
    }
    if let Some(number) = record.invoice_number.as_deref() {
        bill.push_str(&format!("        <RefNumber>{}</RefNumber>\n", escape(number)));
    }
    bill.push_str(&format!(
        "        <Memo>{}</Memo>\n",
        escape(memo_for(&record.record_id).as_str())
    ));
    bill.push_str("      </BillAdd>\n");

    Ok(QbxmlRequest {
        kind: RequestKind::BillAdd,
        body: envelope(&format!("    <BillAddRq>\n{bill}    </BillAddRq>\n")),
    })
}

/// Memo text carrying a record id.
pub fn memo_for(record_id: &str) -> String {
    format!("{MEMO_RECORD_PREFIX}{record_id}")
}

fn envelope(messages: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<?qbxml version=\"{QBXML_VERSION}\"?>\n<QBXML>\n  <QBXMLMsgsRq onError=\"stopOnError\">\n{messages}  </QBXMLMsgsRq>\n</QBXML>"
    )
}

/// Status attributes of the first response element that carries them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseStatus {
    pub code: i64,
    pub severity: Option<String>,
    pub message: String,
}

impl ResponseStatus {
    /// Code 1 means the query matched nothing, which is not a failure.
    pub fn is_ok(&self) -> bool {
        self.code == 0 || self.code == 1
    }

    pub fn ensure_ok(&self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(ToolError::QuickBooksStatus {
                code: self.code,
                message: self.message.clone(),
            })
        }
    }
}

/// A `BillRet` element reduced to the fields the reconciliation needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillRet {
    pub txn_id: Option<String>,
    pub vendor_name: Option<String>,
    pub ref_number: Option<String>,
    pub txn_date: Option<NaiveDate>,
    pub memo: Option<String>,
}

impl BillRet {
    /// Record id written by [`bill_add_request`], if the memo carries one.
    pub fn memo_record_id(&self) -> Option<&str> {
        self.memo
            .as_deref()
            .and_then(|memo| memo.strip_prefix(MEMO_RECORD_PREFIX))
            .map(str::trim)
            .filter(|record_id| !record_id.is_empty())
    }

    /// Converts the bill into a record. Bills created from Excel carry their
    /// record id in the memo; every other bill is keyed by its reference
    /// number. Bills without a reference number yield `None`.
    pub fn into_record(self) -> Option<ItemBillRecord> {
        let record_id = self.memo_record_id().map(str::to_string);
        let ref_number = self.ref_number?;
        let record_id = record_id.unwrap_or_else(|| ref_number.clone());
        Some(ItemBillRecord {
            record_id,
            supplier_name: self.vendor_name,
            invoice_number: Some(ref_number),
            invoice_date: self.txn_date,
        })
    }
}

/// A parsed QBXML response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QbxmlResponse {
    pub status: ResponseStatus,
    pub bills: Vec<BillRet>,
}

/// Parses a raw QBXML response. Fails when the document is not XML, when no
/// element carries a `statusCode`, or when a bill date is not `YYYY-MM-DD`.
pub fn parse_response(xml: &str) -> Result<QbxmlResponse> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut status: Option<ResponseStatus> = None;
    let mut bills = Vec::new();
    let mut current: Option<BillRet> = None;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                if status.is_none() {
                    status = read_status(&element)?;
                }
                let name = element_name(&element);
                if name == "BillRet" {
                    current = Some(BillRet::default());
                }
                path.push(name);
            }
            Event::Empty(element) => {
                if status.is_none() {
                    status = read_status(&element)?;
                }
            }
            Event::End(_) => {
                if path.pop().as_deref() == Some("BillRet") {
                    if let Some(bill) = current.take() {
                        bills.push(bill);
                    }
                }
            }
            Event::Text(text) => {
                if let Some(bill) = current.as_mut() {
                    let value = text.unescape()?.trim().to_string();
                    if !value.is_empty() {
                        assign_bill_field(bill, &path, value)?;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let status = status
        .ok_or_else(|| ToolError::Qbxml("response carries no status information".into()))?;
    Ok(QbxmlResponse { status, bills })
}

fn element_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

fn read_status(element: &BytesStart<'_>) -> Result<Option<ResponseStatus>> {
    let mut code = None;
    let mut severity = None;
    let mut message = String::new();

    for attribute in element.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        let value = attribute.unescape_value()?.into_owned();
        match attribute.key.as_ref() {
            b"statusCode" => {
                let parsed = value.trim().parse::<i64>().map_err(|_| {
                    ToolError::Qbxml(format!("non-numeric statusCode '{value}'"))
                })?;
                code = Some(parsed);
            }
            b"statusSeverity" => severity = Some(value),
            b"statusMessage" => message = value,
            _ => {}
        }
    }

    Ok(code.map(|code| ResponseStatus {
        code,
        severity,
        message,
    }))
}

fn assign_bill_field(bill: &mut BillRet, path: &[String], value: String) -> Result<()> {
    let path: Vec<&str> = path.iter().map(String::as_str).collect();
    match path.as_slice() {
        [.., "BillRet", "TxnID"] => bill.txn_id = Some(value),
        [.., "BillRet", "VendorRef", "FullName"] => bill.vendor_name = Some(value),
        [.., "BillRet", "RefNumber"] => bill.ref_number = Some(value),
        [.., "BillRet", "Memo"] => bill.memo = Some(value),
        [.., "BillRet", "TxnDate"] => {
            let date = NaiveDate::parse_from_str(&value, QBXML_DATE_FORMAT)
                .map_err(|_| ToolError::Qbxml(format!("invalid TxnDate '{value}'")))?;
            bill.txn_date = Some(date);
        }
        _ => {}
    }
    Ok(())
}
