use std::fs;
use std::path::{Path, PathBuf};

use tracing::{Span, debug, field, info, instrument};

use crate::quickbooks::item_bills::error::{Result, ToolError};
use crate::quickbooks::item_bills::io::qbxml::{self, QbxmlRequest, RequestKind};
use crate::quickbooks::item_bills::model::ItemBillRecord;

/// Sends QBXML requests to QuickBooks and returns the raw responses.
///
/// Implementations wrap a connection to QuickBooks Desktop, such as the
/// Windows COM request processor (`QBXMLRP2.RequestProcessor`) bound to the
/// currently open company file.
pub trait RequestProcessor {
    fn process_request(&mut self, request: &QbxmlRequest) -> Result<String>;
}

/// Answers queries from a QBXML response previously saved to disk.
#[derive(Debug, Clone)]
pub struct ReplayProcessor {
    response_path: PathBuf,
}

impl ReplayProcessor {
    pub fn open(response_path: &Path) -> Result<Self> {
        if !response_path.exists() {
            return Err(ToolError::MissingInput(response_path.to_path_buf()));
        }
        Ok(Self {
            response_path: response_path.to_path_buf(),
        })
    }
}

impl RequestProcessor for ReplayProcessor {
    fn process_request(&mut self, request: &QbxmlRequest) -> Result<String> {
        match request.kind {
            RequestKind::BillQuery => Ok(fs::read_to_string(&self.response_path)?),
            RequestKind::BillAdd => Err(ToolError::ReadOnlySession(format!(
                "cannot add bills to replayed response {}",
                self.response_path.display()
            ))),
        }
    }
}

/// Opens the request processor for this run. Without a saved response to
/// replay there is no way to reach QuickBooks from this process.
pub fn open_processor(replay: Option<&Path>) -> Result<ReplayProcessor> {
    match replay {
        Some(path) => ReplayProcessor::open(path),
        None => Err(ToolError::NoSession(
            "QuickBooks Desktop is not reachable; pass a saved QBXML response to replay".into(),
        )),
    }
}

/// Item bills as stored in QuickBooks.
pub trait QuickBooksSource {
    /// Returns every bill in the open company file.
    fn fetch_item_bills(&mut self) -> Result<Vec<ItemBillRecord>>;

    /// Creates a bill and returns it as QuickBooks stored it.
    fn add_item_bill(&mut self, record: &ItemBillRecord) -> Result<ItemBillRecord>;
}

/// QBXML-speaking [`QuickBooksSource`] on top of a [`RequestProcessor`].
pub struct QuickBooksGateway<P> {
    processor: P,
}

impl<P: RequestProcessor> QuickBooksGateway<P> {
    pub fn new(processor: P) -> Self {
        Self { processor }
    }

    fn send(&mut self, request: &QbxmlRequest) -> Result<qbxml::QbxmlResponse> {
        debug!(kind = ?request.kind, request = %request.body, "sending QBXML request");
        let raw = self.processor.process_request(request)?;
        debug!(response = %raw, "received QBXML response");
        let response = qbxml::parse_response(&raw)?;
        response.status.ensure_ok()?;
        Ok(response)
    }
}

impl<P: RequestProcessor> QuickBooksSource for QuickBooksGateway<P> {
    #[instrument(level = "info", skip_all)]
    fn fetch_item_bills(&mut self) -> Result<Vec<ItemBillRecord>> {
        let response = self.send(&qbxml::bill_query_request())?;
        let total = response.bills.len();
        let records: Vec<ItemBillRecord> = response
            .bills
            .into_iter()
            .filter_map(qbxml::BillRet::into_record)
            .collect();
        info!(
            bill_count = records.len(),
            skipped = total - records.len(),
            "fetched bills from QuickBooks"
        );
        Ok(records)
    }

    #[instrument(
        level = "info",
        skip_all,
        fields(record_id = %record.record_id, txn_id = field::Empty)
    )]
    fn add_item_bill(&mut self, record: &ItemBillRecord) -> Result<ItemBillRecord> {
        let request = qbxml::bill_add_request(record)?;
        let response = self.send(&request)?;
        let stored = response
            .bills
            .into_iter()
            .next()
            .ok_or_else(|| ToolError::Qbxml("BillAddRs carries no stored bill".into()))?;
        if let Some(txn_id) = stored.txn_id.as_deref() {
            Span::current().record("txn_id", txn_id);
        }
        stored
            .into_record()
            .ok_or_else(|| ToolError::Qbxml("stored bill has no RefNumber".into()))
    }
}
