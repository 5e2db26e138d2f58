use std::path::PathBuf;

use thiserror::Error;

use crate::quickbooks::item_bills::model::Source;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the failures that can occur while the tool reads its
/// sources, talks to QuickBooks, or writes the report.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when a sheet does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when a record reaches indexing without an identifier.
    #[error("{origin} record at position {position} has no record_id")]
    MissingRecordId { origin: Source, position: usize },

    /// Raised when a record cannot be turned into a QuickBooks request.
    #[error("invalid item bill '{record_id}': {reason}")]
    InvalidRecord { record_id: String, reason: String },

    /// Raised when no QuickBooks request processor can be reached.
    #[error("no QuickBooks session available: {0}")]
    NoSession(String),

    /// Raised when a write is attempted against a replayed QuickBooks response.
    #[error("QuickBooks session is read-only: {0}")]
    ReadOnlySession(String),

    /// Low-level XML failures while reading a QBXML response.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Raised when a QBXML response is well-formed XML but not a usable reply.
    #[error("malformed QBXML response: {0}")]
    Qbxml(String),

    /// Raised when QuickBooks answers a request with a failure status.
    #[error("QuickBooks error ({code}): {message}")]
    QuickBooksStatus { code: i64, message: String },

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
