//! Core library for the qb-item-bills command line application.
//!
//! The library reconciles vendor item bills exported to Excel against the
//! bills stored in QuickBooks Desktop. Source adapters live under
//! [`quickbooks::item_bills::io`], data representations inside
//! [`quickbooks::item_bills::model`], the classification logic in
//! [`quickbooks::item_bills::reconcile`], and the run orchestration under
//! [`quickbooks::item_bills::sync`].

pub mod quickbooks;

pub use quickbooks::item_bills::{Result, ToolError, error, io, model, reconcile, sync};
