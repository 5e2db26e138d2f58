use indexmap::IndexMap;
use indexmap::map::Entry;
use tracing::{debug, warn};

use crate::quickbooks::item_bills::error::{Result, ToolError};
use crate::quickbooks::item_bills::model::{
    Conflict, ConflictReason, ItemBillRecord, Reconciliation, RecordId, Source,
};

/// Records of one source keyed by record id, in first-seen order.
pub type RecordIndex = IndexMap<RecordId, ItemBillRecord>;

/// Indexes the records of one source by record id.
///
/// A repeated id keeps the position where it was first seen but takes the
/// values of the last record carrying it. Records with an empty id are
/// rejected.
pub fn index_records<I>(source: Source, records: I) -> Result<RecordIndex>
where
    I: IntoIterator<Item = ItemBillRecord>,
{
    let mut index = RecordIndex::new();

    for (position, record) in records.into_iter().enumerate() {
        if record.record_id.trim().is_empty() {
            return Err(ToolError::MissingRecordId {
                origin: source,
                position,
            });
        }

        match index.entry(record.record_id.clone()) {
            Entry::Occupied(mut entry) => {
                warn!(
                    %source,
                    record_id = %record.record_id,
                    position,
                    "duplicate record id, keeping the later record"
                );
                entry.insert(record);
            }
            Entry::Vacant(entry) => {
                entry.insert(record);
            }
        }
    }

    Ok(index)
}

/// Classifies every record id of both sources as added, conflicting or same.
pub fn reconcile(excel: &RecordIndex, quickbooks: &RecordIndex) -> Reconciliation {
    let mut reconciliation = Reconciliation::default();

    for (record_id, excel_bill) in excel {
        match quickbooks.get(record_id) {
            None => reconciliation.added_itembills.push(excel_bill.clone()),
            Some(qb_bill) if excel_bill.same_fields(qb_bill) => {
                reconciliation.same_itembills += 1;
            }
            Some(qb_bill) => reconciliation.conflicts.push(Conflict::between(
                record_id.clone(),
                ConflictReason::DataMismatch,
                Some(excel_bill),
                Some(qb_bill),
            )),
        }
    }

    for (record_id, qb_bill) in quickbooks {
        if !excel.contains_key(record_id) {
            reconciliation.conflicts.push(Conflict::between(
                record_id.clone(),
                ConflictReason::MissingInExcel,
                None,
                Some(qb_bill),
            ));
        }
    }

    debug!(
        added = reconciliation.added_itembills.len(),
        conflicts = reconciliation.conflicts.len(),
        same = reconciliation.same_itembills,
        "reconciled item bills"
    );

    reconciliation
}
