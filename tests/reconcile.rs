use chrono::{DateTime, NaiveDate};
use qb_item_bills::ToolError;
use qb_item_bills::model::{
    ConflictReason, ItemBillRecord, ReconciliationReport, ReportStatus, Source,
};
use qb_item_bills::reconcile::{RecordIndex, index_records, reconcile};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn bill(id: &str, supplier: &str, invoice: &str, on: NaiveDate) -> ItemBillRecord {
    ItemBillRecord::new(id)
        .with_supplier(supplier)
        .with_invoice_number(invoice)
        .with_invoice_date(on)
}

fn index(source: Source, records: Vec<ItemBillRecord>) -> RecordIndex {
    index_records(source, records).expect("records indexed")
}

#[test]
fn excel_only_bill_is_added() {
    let excel = index(
        Source::Excel,
        vec![bill("44444-11111", "C", "33333", date(2023, 12, 8))],
    );
    let qb = index(Source::QuickBooks, Vec::new());

    let reconciliation = reconcile(&excel, &qb);

    assert_eq!(
        reconciliation.added_itembills,
        vec![bill("44444-11111", "C", "33333", date(2023, 12, 8))]
    );
    assert!(reconciliation.conflicts.is_empty());
    assert_eq!(reconciliation.same_itembills, 0);
}

#[test]
fn differing_invoice_number_is_a_data_mismatch() {
    let excel = index(
        Source::Excel,
        vec![bill("44733-", "B", "60956", date(2023, 11, 9))],
    );
    let qb = index(
        Source::QuickBooks,
        vec![bill("44733-", "B", "609", date(2023, 11, 9))],
    );

    let reconciliation = reconcile(&excel, &qb);

    assert!(reconciliation.added_itembills.is_empty());
    assert_eq!(reconciliation.same_itembills, 0);
    assert_eq!(reconciliation.conflicts.len(), 1);

    let conflict = &reconciliation.conflicts[0];
    assert_eq!(conflict.record_id, "44733-");
    assert_eq!(conflict.reason, ConflictReason::DataMismatch);
    assert_eq!(conflict.excel_supplier_name.as_deref(), Some("B"));
    assert_eq!(conflict.qb_supplier_name.as_deref(), Some("B"));
    assert_eq!(conflict.excel_invoice_number.as_deref(), Some("60956"));
    assert_eq!(conflict.qb_invoice_number.as_deref(), Some("609"));
    assert_eq!(conflict.excel_invoice_date, Some(date(2023, 11, 9)));
    assert_eq!(conflict.qb_invoice_date, Some(date(2023, 11, 9)));
}

#[test]
fn quickbooks_only_bill_is_missing_in_excel() {
    let excel = index(Source::Excel, Vec::new());
    let qb = index(
        Source::QuickBooks,
        vec![bill("10-1", "X", "10", date(2025, 1, 10))],
    );

    let reconciliation = reconcile(&excel, &qb);

    assert!(reconciliation.added_itembills.is_empty());
    assert_eq!(reconciliation.conflicts.len(), 1);
    let conflict = &reconciliation.conflicts[0];
    assert_eq!(conflict.reason, ConflictReason::MissingInExcel);
    assert_eq!(conflict.excel_supplier_name, None);
    assert_eq!(conflict.excel_invoice_number, None);
    assert_eq!(conflict.excel_invoice_date, None);
    assert_eq!(conflict.qb_supplier_name.as_deref(), Some("X"));
    assert_eq!(conflict.qb_invoice_number.as_deref(), Some("10"));
    assert_eq!(conflict.qb_invoice_date, Some(date(2025, 1, 10)));
}

#[test]
fn identical_bills_are_only_counted() {
    let shared = bill("1-1", "A", "1", date(2025, 1, 1));
    let excel = index(Source::Excel, vec![shared.clone()]);
    let qb = index(Source::QuickBooks, vec![shared]);

    let reconciliation = reconcile(&excel, &qb);

    assert_eq!(reconciliation.same_itembills, 1);
    assert!(reconciliation.added_itembills.is_empty());
    assert!(reconciliation.conflicts.is_empty());
}

#[test]
fn comparison_is_case_sensitive_and_unnormalized() {
    let excel = index(
        Source::Excel,
        vec![
            bill("1", "Acme", "100", date(2025, 1, 1)),
            bill("2", "Bolt Co", "200", date(2025, 1, 2)),
        ],
    );
    let qb = index(
        Source::QuickBooks,
        vec![
            bill("1", "ACME", "100", date(2025, 1, 1)),
            bill("2", "Bolt Co ", "200", date(2025, 1, 2)),
        ],
    );

    let reconciliation = reconcile(&excel, &qb);

    assert_eq!(reconciliation.same_itembills, 0);
    assert_eq!(reconciliation.conflicts.len(), 2);
    assert_eq!(
        reconciliation.conflicts[1].qb_supplier_name.as_deref(),
        Some("Bolt Co ")
    );
}

#[test]
fn absent_and_present_dates_differ() {
    let excel = index(
        Source::Excel,
        vec![ItemBillRecord::new("7").with_supplier("A").with_invoice_number("7")],
    );
    let qb = index(Source::QuickBooks, vec![bill("7", "A", "7", date(2025, 3, 1))]);

    let reconciliation = reconcile(&excel, &qb);

    assert_eq!(reconciliation.conflicts.len(), 1);
    assert_eq!(reconciliation.conflicts[0].excel_invoice_date, None);
    assert_eq!(reconciliation.conflicts[0].qb_invoice_date, Some(date(2025, 3, 1)));
}

#[test]
fn every_record_id_is_classified_exactly_once() {
    let excel = index(
        Source::Excel,
        vec![
            bill("a", "A", "1", date(2025, 1, 1)),
            bill("b", "B", "2", date(2025, 1, 2)),
            bill("c", "C", "3", date(2025, 1, 3)),
            bill("d", "D", "4", date(2025, 1, 4)),
        ],
    );
    let qb = index(
        Source::QuickBooks,
        vec![
            bill("b", "B", "2", date(2025, 1, 2)),
            bill("c", "C", "30", date(2025, 1, 3)),
            bill("x", "X", "10", date(2025, 1, 10)),
            bill("y", "Y", "11", date(2025, 1, 11)),
        ],
    );

    let reconciliation = reconcile(&excel, &qb);

    assert_eq!(reconciliation.record_count(), 6);
    let added: Vec<&str> = reconciliation
        .added_itembills
        .iter()
        .map(|bill| bill.record_id.as_str())
        .collect();
    assert_eq!(added, vec!["a", "d"]);

    let conflicts: Vec<(&str, ConflictReason)> = reconciliation
        .conflicts
        .iter()
        .map(|conflict| (conflict.record_id.as_str(), conflict.reason))
        .collect();
    assert_eq!(
        conflicts,
        vec![
            ("c", ConflictReason::DataMismatch),
            ("x", ConflictReason::MissingInExcel),
            ("y", ConflictReason::MissingInExcel),
        ]
    );
    assert_eq!(reconciliation.same_itembills, 1);
}

#[test]
fn duplicate_ids_keep_first_position_and_last_values() {
    let excel = index(
        Source::Excel,
        vec![
            bill("dup", "Old", "1", date(2025, 1, 1)),
            bill("other", "B", "2", date(2025, 1, 2)),
            bill("dup", "New", "1", date(2025, 1, 1)),
        ],
    );

    let ids: Vec<&str> = excel.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["dup", "other"]);
    assert_eq!(excel["dup"].supplier_name.as_deref(), Some("New"));
}

#[test]
fn empty_record_id_is_rejected() {
    let error = index_records(
        Source::QuickBooks,
        vec![
            bill("ok", "A", "1", date(2025, 1, 1)),
            ItemBillRecord::new("  ").with_supplier("B"),
        ],
    )
    .expect_err("empty id must fail");

    match error {
        ToolError::MissingRecordId { origin, position } => {
            assert_eq!(origin, Source::QuickBooks);
            assert_eq!(position, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn repeated_runs_serialize_identically() {
    let excel = index(
        Source::Excel,
        vec![
            bill("44444-11111", "C", "33333", date(2023, 12, 8)),
            bill("44733-", "B", "60956", date(2023, 11, 9)),
        ],
    );
    let qb = index(
        Source::QuickBooks,
        vec![
            bill("44733-", "B", "609", date(2023, 11, 9)),
            bill("9", "Z", "9", date(2023, 1, 1)),
        ],
    );
    let generated_at =
        DateTime::parse_from_rfc3339("2025-01-01T10:00:00+02:00").expect("timestamp parsed");

    let first = ReconciliationReport::success(reconcile(&excel, &qb), generated_at);
    let second = ReconciliationReport::success(reconcile(&excel, &qb), generated_at);

    assert_eq!(
        serde_json::to_string(&first).expect("report serialized"),
        serde_json::to_string(&second).expect("report serialized")
    );
}

#[test]
fn report_serializes_with_contract_keys() {
    let excel = index(
        Source::Excel,
        vec![bill("44444-11111", "C", "33333", date(2023, 12, 8))],
    );
    let qb = index(
        Source::QuickBooks,
        vec![ItemBillRecord::new("5").with_invoice_number("5")],
    );
    let generated_at =
        DateTime::parse_from_rfc3339("2025-01-01T10:00:00+02:00").expect("timestamp parsed");

    let report = ReconciliationReport::success(reconcile(&excel, &qb), generated_at);
    let json = serde_json::to_value(&report).expect("report serialized");

    assert_eq!(
        json,
        serde_json::json!({
            "status": "success",
            "generated_at": "2025-01-01T10:00:00+02:00",
            "added_itembills": [{
                "record_id": "44444-11111",
                "supplier_name": "C",
                "invoice_number": "33333",
                "invoice_date": "2023-12-08"
            }],
            "conflicts": [{
                "record_id": "5",
                "reason": "missing_in_excel",
                "excel_supplier_name": null,
                "qb_supplier_name": null,
                "excel_invoice_number": null,
                "qb_invoice_number": "5",
                "excel_invoice_date": null,
                "qb_invoice_date": null
            }],
            "same_itembills": 0,
            "error": null
        })
    );
}

#[test]
fn failure_report_is_empty() {
    let generated_at =
        DateTime::parse_from_rfc3339("2025-01-01T10:00:00Z").expect("timestamp parsed");

    let report = ReconciliationReport::failure("no QuickBooks session", generated_at);

    assert_eq!(report.status, ReportStatus::Error);
    assert!(report.added_itembills.is_empty());
    assert!(report.conflicts.is_empty());
    assert_eq!(report.same_itembills, 0);
    assert_eq!(report.error.as_deref(), Some("no QuickBooks session"));
}
