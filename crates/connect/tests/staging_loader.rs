// Workbook → staging refresh, inbox handling, and the Legacy read.
// Run with: cargo test -p vmaster-connect --test staging_loader

use std::path::Path;

use rust_xlsxwriter::Workbook;

use vmaster_connect::{
    archive_workbook, find_inbox_workbook, refresh_staging, ConnectError, MappingDb,
};

const SHEET: &str = "Vendor Mapping";

fn write_workbook(path: &Path, rows: &[[&str; 7]]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet().set_name(SHEET).unwrap();

    let headers = [
        "Vendor ID",
        "Vendor Name",
        "Rollup Name",
        "Source System",
        "Group ID",
        "Group Description",
        "Active",
    ];
    for (col, title) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *title).unwrap();
    }
    for (i, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            sheet.write_string((i + 1) as u32, col as u16, *value).unwrap();
        }
    }
    workbook.save(path).unwrap();
}

#[test]
fn workbook_rows_replace_staging_wholesale() {
    let dir = tempfile::tempdir().unwrap();
    let workbook_path = dir.path().join("mapping.xlsx");
    let mut staging = MappingDb::open(&dir.path().join("staging.db")).unwrap();

    write_workbook(
        &workbook_path,
        &[
            ["a1", "Acme Corp", "ACME CORP", "ERP", "100", "Print", "Y"],
            ["l1", "Widget Co", "WIDGET CO", "Legacy", "200", "Paper", "N"],
        ],
    );
    let load = refresh_staging(&mut staging, &workbook_path, SHEET).unwrap();
    assert_eq!(load.rows_loaded, 2);
    assert_eq!(load.rows_skipped, 0);

    // Second workbook fully replaces the first.
    write_workbook(
        &workbook_path,
        &[["b1", "Beta LLC", "BETA LLC", "ERP", "300", "Ink", "Y"]],
    );
    refresh_staging(&mut staging, &workbook_path, SHEET).unwrap();

    let rows = staging.load_rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].vendor_name, "Beta LLC");
    assert_eq!(rows[0].rollup_name, "BETA LLC");
}

#[test]
fn blank_rows_are_skipped_and_counted() {
    let dir = tempfile::tempdir().unwrap();
    let workbook_path = dir.path().join("mapping.xlsx");
    let mut staging = MappingDb::open(&dir.path().join("staging.db")).unwrap();

    write_workbook(
        &workbook_path,
        &[
            ["a1", "Acme Corp", "ACME CORP", "ERP", "100", "Print", "Y"],
            ["", "", "", "", "", "", ""],
        ],
    );
    let load = refresh_staging(&mut staging, &workbook_path, SHEET).unwrap();
    assert_eq!(load.rows_loaded, 1);
    assert_eq!(load.rows_skipped, 1);
}

#[test]
fn missing_required_column_is_a_workbook_error() {
    let dir = tempfile::tempdir().unwrap();
    let workbook_path = dir.path().join("mapping.xlsx");
    let mut staging = MappingDb::open(&dir.path().join("staging.db")).unwrap();

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet().set_name(SHEET).unwrap();
    sheet.write_string(0, 0, "Vendor Name").unwrap();
    // No "Rollup Name" column.
    workbook.save(&workbook_path).unwrap();

    let err = refresh_staging(&mut staging, &workbook_path, SHEET).unwrap_err();
    assert!(matches!(err, ConnectError::Workbook { .. }));
}

#[test]
fn legacy_rows_come_back_filtered_and_typed() {
    let dir = tempfile::tempdir().unwrap();
    let workbook_path = dir.path().join("mapping.xlsx");
    let mut staging = MappingDb::open(&dir.path().join("staging.db")).unwrap();

    write_workbook(
        &workbook_path,
        &[
            ["a1", "Acme Corp", "ACME CORP", "ERP", "100", "Print", "Y"],
            ["l1", "Widget Co", "WIDGET CO", "legacy", "200", "Paper", "y"],
            ["l2", "Gadget Inc", "GADGET INC", "LEGACY", "200", "Paper", "N"],
        ],
    );
    refresh_staging(&mut staging, &workbook_path, SHEET).unwrap();

    let legacy = staging.load_legacy_suppliers().unwrap();
    assert_eq!(legacy.len(), 2);
    assert_eq!(legacy[0].supplier_id, "l1");
    assert!(legacy[0].active);
    assert_eq!(legacy[1].supplier_id, "l2");
    assert!(!legacy[1].active);
}

#[test]
fn inbox_returns_newest_workbook_and_archive_moves_it() {
    let dir = tempfile::tempdir().unwrap();
    let inbox = dir.path().join("inbox");
    std::fs::create_dir(&inbox).unwrap();

    assert!(find_inbox_workbook(&inbox).unwrap().is_none());

    write_workbook(&inbox.join("mapping-2024-01.xlsx"), &[]);
    write_workbook(&inbox.join("mapping-2024-02.xlsx"), &[]);
    std::fs::write(inbox.join("notes.txt"), "ignored").unwrap();

    let found = find_inbox_workbook(&inbox).unwrap().unwrap();
    assert_eq!(found.file_name().unwrap(), "mapping-2024-02.xlsx");

    let archived = archive_workbook(&found).unwrap();
    assert!(archived.ends_with("processed/mapping-2024-02.xlsx"));
    assert!(!found.exists());
    assert!(archived.exists());

    // The older workbook is still waiting.
    let next = find_inbox_workbook(&inbox).unwrap().unwrap();
    assert_eq!(next.file_name().unwrap(), "mapping-2024-01.xlsx");
}

#[test]
fn missing_inbox_dir_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(find_inbox_workbook(&dir.path().join("nope")).unwrap().is_none());
}
