//! Mapping workbook → staging table refresh.
//!
//! The finance team maintains the vendor mapping as an .xlsx workbook. When
//! a fresh copy lands in the inbox directory, its rows replace the staging
//! table wholesale (one transaction); the workbook is archived to a
//! `processed/` sibling only after the cycle fully succeeds. No workbook in
//! the inbox means the previous staging rows are reused as-is.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};

use vmaster_recon::MappingRow;

use crate::db::MappingDb;
use crate::error::ConnectError;

pub(crate) const STAGING_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS vendor_mapping (
    vendor_id TEXT NOT NULL,
    vendor_name TEXT NOT NULL,
    rollup_name TEXT NOT NULL,
    source_system TEXT NOT NULL DEFAULT '',
    group_id TEXT NOT NULL DEFAULT '',
    group_description TEXT NOT NULL DEFAULT '',
    active_yn TEXT NOT NULL DEFAULT 'Y'
);
";

/// Column titles the sheet must carry (matched case-insensitively).
const COL_VENDOR_ID: &str = "vendor id";
const COL_VENDOR_NAME: &str = "vendor name";
const COL_ROLLUP_NAME: &str = "rollup name";
const COL_SOURCE_SYSTEM: &str = "source system";
const COL_GROUP_ID: &str = "group id";
const COL_GROUP_DESCRIPTION: &str = "group description";
const COL_ACTIVE: &str = "active";

#[derive(Debug)]
pub struct WorkbookLoad {
    pub rows_loaded: usize,
    pub rows_skipped: usize,
}

/// Replace the staging table with the workbook's rows. DELETE + INSERT run
/// in one transaction, so a failed load leaves the previous rows intact.
pub fn refresh_staging(
    staging: &mut MappingDb,
    workbook: &Path,
    sheet: &str,
) -> Result<WorkbookLoad, ConnectError> {
    let (rows, rows_skipped) = read_workbook(workbook, sheet)?;
    let rows_loaded = rows.len();

    let tx = staging
        .conn
        .transaction()
        .map_err(|e| ConnectError::db("staging refresh", e))?;

    tx.execute("DELETE FROM vendor_mapping", [])
        .map_err(|e| ConnectError::db("staging refresh", e))?;
    {
        let mut insert = tx
            .prepare(
                "INSERT INTO vendor_mapping
                 (vendor_id, vendor_name, rollup_name, source_system,
                  group_id, group_description, active_yn)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .map_err(|e| ConnectError::db("staging refresh", e))?;
        for row in &rows {
            insert
                .execute(rusqlite::params![
                    row.vendor_id,
                    row.vendor_name,
                    row.rollup_name,
                    row.source_system,
                    row.group_id,
                    row.group_description,
                    row.active_yn,
                ])
                .map_err(|e| ConnectError::db("staging refresh", e))?;
        }
    }
    tx.commit()
        .map_err(|e| ConnectError::db("staging refresh", e))?;

    Ok(WorkbookLoad {
        rows_loaded,
        rows_skipped,
    })
}

fn read_workbook(path: &Path, sheet: &str) -> Result<(Vec<MappingRow>, usize), ConnectError> {
    let workbook_err = |message: String| ConnectError::Workbook {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| workbook_err(e.to_string()))?;
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| workbook_err(format!("sheet '{sheet}': {e}")))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| workbook_err(format!("sheet '{sheet}' is empty")))?;

    let find = |title: &str| {
        header
            .iter()
            .position(|cell| cell_text(cell).trim().eq_ignore_ascii_case(title))
    };

    // Vendor name + rollup name are what reconciliation runs on; the rest
    // degrade to empty strings when the column is missing.
    let vendor_name_col = find(COL_VENDOR_NAME)
        .ok_or_else(|| workbook_err(format!("missing column '{COL_VENDOR_NAME}'")))?;
    let rollup_name_col = find(COL_ROLLUP_NAME)
        .ok_or_else(|| workbook_err(format!("missing column '{COL_ROLLUP_NAME}'")))?;
    let vendor_id_col = find(COL_VENDOR_ID);
    let source_system_col = find(COL_SOURCE_SYSTEM);
    let group_id_col = find(COL_GROUP_ID);
    let group_description_col = find(COL_GROUP_DESCRIPTION);
    let active_col = find(COL_ACTIVE);

    let cell = |row: &[Data], col: Option<usize>| {
        col.and_then(|i| row.get(i))
            .map(cell_text)
            .unwrap_or_default()
            .trim()
            .to_string()
    };

    let mut parsed = Vec::new();
    let mut skipped = 0usize;
    for row in rows {
        let vendor_name = cell(row, Some(vendor_name_col));
        let rollup_name = cell(row, Some(rollup_name_col));

        // A row with neither name nor rollup is padding, not data.
        if vendor_name.is_empty() && rollup_name.is_empty() {
            skipped += 1;
            continue;
        }

        parsed.push(MappingRow {
            vendor_id: cell(row, vendor_id_col),
            vendor_name,
            rollup_name,
            source_system: cell(row, source_system_col),
            group_id: cell(row, group_id_col),
            group_description: cell(row, group_description_col),
            active_yn: {
                let raw = cell(row, active_col);
                if raw.is_empty() {
                    "Y".to_string()
                } else {
                    raw
                }
            },
        });
    }

    Ok((parsed, skipped))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            // Vendor ids come through as floats when the sheet stores them
            // as numbers; 1200.0 must read back as "1200".
            if f.fract() == 0.0 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

// ── Workbook inbox ──────────────────────────────────────────────────

/// Newest workbook in the inbox by file name, if any. Name order is
/// deterministic and matches the team's dated naming convention.
pub fn find_inbox_workbook(inbox: &Path) -> Result<Option<PathBuf>, ConnectError> {
    if !inbox.is_dir() {
        return Ok(None);
    }

    let entries = std::fs::read_dir(inbox).map_err(|e| ConnectError::Workbook {
        path: inbox.to_path_buf(),
        message: format!("cannot read inbox: {e}"),
    })?;

    let mut workbooks: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"))
        })
        .collect();

    workbooks.sort();
    Ok(workbooks.pop())
}

/// Move a consumed workbook to the `processed/` sibling of its inbox.
/// Called only after the whole cycle has succeeded.
pub fn archive_workbook(workbook: &Path) -> Result<PathBuf, ConnectError> {
    let workbook_err = |message: String| ConnectError::Workbook {
        path: workbook.to_path_buf(),
        message,
    };

    let inbox = workbook
        .parent()
        .ok_or_else(|| workbook_err("workbook has no parent directory".into()))?;
    let processed = inbox.join("processed");
    std::fs::create_dir_all(&processed)
        .map_err(|e| workbook_err(format!("cannot create processed dir: {e}")))?;

    let file_name = workbook
        .file_name()
        .ok_or_else(|| workbook_err("workbook has no file name".into()))?;
    let target = processed.join(file_name);
    std::fs::rename(workbook, &target)
        .map_err(|e| workbook_err(format!("cannot archive: {e}")))?;

    Ok(target)
}
