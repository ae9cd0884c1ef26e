//! Columnar export of the reconciled batch.
//!
//! # Column contract
//!
//! Downstream warehouse jobs read this file by position; the column order is
//! fixed by struct field order and serialized by `serde`. Rows arrive in
//! rollup-name order, so two exports of the same batch are byte-identical.
//!
//! | #  | Column           | Notes                                      |
//! |----|------------------|--------------------------------------------|
//! | 1  | `rollup_name`    | Canonical vendor key                       |
//! | 2  | `vendor_status`  | "Active" / "Inactive"                      |
//! | 3  | `status_changed` | "YYYY-MM-DD HH:MM:SS", empty when unknown  |
//! | 4  | `winner_source`  | "ERP", "GRC" or "Unknown"                  |
//! | 5  | `record_count`   | Audit-list length                          |
//! | 6  | `changed_by`     | Actor that ran the cycle                   |
//! | 7  | `changed_at`     | Cycle timestamp                            |
//! | 8  | `details`        | JSON audit payload (CSV-quoted)            |

use std::path::{Path, PathBuf};

use serde::Serialize;

use vmaster_recon::{MergeRow, VendorMasterEntity};

pub const EXPORT_FILE_NAME: &str = "vendor_master.csv";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    rollup_name: &'a str,
    vendor_status: &'a str,
    status_changed: String,
    winner_source: &'a str,
    record_count: usize,
    changed_by: &'a str,
    changed_at: String,
    details: &'a str,
}

/// Write the batch to `<dir>/vendor_master.csv`, creating the directory if
/// needed. `entities` and `rows` are parallel (same batch, same order).
pub fn write_batch(
    dir: &Path,
    entities: &[VendorMasterEntity],
    rows: &[MergeRow],
) -> Result<PathBuf, String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("cannot create export dir {}: {e}", dir.display()))?;
    let path = dir.join(EXPORT_FILE_NAME);

    let mut writer = csv::Writer::from_path(&path)
        .map_err(|e| format!("cannot open {}: {e}", path.display()))?;

    for (entity, row) in entities.iter().zip(rows) {
        let export_row = ExportRow {
            rollup_name: &row.rollup_name,
            vendor_status: &row.vendor_status,
            status_changed: row
                .status_changed
                .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_default(),
            winner_source: &row.winner_source,
            record_count: entity.records.len(),
            changed_by: &row.changed_by,
            changed_at: row.changed_at.format(TIMESTAMP_FORMAT).to_string(),
            details: &row.details,
        };
        writer
            .serialize(export_row)
            .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
    }

    writer
        .flush()
        .map_err(|e| format!("cannot flush {}: {e}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use vmaster_recon::{build_merge_rows, LegacySupplier, SourceRecord, WinnerInfo};

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn batch() -> (Vec<VendorMasterEntity>, Vec<MergeRow>) {
        let entities = vec![VendorMasterEntity {
            rollup_name: "WIDGET CO".into(),
            records: vec![SourceRecord::Legacy(LegacySupplier {
                supplier_id: "l1".into(),
                supplier_name: "Widget Co".into(),
                group_id: "200".into(),
                group_description: "Paper".into(),
                active: true,
            })],
            winner: WinnerInfo::Unknown,
        }];
        let rows = build_merge_rows(&entities, "test-cycle", ts("2024-01-01 00:00:00"));
        (entities, rows)
    }

    #[test]
    fn export_has_header_and_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let (entities, rows) = batch();

        let path = write_batch(dir.path(), &entities, &rows).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        assert!(first.starts_with(
            "rollup_name,vendor_status,status_changed,winner_source,record_count,changed_by,changed_at,details"
        ));
        assert!(first.contains("WIDGET CO,Inactive,,Unknown,1,test-cycle,2024-01-01 00:00:00,"));

        let path = write_batch(dir.path(), &entities, &rows).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn details_json_survives_csv_quoting() {
        let dir = tempfile::tempdir().unwrap();
        let (entities, rows) = batch();

        let path = write_batch(dir.path(), &entities, &rows).unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let record = reader.records().next().unwrap().unwrap();
        let details = record.get(7).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(details).unwrap();
        assert_eq!(parsed[0]["source"], "Legacy");
        assert_eq!(parsed[0]["source_id"], "l1");
    }
}
