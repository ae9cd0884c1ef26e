//! Idempotent vendor-master merge store.
//!
//! The whole batch runs inside one transaction: insert-if-new,
//! update-if-changed, no-op-if-identical. Only the business fields
//! (vendor_status, status_changed, winner_source, details) participate in
//! comparison and in the returned diffs; changed_by/changed_at are
//! bookkeeping, written only when something real changed. Rows absent from
//! a batch are left untouched; there is no delete path.

use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use vmaster_recon::{FieldDiff, MergeRow, MergeSink};

use crate::error::ConnectError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS vendor_master (
    rollup_name TEXT PRIMARY KEY,
    vendor_status TEXT NOT NULL,
    status_changed TEXT,
    winner_source TEXT NOT NULL,
    details TEXT NOT NULL,
    changed_by TEXT NOT NULL,
    changed_at TEXT NOT NULL
);
";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct MergeStore {
    conn: Connection,
}

impl MergeStore {
    pub fn open(path: &Path) -> Result<Self, ConnectError> {
        let conn = Connection::open(path).map_err(|e| ConnectError::db("master db open", e))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| ConnectError::db("master schema", e))?;
        Ok(Self { conn })
    }

    /// Current persisted state for one vendor, mostly for tests and spot
    /// checks.
    pub fn get(&self, rollup_name: &str) -> Result<Option<StoredVendor>, ConnectError> {
        self.conn
            .query_row(
                "SELECT vendor_status, status_changed, winner_source, details,
                        changed_by, changed_at
                 FROM vendor_master WHERE rollup_name = ?1",
                [rollup_name],
                |row| {
                    Ok(StoredVendor {
                        rollup_name: rollup_name.to_string(),
                        vendor_status: row.get(0)?,
                        status_changed: row.get(1)?,
                        winner_source: row.get(2)?,
                        details: row.get(3)?,
                        changed_by: row.get(4)?,
                        changed_at: row.get(5)?,
                    })
                },
            )
            .optional()
            .map_err(|e| ConnectError::db("master read", e))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredVendor {
    pub rollup_name: String,
    pub vendor_status: String,
    pub status_changed: Option<String>,
    pub winner_source: String,
    pub details: String,
    pub changed_by: String,
    pub changed_at: String,
}

fn format_ts(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn push_diff(diffs: &mut Vec<FieldDiff>, rollup: &str, field: &str, old: &str, new: &str) {
    diffs.push(FieldDiff {
        rollup_name: rollup.to_string(),
        field: field.to_string(),
        old_value: old.to_string(),
        new_value: new.to_string(),
    });
}

impl MergeSink for MergeStore {
    type Error = ConnectError;

    fn merge(&mut self, rows: &[MergeRow]) -> Result<Vec<FieldDiff>, ConnectError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| ConnectError::db("master merge", e))?;

        let mut diffs: Vec<FieldDiff> = Vec::new();

        for row in rows {
            let status_changed = row.status_changed.map(format_ts);
            let changed_at = format_ts(row.changed_at);

            let existing = tx
                .query_row(
                    "SELECT vendor_status, status_changed, winner_source, details
                     FROM vendor_master WHERE rollup_name = ?1",
                    [&row.rollup_name],
                    |r| {
                        Ok((
                            r.get::<_, String>(0)?,
                            r.get::<_, Option<String>>(1)?,
                            r.get::<_, String>(2)?,
                            r.get::<_, String>(3)?,
                        ))
                    },
                )
                .optional()
                .map_err(|e| ConnectError::db("master merge", e))?;

            match existing {
                None => {
                    tx.execute(
                        "INSERT INTO vendor_master
                         (rollup_name, vendor_status, status_changed, winner_source,
                          details, changed_by, changed_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        params![
                            row.rollup_name,
                            row.vendor_status,
                            status_changed,
                            row.winner_source,
                            row.details,
                            row.changed_by,
                            changed_at,
                        ],
                    )
                    .map_err(|e| ConnectError::db("master insert", e))?;

                    push_diff(&mut diffs, &row.rollup_name, "vendor_status", "", &row.vendor_status);
                    push_diff(
                        &mut diffs,
                        &row.rollup_name,
                        "status_changed",
                        "",
                        status_changed.as_deref().unwrap_or(""),
                    );
                    push_diff(&mut diffs, &row.rollup_name, "winner_source", "", &row.winner_source);
                    push_diff(&mut diffs, &row.rollup_name, "details", "", &row.details);
                }
                Some((old_status, old_changed, old_source, old_details)) => {
                    let mut row_diffs: Vec<FieldDiff> = Vec::new();

                    if old_status != row.vendor_status {
                        push_diff(
                            &mut row_diffs,
                            &row.rollup_name,
                            "vendor_status",
                            &old_status,
                            &row.vendor_status,
                        );
                    }
                    if old_changed != status_changed {
                        push_diff(
                            &mut row_diffs,
                            &row.rollup_name,
                            "status_changed",
                            old_changed.as_deref().unwrap_or(""),
                            status_changed.as_deref().unwrap_or(""),
                        );
                    }
                    if old_source != row.winner_source {
                        push_diff(
                            &mut row_diffs,
                            &row.rollup_name,
                            "winner_source",
                            &old_source,
                            &row.winner_source,
                        );
                    }
                    if old_details != row.details {
                        push_diff(
                            &mut row_diffs,
                            &row.rollup_name,
                            "details",
                            &old_details,
                            &row.details,
                        );
                    }

                    // Identical row: leave it alone, bookkeeping included.
                    if row_diffs.is_empty() {
                        continue;
                    }

                    tx.execute(
                        "UPDATE vendor_master
                         SET vendor_status = ?2, status_changed = ?3, winner_source = ?4,
                             details = ?5, changed_by = ?6, changed_at = ?7
                         WHERE rollup_name = ?1",
                        params![
                            row.rollup_name,
                            row.vendor_status,
                            status_changed,
                            row.winner_source,
                            row.details,
                            row.changed_by,
                            changed_at,
                        ],
                    )
                    .map_err(|e| ConnectError::db("master update", e))?;

                    diffs.extend(row_diffs);
                }
            }
        }

        tx.commit().map_err(|e| ConnectError::db("master merge", e))?;
        Ok(diffs)
    }
}
