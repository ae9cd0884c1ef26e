//! Merge-row building and sync-outcome interpretation.
//!
//! # Detail payload contract
//!
//! Each entity's audit list is serialized as a JSON array of flat rows in
//! audit order. Field order is fixed by struct declaration; two cycles over
//! identical input produce byte-identical payloads, which is what makes the
//! merge's no-op detection (and its tests) possible.
//!
//! | # | Field               | Notes                                    |
//! |---|---------------------|------------------------------------------|
//! | 1 | `source`            | "ERP", "GRC" or "Legacy"                 |
//! | 2 | `source_id`         | Upstream record id                       |
//! | 3 | `supplier_name`     | Display name as received                 |
//! | 4 | `group_id`          | Empty string when absent                 |
//! | 5 | `group_description` | Empty string when absent                 |
//! | 6 | `active`            | Folded to bool                           |
//! | 7 | `update_date`       | "YYYY-MM-DD" or null                     |
//! | 8 | `update_time`       | "HH:MM:SS" or null                       |

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::model::{FieldDiff, MergeRow, SourceRecord, SyncOutcome, VendorMasterEntity, WinnerInfo};

pub const STATUS_ACTIVE: &str = "Active";
pub const STATUS_INACTIVE: &str = "Inactive";

#[derive(Debug, Serialize)]
struct DetailRow<'a> {
    source: &'static str,
    source_id: &'a str,
    supplier_name: &'a str,
    group_id: &'a str,
    group_description: &'a str,
    active: bool,
    update_date: Option<String>,
    update_time: Option<String>,
}

impl<'a> DetailRow<'a> {
    fn from_record(record: &'a SourceRecord) -> Self {
        let (update_date, update_time) = match record {
            SourceRecord::Erp(erp) => (
                erp.update_date.map(|d| d.format("%Y-%m-%d").to_string()),
                erp.update_time.clone(),
            ),
            SourceRecord::Grc(grc) => (
                grc.updated.map(|u| u.format("%Y-%m-%d").to_string()),
                grc.updated.map(|u| u.format("%H:%M:%S").to_string()),
            ),
            SourceRecord::Legacy(_) => (None, None),
        };

        Self {
            source: record.source().label(),
            source_id: record.source_id(),
            supplier_name: record.supplier_name(),
            group_id: record.group_id(),
            group_description: record.group_description(),
            active: record.active_flag(),
            update_date,
            update_time,
        }
    }
}

/// Serialize an audit list into the stable detail payload.
pub fn detail_payload(records: &[SourceRecord]) -> String {
    let rows: Vec<DetailRow> = records.iter().map(DetailRow::from_record).collect();
    serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_string())
}

/// Build the batch submitted to the merge collaborator. `changed_at` is the
/// cycle timestamp, passed in rather than sampled here so the rows stay
/// reproducible under test.
pub fn build_merge_rows(
    entities: &[VendorMasterEntity],
    changed_by: &str,
    changed_at: NaiveDateTime,
) -> Vec<MergeRow> {
    entities
        .iter()
        .map(|entity| {
            let (vendor_status, status_changed) = match &entity.winner {
                WinnerInfo::Known { active, updated, .. } => (
                    if *active { STATUS_ACTIVE } else { STATUS_INACTIVE },
                    Some(*updated),
                ),
                WinnerInfo::Unknown => (STATUS_INACTIVE, None),
            };

            MergeRow {
                rollup_name: entity.rollup_name.clone(),
                vendor_status: vendor_status.to_string(),
                status_changed,
                winner_source: entity.winner.source_label().to_string(),
                details: detail_payload(&entity.records),
                changed_by: changed_by.to_string(),
                changed_at,
            }
        })
        .collect()
}

/// Seam to the persistence collaborator: a set-based idempotent upsert that
/// reports a field-level diff for everything it actually changed, and
/// nothing for rows it left alone.
pub trait MergeSink {
    type Error;

    /// Submit the whole batch as one operation.
    fn merge(&mut self, rows: &[MergeRow]) -> Result<Vec<FieldDiff>, Self::Error>;
}

/// Submit a batch and fold the collaborator's diff rows into the changed
/// flag that gates publication.
pub fn sync_batch<S: MergeSink>(sink: &mut S, rows: &[MergeRow]) -> Result<SyncOutcome, S::Error> {
    let diffs = sink.merge(rows)?;
    Ok(SyncOutcome::from_diffs(diffs))
}
