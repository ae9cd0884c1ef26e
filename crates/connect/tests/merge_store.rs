// Idempotent merge contract: insert-if-new, update-if-changed,
// no-op-if-identical, diffs on business fields only.
// Run with: cargo test -p vmaster-connect --test merge_store

use chrono::NaiveDateTime;

use vmaster_connect::MergeStore;
use vmaster_recon::{sync_batch, MergeRow, MergeSink};

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn row(rollup: &str, status: &str, changed_at: &str) -> MergeRow {
    MergeRow {
        rollup_name: rollup.into(),
        vendor_status: status.into(),
        status_changed: Some(ts("2023-01-01 08:30:00")),
        winner_source: "ERP".into(),
        details: r#"[{"source":"ERP"}]"#.into(),
        changed_by: "test-cycle".into(),
        changed_at: ts(changed_at),
    }
}

fn store_in(dir: &tempfile::TempDir) -> MergeStore {
    MergeStore::open(&dir.path().join("master.db")).unwrap()
}

#[test]
fn insert_reports_every_business_field() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);

    let diffs = store.merge(&[row("ACME CORP", "Active", "2024-01-01 00:00:00")]).unwrap();

    let fields: Vec<&str> = diffs.iter().map(|d| d.field.as_str()).collect();
    assert_eq!(
        fields,
        vec!["vendor_status", "status_changed", "winner_source", "details"]
    );
    assert!(diffs.iter().all(|d| d.old_value.is_empty()));
    assert!(diffs.iter().all(|d| d.rollup_name == "ACME CORP"));

    let stored = store.get("ACME CORP").unwrap().unwrap();
    assert_eq!(stored.vendor_status, "Active");
    assert_eq!(stored.changed_by, "test-cycle");
}

#[test]
fn identical_batch_is_a_no_op_even_with_fresh_bookkeeping() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);

    store.merge(&[row("ACME CORP", "Active", "2024-01-01 00:00:00")]).unwrap();
    let before = store.get("ACME CORP").unwrap().unwrap();

    // Same business fields, later cycle timestamp and actor.
    let mut second = row("ACME CORP", "Active", "2024-02-01 00:00:00");
    second.changed_by = "other-actor".into();

    let outcome = sync_batch(&mut store, &[second]).unwrap();
    assert!(!outcome.changed);
    assert!(outcome.diffs.is_empty());

    // Bookkeeping untouched: the row was not rewritten.
    let after = store.get("ACME CORP").unwrap().unwrap();
    assert_eq!(after, before);
}

#[test]
fn changed_field_is_reported_and_bookkeeping_refreshed() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);

    store.merge(&[row("ACME CORP", "Active", "2024-01-01 00:00:00")]).unwrap();

    let mut update = row("ACME CORP", "Inactive", "2024-02-01 00:00:00");
    update.changed_by = "second-cycle".into();

    let outcome = sync_batch(&mut store, &[update]).unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.diffs.len(), 1);
    assert_eq!(outcome.diffs[0].field, "vendor_status");
    assert_eq!(outcome.diffs[0].old_value, "Active");
    assert_eq!(outcome.diffs[0].new_value, "Inactive");

    let stored = store.get("ACME CORP").unwrap().unwrap();
    assert_eq!(stored.vendor_status, "Inactive");
    assert_eq!(stored.changed_by, "second-cycle");
    assert_eq!(stored.changed_at, "2024-02-01 00:00:00");
}

#[test]
fn vendors_absent_from_a_batch_are_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);

    store
        .merge(&[
            row("ACME CORP", "Active", "2024-01-01 00:00:00"),
            row("WIDGET CO", "Active", "2024-01-01 00:00:00"),
        ])
        .unwrap();

    // Next batch only mentions ACME.
    let outcome = sync_batch(&mut store, &[row("ACME CORP", "Active", "2024-02-01 00:00:00")]).unwrap();
    assert!(!outcome.changed);

    assert!(store.get("WIDGET CO").unwrap().is_some());
}

#[test]
fn null_status_changed_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_in(&dir);

    let mut sentinel = row("GHOST VENDOR", "Inactive", "2024-01-01 00:00:00");
    sentinel.status_changed = None;
    sentinel.winner_source = "Unknown".into();

    store.merge(&[sentinel.clone()]).unwrap();
    let stored = store.get("GHOST VENDOR").unwrap().unwrap();
    assert_eq!(stored.status_changed, None);
    assert_eq!(stored.winner_source, "Unknown");

    // Identical sentinel again: still a no-op.
    sentinel.changed_at = ts("2024-02-01 00:00:00");
    let outcome = sync_batch(&mut store, &[sentinel]).unwrap();
    assert!(!outcome.changed);
}
