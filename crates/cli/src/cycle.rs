//! One reconciliation cycle, phase by phase.
//!
//! `Idle → MappingLoaded → SourcesLoaded → Reconciled → Synced →
//! {Published | Skipped} → Done`, with any step transitioning to `Failed`.
//! The cancel flag is honored between phases, never mid-phase. Source
//! fetches run on scoped threads; reconciliation itself is synchronous and
//! CPU-bound. No phase leaves partial side effects behind beyond what the
//! merge store itself committed.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use serde::Serialize;

use vmaster_config::{ConfigError, Settings};
use vmaster_connect::{
    archive_workbook, find_inbox_workbook, refresh_staging, ArtifactUploader, ConnectError,
    ErpDb, GrcApiClient, MappingDb, MergeStore, UploadOutcome, UploadPolicy,
};
use vmaster_recon::{build_merge_rows, reconcile, sync_batch, MappingIndex, ReconcileStats};

use crate::export;

// ── Phases ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Idle,
    MappingLoaded,
    SourcesLoaded,
    Reconciled,
    Synced,
    Published,
    Skipped,
    Done,
    Failed,
}

impl std::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::MappingLoaded => "mapping_loaded",
            Self::SourcesLoaded => "sources_loaded",
            Self::Reconciled => "reconciled",
            Self::Synced => "synced",
            Self::Published => "published",
            Self::Skipped => "skipped",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ── Failures ────────────────────────────────────────────────────────

/// What sank the cycle, tagged by collaborator so the CLI can map it to a
/// specific exit code.
#[derive(Debug)]
pub enum CycleFailure {
    Config(ConfigError),
    Staging(ConnectError),
    Erp(ConnectError),
    Grc(ConnectError),
    Merge(ConnectError),
    Export(String),
    Cancelled,
}

#[derive(Debug)]
pub struct CycleError {
    /// Last phase that completed before the failure.
    pub phase: CyclePhase,
    pub failure: CycleFailure,
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.failure {
            CycleFailure::Config(e) => write!(f, "{e}"),
            CycleFailure::Staging(e) => write!(f, "staging: {e}"),
            CycleFailure::Erp(e) => write!(f, "ERP source: {e}"),
            CycleFailure::Grc(e) => write!(f, "GRC source: {e}"),
            CycleFailure::Merge(e) => write!(f, "merge: {e}"),
            CycleFailure::Export(msg) => write!(f, "export (merge already committed): {msg}"),
            CycleFailure::Cancelled => write!(f, "cancelled after phase '{}'", self.phase),
        }
    }
}

// ── Report ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UploadSummary {
    pub attempts: u32,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a completed cycle has to say for itself. Serialized to stdout
/// under `--json`.
#[derive(Debug, Serialize)]
pub struct CycleReport {
    pub phase: CyclePhase,
    pub changed: bool,
    pub mapping_rows: usize,
    pub rollups: usize,
    pub stats: ReconcileStats,
    pub merge_rows: usize,
    pub diff_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workbook_consumed: Option<PathBuf>,
}

impl CycleReport {
    /// Upload failure message, if the terminal upload step exhausted its
    /// retry budget. The merge is committed either way.
    pub fn upload_failure(&self) -> Option<&str> {
        self.upload
            .as_ref()
            .and_then(|u| u.error.as_deref())
    }
}

// ── Runner ──────────────────────────────────────────────────────────

fn checkpoint(cancel: &AtomicBool, phase: CyclePhase) -> Result<(), CycleError> {
    if cancel.load(Ordering::Relaxed) {
        Err(CycleError {
            phase,
            failure: CycleFailure::Cancelled,
        })
    } else {
        Ok(())
    }
}

fn fail(phase: CyclePhase, failure: CycleFailure) -> CycleError {
    CycleError { phase, failure }
}

/// Run one full cycle against the configured collaborators.
pub fn run_cycle(
    settings: &Settings,
    cancel: &AtomicBool,
    quiet: bool,
) -> Result<CycleReport, CycleError> {
    let mut phase = CyclePhase::Idle;
    let progress = |msg: &str| {
        if !quiet {
            eprintln!("{msg}");
        }
    };

    // Configuration resolves completely before any side effect. The storage
    // token is resolved here even though the upload may be skipped later:
    // failing after the merge would be far worse than failing now.
    settings
        .validate()
        .map_err(|e| fail(phase, CycleFailure::Config(e)))?;
    let grc_token = settings
        .grc_token()
        .map_err(|e| fail(phase, CycleFailure::Config(e)))?;
    let storage_token = settings
        .storage_token()
        .map_err(|e| fail(phase, CycleFailure::Config(e)))?;

    let cycle_started = chrono::Utc::now().naive_utc();

    // ── Staging refresh ────────────────────────────────────────────
    let mut staging = MappingDb::open(&settings.databases.staging)
        .map_err(|e| fail(phase, CycleFailure::Staging(e)))?;

    let mut workbook_consumed = None;
    if let Some(inbox) = &settings.mapping.inbox_dir {
        let found = find_inbox_workbook(inbox).map_err(|e| fail(phase, CycleFailure::Staging(e)))?;
        if let Some(workbook) = found {
            progress(&format!("refreshing staging from {} …", workbook.display()));
            let load = refresh_staging(&mut staging, &workbook, &settings.mapping.sheet)
                .map_err(|e| fail(phase, CycleFailure::Staging(e)))?;
            progress(&format!(
                "staging refreshed: {} rows ({} skipped)",
                load.rows_loaded, load.rows_skipped,
            ));
            workbook_consumed = Some(workbook);
        } else {
            progress("no workbook in inbox, using existing staging rows");
        }
    }

    // ── MappingLoaded ──────────────────────────────────────────────
    let mapping_rows = staging
        .load_rows()
        .map_err(|e| fail(phase, CycleFailure::Staging(e)))?;
    let index = MappingIndex::build(&mapping_rows);
    progress(&format!(
        "loaded {} rollup mappings from {} rows ({} blank-rollup dropped, {} name collisions)",
        index.len(),
        index.stats().rows,
        index.stats().dropped_blank_rollup,
        index.stats().name_collisions,
    ));
    phase = CyclePhase::MappingLoaded;
    checkpoint(cancel, phase)?;

    // ── SourcesLoaded ──────────────────────────────────────────────
    // ERP and GRC fetch concurrently; the Legacy read shares the staging
    // connection and runs on this thread. Any source failure is fatal for
    // the whole cycle — "source down" must never read as "source empty".
    progress("fetching ERP, GRC and Legacy records …");
    let grc_client = GrcApiClient::new(
        settings.grc.base_url.clone(),
        grc_token,
        settings.grc.workflow_id.clone(),
        settings.grc.step_id.clone(),
    );
    let erp_path = settings.databases.erp.clone();

    let (erp_result, grc_result, legacy_result) = thread::scope(|scope| {
        let erp_handle = scope.spawn(|| ErpDb::open(&erp_path)?.load_suppliers());
        let grc_handle = scope.spawn(|| grc_client.fetch_suppliers(quiet));
        let legacy_result = staging.load_legacy_suppliers();

        let erp_result = match erp_handle.join() {
            Ok(result) => result,
            Err(payload) => std::panic::resume_unwind(payload),
        };
        let grc_result = match grc_handle.join() {
            Ok(result) => result,
            Err(payload) => std::panic::resume_unwind(payload),
        };
        (erp_result, grc_result, legacy_result)
    });

    let erp_load = erp_result.map_err(|e| fail(phase, CycleFailure::Erp(e)))?;
    let grc_fetch = grc_result.map_err(|e| fail(phase, CycleFailure::Grc(e)))?;
    let legacy_records = legacy_result.map_err(|e| fail(phase, CycleFailure::Staging(e)))?;

    progress(&format!(
        "fetched {} ERP ({} bad dates), {} GRC ({} skipped), {} Legacy records",
        erp_load.suppliers.len(),
        erp_load.bad_dates,
        grc_fetch.records.len(),
        grc_fetch.skipped,
        legacy_records.len(),
    ));
    phase = CyclePhase::SourcesLoaded;
    checkpoint(cancel, phase)?;

    // ── Reconciled ─────────────────────────────────────────────────
    let output = reconcile(&index, erp_load.suppliers, grc_fetch.records, legacy_records);
    progress(&format!(
        "reconciled {} entities ({} with winner); unmatched: {} ERP, {} Legacy, {} GRC unkeyed",
        output.stats.entities,
        output.stats.entities_with_winner,
        output.stats.erp_unmatched,
        output.stats.legacy_unmatched,
        output.stats.grc_unkeyed,
    ));
    if !output.stats.unmatched_samples.is_empty() {
        progress(&format!(
            "unmatched names (sample): {}",
            output.stats.unmatched_samples.join(", "),
        ));
    }
    phase = CyclePhase::Reconciled;
    checkpoint(cancel, phase)?;

    // ── Synced ─────────────────────────────────────────────────────
    let merge_rows = build_merge_rows(&output.entities, &settings.changed_by, cycle_started);
    let mut store = MergeStore::open(&settings.databases.master)
        .map_err(|e| fail(phase, CycleFailure::Merge(e)))?;
    let outcome =
        sync_batch(&mut store, &merge_rows).map_err(|e| fail(phase, CycleFailure::Merge(e)))?;

    if outcome.changed {
        progress(&format!("merge reported {} field diffs", outcome.diffs.len()));
        if !quiet {
            for diff in outcome.diffs.iter().take(10) {
                eprintln!(
                    "  {}: {} '{}' -> '{}'",
                    diff.rollup_name,
                    diff.field,
                    truncate(&diff.old_value, 40),
                    truncate(&diff.new_value, 40),
                );
            }
            if outcome.diffs.len() > 10 {
                eprintln!("  … and {} more", outcome.diffs.len() - 10);
            }
        }
    } else {
        progress("merge reported no changes");
    }
    phase = CyclePhase::Synced;
    checkpoint(cancel, phase)?;

    // ── Published / Skipped ────────────────────────────────────────
    let mut export_path = None;
    let mut upload = None;

    if outcome.changed {
        progress("changes detected — exporting batch …");
        let path = export::write_batch(&settings.export.dir, &output.entities, &merge_rows)
            .map_err(|e| fail(phase, CycleFailure::Export(e)))?;
        progress(&format!("wrote {}", path.display()));

        let uploader = ArtifactUploader::new(
            settings.storage.endpoint.clone(),
            settings.storage.container.clone(),
            storage_token,
        );
        let policy = UploadPolicy {
            attempts: settings.upload.attempts,
            delay: std::time::Duration::from_secs(settings.upload.delay_secs),
        };
        let report = uploader.upload(&path, &policy, cancel, quiet);
        let (outcome_label, error) = match &report.outcome {
            UploadOutcome::Uploaded => {
                progress(&format!("uploaded after {} attempt(s)", report.attempts));
                ("uploaded", None)
            }
            UploadOutcome::Cancelled => ("cancelled", Some("upload cancelled".to_string())),
            UploadOutcome::Failed { message } => ("failed", Some(message.clone())),
        };
        upload = Some(UploadSummary {
            attempts: report.attempts,
            outcome: outcome_label.to_string(),
            error,
        });
        export_path = Some(path);
        phase = CyclePhase::Published;
    } else {
        progress("no changes — skipping export and upload");
        phase = CyclePhase::Skipped;
    }
    checkpoint(cancel, phase)?;

    // ── Done ───────────────────────────────────────────────────────
    // The workbook is consumed only once the cycle made it all the way
    // through. A failed archive is worth a warning, not a failed cycle —
    // the merge is committed and the next run will simply reload the same
    // workbook into an identical staging table.
    if let Some(workbook) = &workbook_consumed {
        match archive_workbook(workbook) {
            Ok(target) => progress(&format!("workbook archived to {}", target.display())),
            Err(e) => eprintln!("warning: could not archive workbook: {e}"),
        }
    }

    phase = CyclePhase::Done;
    Ok(CycleReport {
        phase,
        changed: outcome.changed,
        mapping_rows: mapping_rows.len(),
        rollups: index.len(),
        stats: output.stats,
        merge_rows: merge_rows.len(),
        diff_count: outcome.diffs.len(),
        export_path,
        upload,
        workbook_consumed,
    })
}

fn truncate(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
