use crate::aggregate::aggregate;
use crate::mapping::MappingIndex;
use crate::model::{ErpSupplier, GrcSupplier, LegacySupplier, ReconcileStats, SourceRecord, VendorMasterEntity};
use crate::resolve::{key_by_embedded_rollup, resolve_by_name};
use crate::winner::select_winner;

/// Reconciled batch plus the per-cycle accounting.
#[derive(Debug)]
pub struct ReconcileOutput {
    /// Entities in rollup-name order. Every entity has at least one record.
    pub entities: Vec<VendorMasterEntity>,
    pub stats: ReconcileStats,
}

/// Run the in-memory pipeline: resolve ERP and Legacy records against the
/// index, key GRC records by their embedded rollup, union everything per
/// rollup, then select a winner per entity. Pure and synchronous; the
/// caller owns all I/O.
pub fn reconcile(
    index: &MappingIndex,
    erp_records: Vec<ErpSupplier>,
    grc_records: Vec<GrcSupplier>,
    legacy_records: Vec<LegacySupplier>,
) -> ReconcileOutput {
    let mut stats = ReconcileStats {
        erp_records: erp_records.len(),
        grc_records: grc_records.len(),
        legacy_records: legacy_records.len(),
        ..ReconcileStats::default()
    };

    let erp = resolve_by_name(
        index,
        erp_records.into_iter().map(SourceRecord::Erp).collect(),
    );
    let legacy = resolve_by_name(
        index,
        legacy_records.into_iter().map(SourceRecord::Legacy).collect(),
    );
    let grc = key_by_embedded_rollup(grc_records);

    stats.erp_unmatched = erp.dropped;
    stats.legacy_unmatched = legacy.dropped;
    stats.grc_unkeyed = grc.dropped;
    stats.unmatched_samples = erp
        .dropped_samples
        .iter()
        .chain(legacy.dropped_samples.iter())
        .cloned()
        .collect();

    let combined = aggregate(erp.by_rollup, grc.by_rollup, legacy.by_rollup);

    let entities: Vec<VendorMasterEntity> = combined
        .into_iter()
        .map(|(rollup_name, records)| {
            let winner = select_winner(&records);
            VendorMasterEntity {
                rollup_name,
                records,
                winner,
            }
        })
        .collect();

    stats.entities = entities.len();
    stats.entities_with_winner = entities.iter().filter(|e| e.winner.is_known()).count();

    ReconcileOutput { entities, stats }
}
