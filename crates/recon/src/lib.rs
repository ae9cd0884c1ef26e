//! `vmaster-recon` — vendor-master reconciliation core.
//!
//! Pure engine crate: receives pre-loaded source records, returns reconciled
//! entities and the merge batch. No CLI or IO dependencies.

pub mod aggregate;
pub mod engine;
pub mod mapping;
pub mod model;
pub mod resolve;
pub mod sync;
pub mod winner;

pub use engine::{reconcile, ReconcileOutput};
pub use mapping::MappingIndex;
pub use model::{
    ErpSupplier, FieldDiff, GrcSupplier, LegacySupplier, MappingRow, MergeRow, ReconcileStats,
    SourceRecord, SourceSystem, SyncOutcome, VendorMasterEntity, WinnerInfo,
};
pub use sync::{build_merge_rows, detail_payload, sync_batch, MergeSink};
