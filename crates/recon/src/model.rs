use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Source systems
// ---------------------------------------------------------------------------

/// The three systems of record contributing vendor data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSystem {
    Erp,
    Grc,
    Legacy,
}

impl SourceSystem {
    /// Only ERP and GRC carry update timestamps we trust for winner selection.
    /// Legacy rows are audit-only.
    pub fn winner_eligible(self) -> bool {
        matches!(self, Self::Erp | Self::Grc)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Erp => "ERP",
            Self::Grc => "GRC",
            Self::Legacy => "Legacy",
        }
    }
}

impl std::fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Mapping input
// ---------------------------------------------------------------------------

/// One row of the vendor mapping staging table.
#[derive(Debug, Clone)]
pub struct MappingRow {
    pub vendor_id: String,
    pub vendor_name: String,
    pub rollup_name: String,
    pub source_system: String,
    pub group_id: String,
    pub group_description: String,
    pub active_yn: String,
}

/// Canonical vendor identity: the rollup name plus every vendor id and
/// display name known to belong to it.
#[derive(Debug, Clone, Serialize)]
pub struct RollupMapping {
    pub rollup_name: String,
    pub vendor_ids: Vec<String>,
    pub vendor_names: Vec<String>,
}

// ---------------------------------------------------------------------------
// Source records
// ---------------------------------------------------------------------------

/// Supplier row from the ERP mirror. Update date and time-of-day arrive as
/// separate columns; the time is a raw "HH:MM:SS" string that may be blank
/// or garbage.
#[derive(Debug, Clone, Serialize)]
pub struct ErpSupplier {
    pub supplier_code: String,
    pub supplier_name: String,
    pub group_id: String,
    pub group_description: String,
    pub active: Option<bool>,
    pub update_date: Option<NaiveDate>,
    pub update_time: Option<String>,
}

/// Supplier record from the GRC platform. Carries the rollup name directly,
/// so it skips name resolution.
#[derive(Debug, Clone, Serialize)]
pub struct GrcSupplier {
    pub record_id: String,
    pub rollup_name: String,
    pub supplier_name: String,
    pub group_id: String,
    pub group_description: String,
    pub active: bool,
    pub updated: Option<NaiveDateTime>,
}

/// Supplier row surviving from the retired purchasing system. No timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct LegacySupplier {
    pub supplier_id: String,
    pub supplier_name: String,
    pub group_id: String,
    pub group_description: String,
    pub active: bool,
}

/// A record from any source system, tagged with where it came from.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SourceRecord {
    Erp(ErpSupplier),
    Grc(GrcSupplier),
    Legacy(LegacySupplier),
}

impl SourceRecord {
    pub fn source(&self) -> SourceSystem {
        match self {
            Self::Erp(_) => SourceSystem::Erp,
            Self::Grc(_) => SourceSystem::Grc,
            Self::Legacy(_) => SourceSystem::Legacy,
        }
    }

    pub fn source_id(&self) -> &str {
        match self {
            Self::Erp(r) => &r.supplier_code,
            Self::Grc(r) => &r.record_id,
            Self::Legacy(r) => &r.supplier_id,
        }
    }

    pub fn supplier_name(&self) -> &str {
        match self {
            Self::Erp(r) => &r.supplier_name,
            Self::Grc(r) => &r.supplier_name,
            Self::Legacy(r) => &r.supplier_name,
        }
    }

    pub fn group_id(&self) -> &str {
        match self {
            Self::Erp(r) => &r.group_id,
            Self::Grc(r) => &r.group_id,
            Self::Legacy(r) => &r.group_id,
        }
    }

    pub fn group_description(&self) -> &str {
        match self {
            Self::Erp(r) => &r.group_description,
            Self::Grc(r) => &r.group_description,
            Self::Legacy(r) => &r.group_description,
        }
    }

    /// Active flag folded to a plain bool. An ERP row with no status at all
    /// counts as inactive.
    pub fn active_flag(&self) -> bool {
        match self {
            Self::Erp(r) => r.active.unwrap_or(false),
            Self::Grc(r) => r.active,
            Self::Legacy(r) => r.active,
        }
    }
}

// ---------------------------------------------------------------------------
// Winner
// ---------------------------------------------------------------------------

/// Authoritative current state of one vendor, or the explicit absence of one.
/// An entity whose records carry no usable timestamp gets `Unknown`, never a
/// default-minimum timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WinnerInfo {
    Known {
        source: SourceSystem,
        active: bool,
        updated: NaiveDateTime,
    },
    Unknown,
}

impl WinnerInfo {
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known { .. })
    }

    pub fn updated(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Known { updated, .. } => Some(*updated),
            Self::Unknown => None,
        }
    }

    /// Source label as persisted downstream; the sentinel string exists only
    /// at this boundary.
    pub fn source_label(&self) -> &'static str {
        match self {
            Self::Known { source, .. } => source.label(),
            Self::Unknown => "Unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciled entity
// ---------------------------------------------------------------------------

/// One reconciled vendor: the full audit list of contributing records plus
/// the selected winner. The audit list keeps every record regardless of
/// which one won.
#[derive(Debug, Clone, Serialize)]
pub struct VendorMasterEntity {
    pub rollup_name: String,
    pub records: Vec<SourceRecord>,
    pub winner: WinnerInfo,
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

/// One row of the batch submitted to the idempotent merge collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeRow {
    pub rollup_name: String,
    pub vendor_status: String,
    pub status_changed: Option<NaiveDateTime>,
    pub winner_source: String,
    pub details: String,
    pub changed_by: String,
    pub changed_at: NaiveDateTime,
}

/// Field-level change reported back by the merge collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDiff {
    pub rollup_name: String,
    pub field: String,
    pub old_value: String,
    pub new_value: String,
}

/// Interpreted merge result. `changed` gates downstream publication.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub changed: bool,
    pub diffs: Vec<FieldDiff>,
}

impl SyncOutcome {
    pub fn from_diffs(diffs: Vec<FieldDiff>) -> Self {
        Self {
            changed: !diffs.is_empty(),
            diffs,
        }
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Per-cycle accounting for the log. Dropped records are visible here, not
/// silently discarded.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileStats {
    pub erp_records: usize,
    pub grc_records: usize,
    pub legacy_records: usize,
    pub erp_unmatched: usize,
    pub legacy_unmatched: usize,
    pub grc_unkeyed: usize,
    pub unmatched_samples: Vec<String>,
    pub entities: usize,
    pub entities_with_winner: usize,
}
