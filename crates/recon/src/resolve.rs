use std::collections::BTreeMap;

use crate::mapping::MappingIndex;
use crate::model::{GrcSupplier, SourceRecord};

/// How many unmatched names to keep verbatim for the log.
const UNMATCHED_SAMPLE_CAP: usize = 5;

/// Records resolved to rollup keys for one source system, plus what fell out.
#[derive(Debug, Default)]
pub struct Resolution {
    pub by_rollup: BTreeMap<String, Vec<SourceRecord>>,
    pub dropped: usize,
    pub dropped_samples: Vec<String>,
}

impl Resolution {
    fn drop_record(&mut self, name: &str) {
        if self.dropped_samples.len() < UNMATCHED_SAMPLE_CAP {
            self.dropped_samples.push(name.to_string());
        }
        self.dropped += 1;
    }
}

/// Resolve name-keyed records against the index. Matching is exact and
/// case-insensitive; a record whose name resolves nowhere is dropped and
/// counted; it never lands under a synthetic rollup.
pub fn resolve_by_name(index: &MappingIndex, records: Vec<SourceRecord>) -> Resolution {
    let mut resolution = Resolution::default();

    for record in records {
        match index.resolve(record.supplier_name()) {
            Some(rollup) => resolution
                .by_rollup
                .entry(rollup.to_string())
                .or_default()
                .push(record),
            None => resolution.drop_record(record.supplier_name()),
        }
    }

    resolution
}

/// Key GRC records by their embedded rollup name; no resolution step.
/// Records with a blank rollup name are dropped and counted.
pub fn key_by_embedded_rollup(records: Vec<GrcSupplier>) -> Resolution {
    let mut resolution = Resolution::default();

    for record in records {
        let rollup = record.rollup_name.trim();
        if rollup.is_empty() {
            resolution.drop_record(&record.supplier_name);
            continue;
        }
        resolution
            .by_rollup
            .entry(rollup.to_string())
            .or_default()
            .push(SourceRecord::Grc(record));
    }

    resolution
}
