use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::model::{MappingRow, RollupMapping};

/// Trim + case-fold a vendor display name for index lookup.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub rows: usize,
    pub dropped_blank_rollup: usize,
    /// Normalized names claimed by more than one rollup. The first rollup in
    /// lexicographic order keeps the name.
    pub name_collisions: usize,
}

/// Rollup index built once per cycle: canonical mappings plus an inverted
/// normalized-name lookup. Read-only after `build`.
#[derive(Debug)]
pub struct MappingIndex {
    rollups: BTreeMap<String, RollupMapping>,
    by_name: HashMap<String, String>,
    stats: IndexStats,
}

impl MappingIndex {
    /// Group staging rows by rollup name. Rows with a blank rollup name are
    /// dropped and counted; they must not invent an empty rollup.
    pub fn build(rows: &[MappingRow]) -> Self {
        let mut rollups: BTreeMap<String, RollupMapping> = BTreeMap::new();
        let mut dropped_blank_rollup = 0;

        for row in rows {
            let rollup = row.rollup_name.trim();
            if rollup.is_empty() {
                dropped_blank_rollup += 1;
                continue;
            }

            let mapping = rollups
                .entry(rollup.to_string())
                .or_insert_with(|| RollupMapping {
                    rollup_name: rollup.to_string(),
                    vendor_ids: Vec::new(),
                    vendor_names: Vec::new(),
                });

            if !row.vendor_id.is_empty() && !mapping.vendor_ids.contains(&row.vendor_id) {
                mapping.vendor_ids.push(row.vendor_id.clone());
            }
            if !row.vendor_name.is_empty() && !mapping.vendor_names.contains(&row.vendor_name) {
                mapping.vendor_names.push(row.vendor_name.clone());
            }
        }

        // Invert the name lists. BTreeMap iteration makes collision handling
        // deterministic: the first rollup keeps a contested name.
        let mut by_name: HashMap<String, String> = HashMap::new();
        let mut name_collisions = 0;
        for (rollup, mapping) in &rollups {
            for name in &mapping.vendor_names {
                let normalized = normalize_name(name);
                if normalized.is_empty() {
                    continue;
                }
                match by_name.entry(normalized) {
                    Entry::Vacant(slot) => {
                        slot.insert(rollup.clone());
                    }
                    Entry::Occupied(existing) => {
                        if existing.get() != rollup {
                            name_collisions += 1;
                        }
                    }
                }
            }
        }

        Self {
            rollups,
            by_name,
            stats: IndexStats {
                rows: rows.len(),
                dropped_blank_rollup,
                name_collisions,
            },
        }
    }

    /// O(1) lookup from a display name to its rollup name.
    /// Exact after normalization; never partial.
    pub fn resolve(&self, display_name: &str) -> Option<&str> {
        self.by_name
            .get(&normalize_name(display_name))
            .map(String::as_str)
    }

    pub fn get(&self, rollup_name: &str) -> Option<&RollupMapping> {
        self.rollups.get(rollup_name)
    }

    pub fn len(&self) -> usize {
        self.rollups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rollups.is_empty()
    }

    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }
}
