use std::collections::BTreeMap;

use crate::model::SourceRecord;

/// Union the three per-source resolution maps into one multi-source bag per
/// rollup. The output key set is exactly the union of the input key sets; per
/// key, ERP records come first, then GRC, then Legacy, each in arrival order.
pub fn aggregate(
    erp: BTreeMap<String, Vec<SourceRecord>>,
    grc: BTreeMap<String, Vec<SourceRecord>>,
    legacy: BTreeMap<String, Vec<SourceRecord>>,
) -> BTreeMap<String, Vec<SourceRecord>> {
    let mut combined: BTreeMap<String, Vec<SourceRecord>> = BTreeMap::new();

    for source_map in [erp, grc, legacy] {
        for (rollup, records) in source_map {
            combined.entry(rollup).or_default().extend(records);
        }
    }

    combined
}
