use chrono::{NaiveDateTime, NaiveTime};

use crate::model::{SourceRecord, SourceSystem, WinnerInfo};

/// Combine a record's update date and time-of-day into one comparable
/// timestamp. No date ⇒ no timestamp, and the record is excluded from winner
/// selection. An absent or unparsable time-of-day falls back to midnight, so
/// a date-only record still competes, it just loses same-day ties against
/// anything with a real clock time.
pub fn combined_timestamp(record: &SourceRecord) -> Option<NaiveDateTime> {
    match record {
        SourceRecord::Erp(erp) => {
            let date = erp.update_date?;
            let time = erp
                .update_time
                .as_deref()
                .and_then(|t| NaiveTime::parse_from_str(t.trim(), "%H:%M:%S").ok())
                .unwrap_or(NaiveTime::MIN);
            Some(date.and_time(time))
        }
        SourceRecord::Grc(grc) => grc.updated,
        SourceRecord::Legacy(_) => None,
    }
}

/// Source-local latest: the record with the greatest combined timestamp.
/// Exact within-source ties keep the earlier-arriving record.
fn latest_for(records: &[SourceRecord], source: SourceSystem) -> Option<(&SourceRecord, NaiveDateTime)> {
    let mut best: Option<(&SourceRecord, NaiveDateTime)> = None;

    for record in records.iter().filter(|r| r.source() == source) {
        let Some(ts) = combined_timestamp(record) else {
            continue;
        };
        match best {
            Some((_, best_ts)) if ts <= best_ts => {}
            _ => best = Some((record, ts)),
        }
    }

    best
}

/// Pick the authoritative record for one entity.
///
/// ERP and GRC compete by combined timestamp; the strictly later one wins,
/// and an exact cross-source tie goes to ERP. Legacy records never compete.
/// No eligible timestamp anywhere ⇒ `WinnerInfo::Unknown`.
pub fn select_winner(records: &[SourceRecord]) -> WinnerInfo {
    let erp = latest_for(records, SourceSystem::Erp);
    let grc = latest_for(records, SourceSystem::Grc);

    let (record, updated) = match (erp, grc) {
        (Some((erp_rec, erp_ts)), Some((grc_rec, grc_ts))) => {
            if grc_ts > erp_ts {
                (grc_rec, grc_ts)
            } else {
                (erp_rec, erp_ts)
            }
        }
        (Some(only), None) => only,
        (None, Some(only)) => only,
        (None, None) => return WinnerInfo::Unknown,
    };

    WinnerInfo::Known {
        source: record.source(),
        active: record.active_flag(),
        updated,
    }
}
