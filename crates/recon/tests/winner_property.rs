//! Winner monotonicity: introducing a strictly later record never moves the
//! winning timestamp backwards, and equal cross-source timestamps always
//! resolve to ERP.

use chrono::NaiveDateTime;
use proptest::prelude::*;

use vmaster_recon::winner::select_winner;
use vmaster_recon::{ErpSupplier, GrcSupplier, SourceRecord, SourceSystem, WinnerInfo};

fn erp_at(ts: NaiveDateTime, code: &str) -> SourceRecord {
    SourceRecord::Erp(ErpSupplier {
        supplier_code: code.into(),
        supplier_name: "Vendor".into(),
        group_id: String::new(),
        group_description: String::new(),
        active: Some(true),
        update_date: Some(ts.date()),
        update_time: Some(ts.format("%H:%M:%S").to_string()),
    })
}

fn grc_at(ts: NaiveDateTime, id: &str) -> SourceRecord {
    SourceRecord::Grc(GrcSupplier {
        record_id: id.into(),
        rollup_name: "VENDOR".into(),
        supplier_name: "Vendor".into(),
        group_id: String::new(),
        group_description: String::new(),
        active: true,
        updated: Some(ts),
    })
}

prop_compose! {
    fn arb_timestamp()(secs in 0i64..4_000_000_000i64) -> NaiveDateTime {
        chrono::DateTime::from_timestamp(secs, 0).unwrap().naive_utc()
    }
}

proptest! {
    #[test]
    fn winner_timestamp_is_max_of_candidates(a in arb_timestamp(), b in arb_timestamp()) {
        let records = vec![erp_at(a, "e1"), grc_at(b, "g1")];
        let winner = select_winner(&records);

        let WinnerInfo::Known { updated, source, .. } = winner else {
            panic!("two timestamped records must produce a winner");
        };
        prop_assert_eq!(updated, a.max(b));
        if a == b {
            prop_assert_eq!(source, SourceSystem::Erp);
        }
    }

    #[test]
    fn later_record_never_lowers_the_winner(a in arb_timestamp(), b in arb_timestamp(), c in arb_timestamp()) {
        let before = vec![erp_at(a, "e1"), grc_at(b, "g1")];
        let WinnerInfo::Known { updated: winner_before, .. } = select_winner(&before) else {
            panic!("baseline must have a winner");
        };

        // Add a third record anywhere in time; the winner may only move forward.
        let after = vec![erp_at(a, "e1"), grc_at(b, "g1"), grc_at(c, "g2")];
        let WinnerInfo::Known { updated: winner_after, .. } = select_winner(&after) else {
            panic!("adding a record cannot remove the winner");
        };
        prop_assert!(winner_after >= winner_before);

        // And it changes only if the newcomer is strictly later.
        if c <= winner_before {
            prop_assert_eq!(winner_after, winner_before);
        } else {
            prop_assert_eq!(winner_after, c);
        }
    }
}
