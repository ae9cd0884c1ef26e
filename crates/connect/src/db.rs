//! Relational read connectors: the ERP supplier mirror and the mapping
//! staging table (which also carries the Legacy rows).

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::Connection;

use vmaster_recon::{ErpSupplier, LegacySupplier, MappingRow};

use crate::error::ConnectError;
use crate::staging::STAGING_SCHEMA;

/// Source tag under which the retired purchasing system's rows live in the
/// mapping table.
pub const LEGACY_SOURCE_TAG: &str = "Legacy";

// ── ERP mirror ──────────────────────────────────────────────────────

pub struct ErpDb {
    conn: Connection,
}

/// Suppliers read from the mirror, plus rows whose update date would not
/// parse (kept, but with no date, so they stay out of winner selection).
#[derive(Debug)]
pub struct ErpLoad {
    pub suppliers: Vec<ErpSupplier>,
    pub bad_dates: usize,
}

impl ErpDb {
    pub fn open(path: &Path) -> Result<Self, ConnectError> {
        let conn = Connection::open(path).map_err(|e| ConnectError::db("ERP db open", e))?;
        Ok(Self { conn })
    }

    pub fn load_suppliers(&self) -> Result<ErpLoad, ConnectError> {
        let sql = "
            SELECT s.supplier_code, s.supplier_name, s.group_id, g.description,
                   s.active, s.update_date, s.update_time
            FROM suppliers s
            JOIN supplier_groups g ON s.group_id = g.group_id
            ORDER BY s.supplier_code";

        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| ConnectError::db("ERP supplier query", e))?;

        let mut bad_dates = 0usize;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<bool>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                ))
            })
            .map_err(|e| ConnectError::db("ERP supplier query", e))?;

        let mut suppliers = Vec::new();
        for row in rows {
            let (code, name, group_id, group_description, active, date_raw, time_raw) =
                row.map_err(|e| ConnectError::db("ERP supplier row", e))?;

            let update_date = match date_raw.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                    Ok(date) => Some(date),
                    Err(_) => {
                        bad_dates += 1;
                        None
                    }
                },
            };

            suppliers.push(ErpSupplier {
                supplier_code: code,
                supplier_name: name,
                group_id: group_id.unwrap_or_default(),
                group_description: group_description.unwrap_or_default(),
                active,
                update_date,
                update_time: time_raw.filter(|t| !t.trim().is_empty()),
            });
        }

        Ok(ErpLoad { suppliers, bad_dates })
    }
}

// ── Mapping staging ─────────────────────────────────────────────────

pub struct MappingDb {
    pub(crate) conn: Connection,
}

impl MappingDb {
    /// Open the staging database, creating the mapping table if this is the
    /// first cycle against it.
    pub fn open(path: &Path) -> Result<Self, ConnectError> {
        let conn = Connection::open(path).map_err(|e| ConnectError::db("staging db open", e))?;
        conn.execute_batch(STAGING_SCHEMA)
            .map_err(|e| ConnectError::db("staging schema", e))?;
        Ok(Self { conn })
    }

    /// All staging rows, in insertion order: the RollupMapping index input.
    pub fn load_rows(&self) -> Result<Vec<MappingRow>, ConnectError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT vendor_id, vendor_name, rollup_name, source_system,
                        group_id, group_description, active_yn
                 FROM vendor_mapping ORDER BY rowid",
            )
            .map_err(|e| ConnectError::db("mapping query", e))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(MappingRow {
                    vendor_id: row.get(0)?,
                    vendor_name: row.get(1)?,
                    rollup_name: row.get(2)?,
                    source_system: row.get(3)?,
                    group_id: row.get(4)?,
                    group_description: row.get(5)?,
                    active_yn: row.get(6)?,
                })
            })
            .map_err(|e| ConnectError::db("mapping query", e))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConnectError::db("mapping row", e))
    }

    /// Rows tagged with the Legacy source, adapted to supplier records.
    /// "Y"/"N" case-insensitively drives the active flag.
    pub fn load_legacy_suppliers(&self) -> Result<Vec<LegacySupplier>, ConnectError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT vendor_id, vendor_name, group_id, group_description, active_yn
                 FROM vendor_mapping
                 WHERE LOWER(source_system) = LOWER(?1)
                 ORDER BY rowid",
            )
            .map_err(|e| ConnectError::db("legacy query", e))?;

        let rows = stmt
            .query_map([LEGACY_SOURCE_TAG], |row| {
                Ok(LegacySupplier {
                    supplier_id: row.get(0)?,
                    supplier_name: row.get(1)?,
                    group_id: row.get(2)?,
                    group_description: row.get(3)?,
                    active: row.get::<_, String>(4)?.eq_ignore_ascii_case("Y"),
                })
            })
            .map_err(|e| ConnectError::db("legacy query", e))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConnectError::db("legacy row", e))
    }
}
