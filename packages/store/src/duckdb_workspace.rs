//! Output workspace stored in a `DuckDB` file.
//!
//! Holds four tables: the geocode-ready roads ([`GEOCODE_ROADS_TABLE`]),
//! the scratch copy the matcher queries ([`SCRATCH_ROADS_TABLE`]), and the
//! two alt-names tables. Geometry is stored as an opaque `BLOB`. Object ids
//! are assigned here, sequentially per table.
//!
//! A statement that fails inside an open transaction aborts that
//! transaction in `DuckDB`; later writes in the same edit fail too and the
//! commit is refused, so the whole edit is rolled back.

use std::collections::BTreeMap;
use std::path::Path;

use altnames_roads_models::{
    AddressRange, AltNameAddressPoint, AltNameRoad, Envelope, GeocodeRoad, MatchKey,
    RoadAttributes, StoredRoad,
};
use chrono::{Local, NaiveDate};
use duckdb::{Connection, params};

use crate::sql::{quote_ident, table_exists};
use crate::{
    ALT_NAMES_ADDRESS_POINTS_TABLE, ALT_NAMES_ROADS_TABLE, GEOCODE_ROADS_TABLE, OutputWorkspace,
    SCRATCH_INDEX_FIELDS, SCRATCH_ROADS_TABLE, StoreError,
};

const ROAD_COLUMNS: &str = "ADDRSYS_L, ADDRSYS_R, FROMADDR_L, TOADDR_L, FROMADDR_R, TOADDR_R,
    PREDIR, NAME, POSTTYPE, POSTDIR, ZIPCODE_L, ZIPCODE_R, GLOBALID_SGID";

/// An [`OutputWorkspace`] backed by a `DuckDB` database.
pub struct DuckDbWorkspace {
    conn: Connection,
    editing: bool,
    next_ids: BTreeMap<&'static str, i64>,
}

impl DuckDbWorkspace {
    /// Opens (or creates) the workspace at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the parent directory or the connection
    /// cannot be created.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            crate::paths::ensure_dir(parent)?;
        }

        let conn = Connection::open(path)?;
        Ok(Self::from_connection(conn))
    }

    /// Opens a workspace that lives only as long as this value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            editing: false,
            next_ids: BTreeMap::new(),
        }
    }

    /// Number of rows in `table`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the table does not exist or the query
    /// fails.
    pub fn row_count(&self, table: &str) -> Result<u64, StoreError> {
        let sql = format!("SELECT count(*) FROM {}", quote_ident(table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Road alt-names rows in object id order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub fn alt_name_roads(&self) -> Result<Vec<AltNameRoad>, StoreError> {
        let sql = format!(
            "SELECT ADDRSYS_L, ADDRSYS_R, FROMADDR_L, TOADDR_L, FROMADDR_R, TOADDR_R,
                    NAME, POSTTYPE, POSTDIR, ZIPCODE_L, ZIPCODE_R, GLOBALID_SGID
             FROM {} ORDER BY OBJECTID",
            quote_ident(ALT_NAMES_ROADS_TABLE)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        stmt.raw_execute()?;

        let mut results = Vec::new();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            results.push(AltNameRoad {
                address_system_left: row.get(0)?,
                address_system_right: row.get(1)?,
                range: AddressRange::new(row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?),
                name: row.get(6)?,
                street_type: row.get(7)?,
                postdir: row.get(8)?,
                zip_left: row.get(9)?,
                zip_right: row.get(10)?,
                global_id: row.get(11)?,
            });
        }

        Ok(results)
    }

    fn next_id(&mut self, table: &'static str) -> i64 {
        let id = self.next_ids.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    /// Renames `table` out of the way if it exists.
    fn archive(&self, table: &str, today: NaiveDate) -> Result<(), StoreError> {
        if !table_exists(&self.conn, table)? {
            return Ok(());
        }

        let archived = archive_table_name(table, today, |name| {
            table_exists(&self.conn, name).unwrap_or(false)
        });
        self.conn.execute_batch(&format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_ident(table),
            quote_ident(&archived)
        ))?;

        log::info!("Archived existing {table} as {archived}");
        Ok(())
    }

    fn stored_roads(
        &self,
        filter: &str,
        bind: impl FnOnce(&mut duckdb::Statement<'_>) -> Result<(), duckdb::Error>,
    ) -> Result<Vec<StoredRoad>, StoreError> {
        let sql = format!(
            "SELECT OBJECTID, {ROAD_COLUMNS} FROM {} WHERE {filter} ORDER BY OBJECTID",
            quote_ident(SCRATCH_ROADS_TABLE)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        bind(&mut stmt)?;
        stmt.raw_execute()?;

        let mut results = Vec::new();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            results.push(StoredRoad {
                object_id: row.get(0)?,
                attributes: RoadAttributes {
                    address_system_left: row.get(1)?,
                    address_system_right: row.get(2)?,
                    range: AddressRange::new(row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?),
                    predir: row.get(7)?,
                    name: row.get(8)?,
                    street_type: row.get(9)?,
                    postdir: row.get(10)?,
                    zip_left: row.get(11)?,
                    zip_right: row.get(12)?,
                    global_id: row.get(13)?,
                },
            });
        }

        Ok(results)
    }
}

/// Name an existing output table is renamed to: `<table>ReplacedOn<YYYYMMDD>`,
/// with `_2`, `_3`, ... appended while `taken` reports the name in use.
#[must_use]
pub fn archive_table_name(table: &str, date: NaiveDate, taken: impl Fn(&str) -> bool) -> String {
    let base = format!("{table}ReplacedOn{}", date.format("%Y%m%d"));
    if !taken(&base) {
        return base;
    }

    let mut n = 2;
    loop {
        let candidate = format!("{base}_{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn road_table_ddl(table: &str, with_predir: bool, with_shape: bool) -> String {
    format!(
        "CREATE TABLE {} (
            OBJECTID BIGINT NOT NULL,
            ADDRSYS_L TEXT,
            ADDRSYS_R TEXT,
            FROMADDR_L BIGINT,
            TOADDR_L BIGINT,
            FROMADDR_R BIGINT,
            TOADDR_R BIGINT,
            {}NAME TEXT,
            POSTTYPE TEXT,
            POSTDIR TEXT,
            ZIPCODE_L TEXT,
            ZIPCODE_R TEXT,
            GLOBALID_SGID TEXT{}
        );",
        quote_ident(table),
        if with_predir { "PREDIR TEXT,\n            " } else { "" },
        if with_shape { ",\n            SHAPE BLOB" } else { "" },
    )
}

impl OutputWorkspace for DuckDbWorkspace {
    fn begin_edit(&mut self) -> Result<(), StoreError> {
        if self.editing {
            return Err(StoreError::EditInProgress);
        }
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        self.editing = true;
        Ok(())
    }

    fn commit_edit(&mut self) -> Result<(), StoreError> {
        if !self.editing {
            return Err(StoreError::NoEditInProgress);
        }
        self.editing = false;

        if let Err(e) = self.conn.execute_batch("COMMIT") {
            if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                log::debug!("No transaction left to roll back after failed commit: {rollback}");
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn rollback_edit(&mut self) -> Result<(), StoreError> {
        if !self.editing {
            return Err(StoreError::NoEditInProgress);
        }
        self.editing = false;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn is_editing(&self) -> bool {
        self.editing
    }

    fn prepare_road_outputs(&mut self) -> Result<(), StoreError> {
        let today = Local::now().date_naive();
        self.archive(GEOCODE_ROADS_TABLE, today)?;
        self.archive(ALT_NAMES_ROADS_TABLE, today)?;

        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {};",
            quote_ident(SCRATCH_ROADS_TABLE)
        ))?;
        self.conn.execute_batch(&road_table_ddl(GEOCODE_ROADS_TABLE, true, true))?;
        self.conn.execute_batch(&road_table_ddl(SCRATCH_ROADS_TABLE, true, false))?;
        self.conn.execute_batch(&road_table_ddl(ALT_NAMES_ROADS_TABLE, false, false))?;

        for table in [GEOCODE_ROADS_TABLE, SCRATCH_ROADS_TABLE, ALT_NAMES_ROADS_TABLE] {
            self.next_ids.remove(table);
        }

        log::info!("Created {GEOCODE_ROADS_TABLE}, {SCRATCH_ROADS_TABLE} and {ALT_NAMES_ROADS_TABLE}");
        Ok(())
    }

    fn prepare_address_point_output(&mut self) -> Result<(), StoreError> {
        self.archive(ALT_NAMES_ADDRESS_POINTS_TABLE, Local::now().date_naive())?;

        self.conn.execute_batch(&format!(
            "CREATE TABLE {} (
                OBJECTID BIGINT NOT NULL,
                AddSystem TEXT,
                AddNum TEXT,
                AddNumSuffix TEXT,
                StreetName TEXT,
                StreetType TEXT,
                SuffixDir TEXT,
                City TEXT,
                ZipCode TEXT,
                CountyID TEXT,
                UTAddPtID TEXT
            );",
            quote_ident(ALT_NAMES_ADDRESS_POINTS_TABLE)
        ))?;
        self.next_ids.remove(ALT_NAMES_ADDRESS_POINTS_TABLE);

        log::info!("Created {ALT_NAMES_ADDRESS_POINTS_TABLE}");
        Ok(())
    }

    fn insert_geocode_road(&mut self, road: &GeocodeRoad) -> Result<i64, StoreError> {
        let id = self.next_id(GEOCODE_ROADS_TABLE);
        let a = &road.attributes;
        self.conn.execute(
            &format!(
                "INSERT INTO {} (OBJECTID, {ROAD_COLUMNS}, SHAPE)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                quote_ident(GEOCODE_ROADS_TABLE)
            ),
            params![
                id,
                a.address_system_left,
                a.address_system_right,
                a.range.from_left,
                a.range.to_left,
                a.range.from_right,
                a.range.to_right,
                a.predir,
                a.name,
                a.street_type,
                a.postdir,
                a.zip_left,
                a.zip_right,
                a.global_id,
                road.geometry.0,
            ],
        )?;
        Ok(id)
    }

    fn insert_scratch_road(&mut self, attributes: &RoadAttributes) -> Result<i64, StoreError> {
        let id = self.next_id(SCRATCH_ROADS_TABLE);
        let a = attributes;
        self.conn.execute(
            &format!(
                "INSERT INTO {} (OBJECTID, {ROAD_COLUMNS})
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                quote_ident(SCRATCH_ROADS_TABLE)
            ),
            params![
                id,
                a.address_system_left,
                a.address_system_right,
                a.range.from_left,
                a.range.to_left,
                a.range.from_right,
                a.range.to_right,
                a.predir,
                a.name,
                a.street_type,
                a.postdir,
                a.zip_left,
                a.zip_right,
                a.global_id,
            ],
        )?;
        Ok(id)
    }

    fn insert_alt_name_road(&mut self, row: &AltNameRoad) -> Result<(), StoreError> {
        let id = self.next_id(ALT_NAMES_ROADS_TABLE);
        self.conn.execute(
            &format!(
                "INSERT INTO {} (OBJECTID, ADDRSYS_L, ADDRSYS_R, FROMADDR_L, TOADDR_L,
                    FROMADDR_R, TOADDR_R, NAME, POSTTYPE, POSTDIR, ZIPCODE_L, ZIPCODE_R,
                    GLOBALID_SGID)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                quote_ident(ALT_NAMES_ROADS_TABLE)
            ),
            params![
                id,
                row.address_system_left,
                row.address_system_right,
                row.range.from_left,
                row.range.to_left,
                row.range.from_right,
                row.range.to_right,
                row.name,
                row.street_type,
                row.postdir,
                row.zip_left,
                row.zip_right,
                row.global_id,
            ],
        )?;
        Ok(())
    }

    fn insert_alt_name_address_point(
        &mut self,
        row: &AltNameAddressPoint,
    ) -> Result<(), StoreError> {
        let id = self.next_id(ALT_NAMES_ADDRESS_POINTS_TABLE);
        self.conn.execute(
            &format!(
                "INSERT INTO {} (OBJECTID, AddSystem, AddNum, AddNumSuffix, StreetName,
                    StreetType, SuffixDir, City, ZipCode, CountyID, UTAddPtID)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                quote_ident(ALT_NAMES_ADDRESS_POINTS_TABLE)
            ),
            params![
                id,
                row.system,
                row.number,
                row.number_suffix,
                row.street_name,
                row.street_type,
                row.suffix_dir,
                row.city,
                row.zip,
                row.county,
                row.join_id,
            ],
        )?;
        Ok(())
    }

    fn create_scratch_indexes(&mut self) -> Result<(), StoreError> {
        for field in SCRATCH_INDEX_FIELDS {
            let index = format!("{SCRATCH_ROADS_TABLE}_{field}_idx");
            self.conn.execute_batch(&format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quote_ident(&index),
                quote_ident(SCRATCH_ROADS_TABLE),
                quote_ident(field)
            ))?;
            log::debug!("Created index {index}");
        }
        Ok(())
    }

    fn scratch_needing_disambiguation(&self) -> Result<Vec<StoredRoad>, StoreError> {
        self.stored_roads(
            "PREDIR <> '' AND (upper(NAME) <> NAME OR lower(NAME) <> NAME)",
            |_| Ok(()),
        )
    }

    fn possible_candidates(&self, key: &MatchKey) -> Result<Vec<StoredRoad>, StoreError> {
        self.stored_roads(
            "ADDRSYS_L = ? AND ADDRSYS_R = ? AND NAME = ? AND POSTTYPE = ?
             AND POSTDIR = ? AND PREDIR <> ?",
            |stmt| {
                stmt.raw_bind_parameter(1, &key.address_system_left)?;
                stmt.raw_bind_parameter(2, &key.address_system_right)?;
                stmt.raw_bind_parameter(3, &key.name)?;
                stmt.raw_bind_parameter(4, &key.street_type)?;
                stmt.raw_bind_parameter(5, &key.postdir)?;
                stmt.raw_bind_parameter(6, &key.predir)?;
                Ok(())
            },
        )
    }

    fn range_contains(&self, object_id: i64, envelope: Envelope) -> Result<bool, StoreError> {
        let sql = format!(
            "SELECT count(*) FROM {}
             WHERE OBJECTID = ?
               AND (? BETWEEN FROMADDR_L AND TOADDR_L
                 OR ? BETWEEN FROMADDR_L AND TOADDR_L
                 OR ? BETWEEN FROMADDR_R AND TOADDR_R
                 OR ? BETWEEN FROMADDR_R AND TOADDR_R)",
            quote_ident(SCRATCH_ROADS_TABLE)
        );
        let count: i64 = self.conn.query_row(
            &sql,
            params![
                object_id,
                envelope.low,
                envelope.high,
                envelope.low,
                envelope.high
            ],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
