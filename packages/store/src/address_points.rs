//! Address point source and the alt-name candidate query.

use std::path::Path;

use altnames_roads_models::{AddressPointCandidate, AddressPointRecord};
use duckdb::Connection;

use crate::StoreError;
use crate::sql::{quote_ident, require_table};

/// Source of address points that may need an alt-names row.
pub trait AddressPointSource {
    /// Address points that have a prefix direction, an alphabetic street
    /// name that is not a highway, and no twin at the same location under a
    /// different prefix direction. Each comes with its raw join id.
    ///
    /// Results are distinct and sorted, so repeated calls against an
    /// unchanged source return the same list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn altname_candidates(&self) -> Result<Vec<AddressPointCandidate>, StoreError>;
}

/// An [`AddressPointSource`] over one `DuckDB` table with columns
/// `AddSystem, AddNum, AddNumSuffix, PrefixDir, StreetName, StreetType,
/// SuffixDir, City, ZipCode, CountyID`.
pub struct DuckDbAddressPointSource {
    conn: Connection,
    table: String,
}

impl DuckDbAddressPointSource {
    /// Opens `table` in the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database cannot be opened or the table
    /// does not exist.
    pub fn open(path: &Path, table: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, table)
    }

    /// Wraps an existing connection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TableNotFound`] if the table does not exist.
    pub fn from_connection(conn: Connection, table: &str) -> Result<Self, StoreError> {
        require_table(&conn, table)?;
        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }
}

impl AddressPointSource for DuckDbAddressPointSource {
    fn altname_candidates(&self) -> Result<Vec<AddressPointCandidate>, StoreError> {
        let sql = format!(
            "WITH pts AS (
                SELECT
                    trim(coalesce(CAST(AddSystem AS VARCHAR), '')) AS sys,
                    trim(coalesce(CAST(AddNum AS VARCHAR), '')) AS num,
                    trim(coalesce(CAST(AddNumSuffix AS VARCHAR), '')) AS num_suffix,
                    trim(coalesce(CAST(PrefixDir AS VARCHAR), '')) AS prefix,
                    trim(coalesce(CAST(StreetName AS VARCHAR), '')) AS street,
                    trim(coalesce(CAST(StreetType AS VARCHAR), '')) AS street_type,
                    trim(coalesce(CAST(SuffixDir AS VARCHAR), '')) AS suffix,
                    trim(coalesce(CAST(City AS VARCHAR), '')) AS city,
                    trim(coalesce(CAST(ZipCode AS VARCHAR), '')) AS zip,
                    trim(coalesce(CAST(CountyID AS VARCHAR), '')) AS county
                FROM {table}
            )
            SELECT DISTINCT
                a.sys, a.num, a.num_suffix, a.prefix, a.street, a.street_type,
                a.suffix, a.city, a.zip, a.county,
                a.sys || ' | ' || a.num || ' ' || a.num_suffix || ' ' || a.prefix
                    || ' ' || a.street || ' ' || trim(a.street_type || ' ' || a.suffix)
            FROM pts a
            WHERE a.prefix <> ''
              AND (upper(a.street) <> a.street OR lower(a.street) <> a.street)
              AND upper(a.street) NOT LIKE 'HIGHWAY %'
              AND NOT EXISTS (
                  SELECT 1 FROM pts b
                  WHERE b.sys = a.sys
                    AND b.street = a.street
                    AND b.num = a.num
                    AND b.street_type = a.street_type
                    AND b.suffix = a.suffix
                    AND b.num_suffix = a.num_suffix
                    AND b.prefix <> a.prefix
              )
            ORDER BY 1, 2, 3, 4, 5, 6, 7, 8, 9, 10",
            table = quote_ident(&self.table),
        );

        let mut stmt = self.conn.prepare(&sql)?;
        stmt.raw_execute()?;

        let mut candidates = Vec::new();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            candidates.push(AddressPointCandidate {
                record: AddressPointRecord {
                    system: row.get(0)?,
                    number: row.get(1)?,
                    number_suffix: row.get(2)?,
                    prefix_dir: row.get(3)?,
                    street_name: row.get(4)?,
                    street_type: row.get(5)?,
                    suffix_dir: row.get(6)?,
                    city: row.get(7)?,
                    zip: row.get(8)?,
                    county: row.get(9)?,
                },
                join_id: row.get(10)?,
            });
        }

        log::info!("{} address points need an alt-names row", candidates.len());

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(rows: &str) -> DuckDbAddressPointSource {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(&format!(
            "CREATE TABLE address_points (
                AddSystem TEXT, AddNum TEXT, AddNumSuffix TEXT, PrefixDir TEXT,
                StreetName TEXT, StreetType TEXT, SuffixDir TEXT, City TEXT,
                ZipCode TEXT, CountyID TEXT
            );
            INSERT INTO address_points VALUES {rows};"
        ))
        .unwrap();
        DuckDbAddressPointSource::from_connection(conn, "address_points").unwrap()
    }

    #[test]
    fn excludes_twins_under_another_prefix() {
        let source = source(
            "('X', '100', '', 'N', 'STATE', 'ST', '', 'SLC', '84101', '18'),
             ('X', '100', '', 'S', 'STATE', 'ST', '', 'SLC', '84101', '18'),
             ('X', '200', NULL, 'E', 'CENTER', 'ST', NULL, 'SLC', '84101', '18')",
        );

        let candidates = source.altname_candidates().unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].record.street_name, "CENTER");
        assert_eq!(candidates[0].record.suffix_dir, "");
        assert_eq!(candidates[0].join_id, "X | 200  E CENTER ST");
    }

    #[test]
    fn filters_ineligible_points() {
        let source = source(
            "('X', '1', '', '', 'MAIN', 'ST', '', '', '', ''),
             ('X', '2', '', 'N', '1300', '', 'E', '', '', ''),
             ('X', '3', '', 'N', 'Highway 89', '', '', '', '', ''),
             ('X', '4', 'A', 'W', 'ELM', 'AVE', 'N', '', '', '')",
        );

        let candidates = source.altname_candidates().unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].join_id, "X | 4 A W ELM AVE N");
    }

    #[test]
    fn repeated_queries_return_the_same_candidates() {
        let source = source(
            "('X', '100', '', 'N', 'STATE', 'ST', '', '', '', ''),
             ('X', '100', '', 'N', 'STATE', 'ST', '', '', '', ''),
             ('Y', '5', '', 'S', 'OAK', 'DR', '', '', '', '')",
        );

        let first = source.altname_candidates().unwrap();
        let second = source.altname_candidates().unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
