//! Source road segments.

use std::path::Path;

use altnames_roads_models::{FieldValue, SourceRow};
use altnames_schema::{Field, Schema, resolve};
use duckdb::Connection;
use duckdb::types::Value;

use crate::StoreError;
use crate::sql::{quote_ident, require_table};

/// Forward-only access to the source road feature collection.
pub trait RoadSource {
    /// The source schema, in column order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the schema cannot be read.
    fn schema(&self) -> Result<Schema, StoreError>;

    /// Number of rows in the source.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the count query fails.
    fn row_count(&self) -> Result<u64, StoreError>;

    /// Visits every row in store order. Values line up with
    /// [`RoadSource::schema`].
    ///
    /// The cursor is released before this returns, including when `f`
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns the first error from `f`, or a [`StoreError`] from reading.
    fn for_each_row<E, F>(&self, f: F) -> Result<(), E>
    where
        E: From<StoreError>,
        F: FnMut(SourceRow) -> Result<(), E>;

    /// Number of rows with a null in any of `fields`. Names resolve by
    /// field name or alias; unknown names are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn null_value_count(&self, fields: &[&str]) -> Result<u64, StoreError>;
}

/// A [`RoadSource`] reading one table of a `DuckDB` database.
///
/// Column comments are used as field aliases.
pub struct DuckDbRoadSource {
    conn: Connection,
    table: String,
}

impl DuckDbRoadSource {
    /// Opens `table` in the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TableNotFound`] if the table does not exist,
    /// or [`StoreError::DuckDb`] if the database cannot be opened.
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

impl RoadSource for DuckDbRoadSource {
    fn schema(&self) -> Result<Schema, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name, comment FROM duckdb_columns()
             WHERE schema_name = 'main' AND table_name = ?
             ORDER BY column_index",
        )?;
        stmt.raw_bind_parameter(1, &self.table)?;
        stmt.raw_execute()?;

        let mut fields = Vec::new();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            let comment: Option<String> = row.get(1)?;
            fields.push(Field {
                name,
                alias: comment.filter(|c| !c.trim().is_empty()),
            });
        }

        Ok(Schema::new(fields))
    }

    fn row_count(&self) -> Result<u64, StoreError> {
        let sql = format!("SELECT count(*) FROM {}", quote_ident(&self.table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn for_each_row<E, F>(&self, mut f: F) -> Result<(), E>
    where
        E: From<StoreError>,
        F: FnMut(SourceRow) -> Result<(), E>,
    {
        let columns = self.schema()?.len();
        let sql = format!(
            "SELECT rowid, * FROM {} ORDER BY rowid",
            quote_ident(&self.table)
        );

        let mut stmt = self.conn.prepare(&sql).map_err(StoreError::from)?;
        stmt.raw_execute().map_err(StoreError::from)?;
        let mut rows = stmt.raw_query();

        while let Some(row) = rows.next().map_err(StoreError::from)? {
            let object_id: i64 = row.get(0).map_err(StoreError::from)?;
            let mut values = Vec::with_capacity(columns);
            for i in 1..=columns {
                let value: Value = row.get(i).map_err(StoreError::from)?;
                values.push(to_field_value(value));
            }
            f(SourceRow { object_id, values })?;
        }

        Ok(())
    }

    fn null_value_count(&self, fields: &[&str]) -> Result<u64, StoreError> {
        let schema = self.schema()?;
        let map = resolve(&schema, fields);
        let predicates: Vec<String> = fields
            .iter()
            .filter_map(|f| map.get(f))
            .map(|i| format!("{} IS NULL", quote_ident(&schema.fields()[i].name)))
            .collect();

        if predicates.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "SELECT count(*) FROM {} WHERE {}",
            quote_ident(&self.table),
            predicates.join(" OR ")
        );
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;

        Ok(u64::try_from(count).unwrap_or(0))
    }
}

/// Maps a `DuckDB` value onto the store-native [`FieldValue`].
#[allow(clippy::cast_precision_loss)]
fn to_field_value(value: Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Boolean(b) => FieldValue::Integer(i64::from(b)),
        Value::TinyInt(v) => FieldValue::Integer(i64::from(v)),
        Value::SmallInt(v) => FieldValue::Integer(i64::from(v)),
        Value::Int(v) => FieldValue::Integer(i64::from(v)),
        Value::BigInt(v) => FieldValue::Integer(v),
        Value::UTinyInt(v) => FieldValue::Integer(i64::from(v)),
        Value::USmallInt(v) => FieldValue::Integer(i64::from(v)),
        Value::UInt(v) => FieldValue::Integer(i64::from(v)),
        Value::UBigInt(v) => {
            i64::try_from(v).map_or(FieldValue::Double(v as f64), FieldValue::Integer)
        }
        Value::HugeInt(v) => {
            i64::try_from(v).map_or(FieldValue::Double(v as f64), FieldValue::Integer)
        }
        Value::Float(v) => FieldValue::Double(f64::from(v)),
        Value::Double(v) => FieldValue::Double(v),
        Value::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .map_or_else(|_| FieldValue::Text(d.to_string()), FieldValue::Double),
        Value::Text(s) | Value::Enum(s) => FieldValue::Text(s),
        Value::Blob(b) => FieldValue::Blob(b),
        other => {
            log::warn!("Unsupported source value type, reading as null: {other:?}");
            FieldValue::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> DuckDbRoadSource {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE roads (
                NAME TEXT,
                STREETTYPE TEXT,
                FROMADDR_L INTEGER,
                TOADDR_L DOUBLE,
                SHAPE BLOB
            );
            COMMENT ON COLUMN roads.STREETTYPE IS 'POSTTYPE';
            INSERT INTO roads VALUES
                ('MAIN', 'ST', 100, 199.0, '\\x01\\x02'::BLOB),
                ('STATE', NULL, NULL, 0.0, NULL);",
        )
        .unwrap();
        DuckDbRoadSource::from_connection(conn, "roads").unwrap()
    }

    #[test]
    fn reads_schema_with_comment_aliases() {
        let schema = source().schema().unwrap();

        assert_eq!(schema.len(), 5);
        assert_eq!(schema.find_field("NAME"), Some(0));
        assert_eq!(schema.find_field_by_alias("POSTTYPE"), Some(1));
    }

    #[test]
    fn visits_rows_in_order() {
        let mut rows = Vec::new();
        source()
            .for_each_row(|row| {
                rows.push(row);
                Ok::<(), StoreError>(())
            })
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].values[0], FieldValue::Text("MAIN".to_string()));
        assert_eq!(rows[0].values[2], FieldValue::Integer(100));
        assert_eq!(rows[0].values[3], FieldValue::Double(199.0));
        assert_eq!(rows[0].values[4], FieldValue::Blob(vec![1, 2]));
        assert_eq!(rows[1].values[1], FieldValue::Null);
    }

    #[test]
    fn counts_null_rows_by_name_or_alias() {
        let source = source();

        assert_eq!(source.row_count().unwrap(), 2);
        assert_eq!(source.null_value_count(&["POSTTYPE"]).unwrap(), 1);
        assert_eq!(source.null_value_count(&["NAME"]).unwrap(), 0);
        assert_eq!(source.null_value_count(&["NAME", "FROMADDR_L"]).unwrap(), 1);
    }

    #[test]
    fn missing_table_is_reported() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            DuckDbRoadSource::from_connection(conn, "roads"),
            Err(StoreError::TableNotFound { .. })
        ));
    }
}
