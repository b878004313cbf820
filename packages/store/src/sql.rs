//! Small `DuckDB` helpers shared by the workspace and the sources.

use duckdb::Connection;

use crate::StoreError;

/// Quotes an identifier for interpolation into SQL.
///
/// Table and column names cannot be bound as parameters.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Returns `true` if a table named `name` exists in the main schema.
pub fn table_exists(conn: &Connection, name: &str) -> Result<bool, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT count(*) FROM information_schema.tables
         WHERE table_schema = 'main' AND table_name = ?",
    )?;
    let count: i64 = stmt.query_row([name], |row| row.get(0))?;
    Ok(count > 0)
}

/// Fails with [`StoreError::TableNotFound`] unless `name` exists.
pub fn require_table(conn: &Connection, name: &str) -> Result<(), StoreError> {
    if table_exists(conn, name)? {
        Ok(())
    } else {
        Err(StoreError::TableNotFound {
            table: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_embedded_quotes() {
        assert_eq!(quote_ident("Roads"), "\"Roads\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn detects_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE roads (id INTEGER)").unwrap();

        assert!(table_exists(&conn, "roads").unwrap());
        assert!(!table_exists(&conn, "missing").unwrap());
        assert!(matches!(
            require_table(&conn, "missing"),
            Err(StoreError::TableNotFound { .. })
        ));
    }
}
