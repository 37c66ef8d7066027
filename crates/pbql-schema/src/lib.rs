//! Relational schema for flattened protobuf descriptors.
//!
//! Eleven tables describe a batch of descriptor files:
//!
//! - `files`, `dependencies`
//! - `messages`, `fields`, `oneofs`, `oneof_fields`
//! - `enums`, `enum_values`
//! - `services`, `methods`
//! - `extensions`
//!
//! Every `options` column holds JSON text (or NULL when no option is set), so
//! vendor annotations unknown at build time remain queryable with SQLite's
//! JSON operators. No foreign keys are declared: referential integrity is an
//! invariant of the loader, not something the store checks on insert.

pub mod catalog;
mod table;

pub use catalog::{tables, ColumnDef, TableDef};
pub use table::Table;

use rusqlite::Connection;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to create table {table}")]
    Create {
        table: Table,
        #[source]
        source: rusqlite::Error,
    },
    #[error("table {table} already exists with incompatible columns [{found}]")]
    Incompatible { table: Table, found: String },
    #[error("no CREATE TABLE statement in DDL for {table}")]
    MissingDdl { table: Table },
    #[error("failed to parse DDL")]
    Parse(#[from] sqlparser::parser::ParserError),
    #[error("sqlite error")]
    Sqlite(#[from] rusqlite::Error),
}

/// Create every table that does not exist yet.
///
/// Idempotent. Tables that already exist must have exactly the expected
/// column list, otherwise nothing is created and the first mismatching table
/// is reported.
pub fn ensure_schema(conn: &Connection) -> Result<(), SchemaError> {
    let tx = conn.unchecked_transaction()?;

    for table in Table::ALL {
        match existing_columns(&tx, table)? {
            None => {
                tx.execute_batch(table.ddl())
                    .map_err(|source| SchemaError::Create { table, source })?;
                tracing::debug!(table = %table, "created table");
            }
            Some(found)
                if found
                    .iter()
                    .map(String::as_str)
                    .eq(table.columns().iter().copied()) => {}
            Some(found) => {
                return Err(SchemaError::Incompatible {
                    table,
                    found: found.join(", "),
                });
            }
        }
    }

    tx.commit()?;
    Ok(())
}

/// Column names of an existing table, in declaration order.
fn existing_columns(conn: &Connection, table: Table) -> Result<Option<Vec<String>>, SchemaError> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
    let columns = stmt
        .query_map([table.name()], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(if columns.is_empty() {
        None
    } else {
        Some(columns)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let names = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<String>, _>>()
            .unwrap();
        names
    }

    #[test]
    fn creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();

        let names = table_names(&conn);
        assert_eq!(names.len(), 11);
        for table in Table::ALL {
            assert!(names.contains(&table.name().to_string()), "missing {table}");
        }
    }

    #[test]
    fn ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO files (name, package, syntax) VALUES ('a.proto', 'a', 'proto3')",
            [],
        )
        .unwrap();

        ensure_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1, "second call must not recreate tables");
    }

    #[test]
    fn incompatible_table_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE messages (full_name TEXT PRIMARY KEY, name TEXT)")
            .unwrap();

        let err = ensure_schema(&conn).unwrap_err();
        match err {
            SchemaError::Incompatible { table, found } => {
                assert_eq!(table, Table::Messages);
                assert_eq!(found, "full_name, name");
            }
            other => panic!("unexpected error: {other}"),
        }

        // The transaction was rolled back: `files` is created before
        // `messages` but must not survive the failure.
        assert_eq!(table_names(&conn), vec!["messages".to_string()]);
    }

    #[test]
    fn options_column_rejects_invalid_json() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();

        let bad = conn.execute(
            "INSERT INTO services (full_name, name, file, options) VALUES ('a.S', 'S', \
             'a.proto', 'not json')",
            [],
        );
        assert!(bad.is_err());

        conn.execute(
            "INSERT INTO services (full_name, name, file, options) VALUES ('a.S', 'S', \
             'a.proto', '{\"deprecated\":true}')",
            [],
        )
        .unwrap();
        let deprecated: bool = conn
            .query_row(
                "SELECT options ->> '$.deprecated' FROM services WHERE full_name = 'a.S'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(deprecated);
    }

    #[test]
    fn insert_sql_binds_every_column() {
        let sql = Table::OneofFields.insert_sql();
        assert_eq!(
            sql,
            "INSERT INTO oneof_fields (\"oneof_id\", \"field_id\") VALUES (?1, ?2)"
        );
        for table in Table::ALL {
            let sql = table.insert_sql();
            assert!(sql.contains(&format!("?{}", table.columns().len())));
        }
    }

    #[test]
    fn table_names_round_trip() {
        for table in Table::ALL {
            assert_eq!(Table::from_name(table.name()), Some(table));
        }
        assert_eq!(Table::from_name("nope"), None);
    }
}
