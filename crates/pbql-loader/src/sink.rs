//! Batch writers: where flattened rows go.
//!
//! A writer queues rows and makes them visible only on [`BatchWriter::flush`].
//! Dropping a writer without flushing discards everything it queued, which is
//! what makes a failed batch leave no rows behind.

use crate::error::SinkError;
use crate::rows::Row;
use pbql_schema::Table;
use rusqlite::{Connection, Transaction};
use std::collections::{BTreeMap, HashSet};

pub trait BatchWriter {
    /// Queue one row. Rejects a row whose key is already present.
    fn append(&mut self, row: Row) -> Result<(), SinkError>;

    /// Make every queued row visible, all at once.
    fn flush(self) -> Result<(), SinkError>
    where
        Self: Sized;
}

// =============================================================================
// SQLite
// =============================================================================

/// Writer over one SQLite transaction.
///
/// The insert statement of every table is prepared when the writer opens and
/// stays in the connection's statement cache for the whole batch. Commit is
/// the flush; drop without commit rolls back.
pub struct SqliteWriter<'conn> {
    tx: Transaction<'conn>,
    insert_sql: BTreeMap<Table, String>,
}

impl<'conn> SqliteWriter<'conn> {
    pub fn begin(conn: &'conn mut Connection) -> Result<Self, SinkError> {
        let tx = conn.transaction()?;
        let mut insert_sql = BTreeMap::new();
        for table in Table::ALL {
            let sql = table.insert_sql();
            tx.prepare_cached(&sql)?;
            insert_sql.insert(table, sql);
        }
        Ok(Self { tx, insert_sql })
    }
}

impl BatchWriter for SqliteWriter<'_> {
    fn append(&mut self, row: Row) -> Result<(), SinkError> {
        let table = row.table();
        let sql = self
            .insert_sql
            .entry(table)
            .or_insert_with(|| table.insert_sql());
        let mut stmt = self.tx.prepare_cached(sql)?;
        match row.insert(&mut stmt) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Err(SinkError::DuplicateKey {
                    table,
                    key: row.key(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn flush(self) -> Result<(), SinkError> {
        self.tx.commit()?;
        Ok(())
    }
}

// =============================================================================
// In memory
// =============================================================================

/// Row store without a database, keyed like the SQLite tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: BTreeMap<Table, Vec<Row>>,
    keys: HashSet<(Table, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writer(&mut self) -> MemoryWriter<'_> {
        MemoryWriter {
            store: self,
            staged: Vec::new(),
            staged_keys: HashSet::new(),
        }
    }

    pub fn rows(&self, table: Table) -> &[Row] {
        self.rows.get(&table).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn total_rows(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }
}

pub struct MemoryWriter<'a> {
    store: &'a mut MemoryStore,
    staged: Vec<Row>,
    staged_keys: HashSet<(Table, String)>,
}

impl BatchWriter for MemoryWriter<'_> {
    fn append(&mut self, row: Row) -> Result<(), SinkError> {
        let key = (row.table(), row.key());
        if self.store.keys.contains(&key) || !self.staged_keys.insert(key.clone()) {
            return Err(SinkError::DuplicateKey {
                table: key.0,
                key: key.1,
            });
        }
        self.staged.push(row);
        Ok(())
    }

    fn flush(self) -> Result<(), SinkError> {
        self.store.keys.extend(self.staged_keys);
        for row in self.staged {
            self.store.rows.entry(row.table()).or_default().push(row);
        }
        Ok(())
    }
}
