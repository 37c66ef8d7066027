//! SQLite-backed store: schema on open, one transaction per batch.

use crate::engine::{load_batch_with_imports, LoadStats};
use crate::error::{LoadError, StoreError};
use crate::sink::SqliteWriter;
use pbql_descriptor::FileDescriptor;
use pbql_schema::Table;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a [`Store`] prepares its connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Create missing tables on open.
    pub create_schema: bool,
    /// Apply the write-throughput pragmas on open.
    pub apply_pragmas: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            create_schema: true,
            apply_pragmas: true,
        }
    }
}

const PRAGMAS: &[(&str, &str)] = &[
    ("synchronous", "NORMAL"),
    ("temp_store", "MEMORY"),
    ("cache_size", "-16000"),
];

pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::open_with(None, &LoadOptions::default())
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with(Some(path.as_ref()), &LoadOptions::default())
    }

    pub fn open_with(path: Option<&Path>, options: &LoadOptions) -> Result<Self, StoreError> {
        let conn = match path {
            Some(p) => Connection::open(p),
            None => Connection::open_in_memory(),
        }
        .map_err(|source| StoreError::Open {
            path: path.map_or_else(|| ":memory:".to_string(), |p| p.display().to_string()),
            source,
        })?;

        if options.apply_pragmas {
            apply_pragmas(&conn, path.is_some())?;
        }
        if options.create_schema {
            pbql_schema::ensure_schema(&conn)?;
        }

        tracing::debug!(path = ?path, "opened store");
        Ok(Self {
            conn,
            path: path.map(Path::to_path_buf),
        })
    }

    /// Flatten `files` as one batch. On error no row of the batch is kept.
    pub fn load_batch(&mut self, files: &[FileDescriptor]) -> Result<LoadStats, LoadError> {
        self.load_batch_with_imports(files, &[])
    }

    /// Flatten `files` as one batch, resolving option types against
    /// `imports` as well. Imports produce no rows.
    pub fn load_batch_with_imports(
        &mut self,
        files: &[FileDescriptor],
        imports: &[FileDescriptor],
    ) -> Result<LoadStats, LoadError> {
        let writer = SqliteWriter::begin(&mut self.conn).map_err(LoadError::Open)?;
        load_batch_with_imports(writer, files, imports)
    }

    /// Connection for ad-hoc queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn row_count(&self, table: Table) -> rusqlite::Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn apply_pragmas(conn: &Connection, on_disk: bool) -> Result<(), StoreError> {
    for &(pragma, value) in PRAGMAS {
        conn.pragma_update(None, pragma, value)
            .map_err(|source| StoreError::Pragma { pragma, source })?;
    }
    if on_disk {
        // journal_mode answers with the mode actually in effect.
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(|source| StoreError::Pragma {
                pragma: "journal_mode",
                source,
            })?;
        if !mode.eq_ignore_ascii_case("wal") {
            tracing::warn!(mode = %mode, "database did not switch to WAL journaling");
        }
    }
    Ok(())
}
