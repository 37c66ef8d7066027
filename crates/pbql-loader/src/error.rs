use pbql_schema::{SchemaError, Table};
use thiserror::Error;

/// A batch writer rejected a row or could not be opened or flushed.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("duplicate {table} key {key}")]
    DuplicateKey { table: Table, key: String },

    #[error("sqlite error")]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open batch writer")]
    Open(#[source] SinkError),

    #[error("{file}: failed to append {table} row {key}")]
    Append {
        file: String,
        table: Table,
        key: String,
        #[source]
        source: SinkError,
    },

    #[error("{file}: field {field} refers to oneof #{index}, but {message} declares {declared}")]
    DanglingOneof {
        file: String,
        field: String,
        index: usize,
        message: String,
        declared: usize,
    },

    #[error("failed to flush batch")]
    Flush(#[source] SinkError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database {path}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("failed to apply pragma {pragma}")]
    Pragma {
        pragma: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn messages_leave_the_cause_to_the_source_chain() {
        let err = LoadError::Append {
            file: "acme/v1/a.proto".into(),
            table: Table::Files,
            key: "acme/v1/a.proto".into(),
            source: SinkError::DuplicateKey {
                table: Table::Files,
                key: "acme/v1/a.proto".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "acme/v1/a.proto: failed to append files row acme/v1/a.proto"
        );
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("duplicate files key acme/v1/a.proto")
        );

        let flush = LoadError::Flush(SinkError::Sqlite(rusqlite::Error::InvalidQuery));
        assert_eq!(flush.to_string(), "failed to flush batch");
        assert_eq!(flush.source().map(ToString::to_string).as_deref(), Some("sqlite error"));
    }
}
