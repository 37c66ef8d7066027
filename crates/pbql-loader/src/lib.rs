//! Flattens resolved protobuf descriptors into the relational tables of
//! [`pbql_schema`].
//!
//! ```text
//! FileDescriptor* ──► load_batch ──► BatchWriter ──► SQLite tables
//!                        │                 (one transaction)
//!                        └─ encode_options: DynamicMessage → JSON
//! ```
//!
//! A batch is atomic: rows are queued in a writer and only become visible when
//! the whole batch was emitted and the writer flushed.

pub mod encode;
pub mod engine;
pub mod error;
pub mod rows;
pub mod sink;
pub mod store;

pub use encode::encode_options;
pub use engine::{load_batch, load_batch_with_imports, LoadStats};
pub use error::{LoadError, SinkError, StoreError};
pub use rows::Row;
pub use sink::{BatchWriter, MemoryStore, MemoryWriter, SqliteWriter};
pub use store::{LoadOptions, Store};
