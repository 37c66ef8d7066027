//! The eleven output tables and their DDL.
//!
//! Column order in [`Table::columns`] is the insert order used by the loader
//! and must match the DDL. `options` columns hold JSON text; there are no
//! foreign keys, relationships between tables are by-name joins only:
//!
//! ```text
//! files.name            <- messages.file, enums.file, services.file,
//!                          extensions.file, dependencies.file
//! messages.full_name    <- fields.message, oneofs.message,
//!                          messages.parent_message, enums.parent_message
//! enums.full_name       <- enum_values.enum
//! services.full_name    <- methods.service
//! oneofs.id, fields.id  <- oneof_fields.oneof_id, oneof_fields.field_id
//! ```

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Files,
    Dependencies,
    Messages,
    Fields,
    Enums,
    EnumValues,
    Services,
    Methods,
    Extensions,
    Oneofs,
    OneofFields,
}

impl Table {
    /// Every table, in creation order.
    pub const ALL: [Table; 11] = [
        Table::Files,
        Table::Messages,
        Table::Fields,
        Table::Enums,
        Table::EnumValues,
        Table::Services,
        Table::Methods,
        Table::Extensions,
        Table::Oneofs,
        Table::OneofFields,
        Table::Dependencies,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::Files => "files",
            Table::Dependencies => "dependencies",
            Table::Messages => "messages",
            Table::Fields => "fields",
            Table::Enums => "enums",
            Table::EnumValues => "enum_values",
            Table::Services => "services",
            Table::Methods => "methods",
            Table::Extensions => "extensions",
            Table::Oneofs => "oneofs",
            Table::OneofFields => "oneof_fields",
        }
    }

    pub fn from_name(name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Table::Files => &["name", "package", "syntax", "options"],
            Table::Dependencies => &["file", "dependency", "is_public", "is_weak"],
            Table::Messages => &[
                "full_name",
                "name",
                "file",
                "parent_message",
                "is_map_entry",
                "options",
            ],
            Table::Fields => &[
                "id",
                "name",
                "number",
                "message",
                "type",
                "type_name",
                "label",
                "is_repeated",
                "is_optional",
                "is_map",
                "map_key_type",
                "map_value_type",
                "default_value",
                "json_name",
                "options",
            ],
            Table::Enums => &["full_name", "name", "file", "parent_message", "options"],
            Table::EnumValues => &["id", "name", "number", "enum", "options"],
            Table::Services => &["full_name", "name", "file", "options"],
            Table::Methods => &[
                "full_name",
                "name",
                "service",
                "input_type",
                "output_type",
                "client_streaming",
                "server_streaming",
                "options",
            ],
            Table::Extensions => &[
                "full_name",
                "name",
                "number",
                "file",
                "extendee",
                "type",
                "type_name",
                "options",
            ],
            Table::Oneofs => &["id", "name", "message", "options"],
            Table::OneofFields => &["oneof_id", "field_id"],
        }
    }

    /// `INSERT` statement binding every column in [`Table::columns`] order.
    pub fn insert_sql(self) -> String {
        let columns = self.columns();
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let quoted = columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({quoted}) VALUES ({placeholders})",
            self.name()
        )
    }

    pub fn ddl(self) -> &'static str {
        match self {
            Table::Files => {
                "CREATE TABLE IF NOT EXISTS files (
                    name TEXT NOT NULL PRIMARY KEY,
                    package TEXT,
                    syntax TEXT,
                    options TEXT CHECK (options IS NULL OR json_valid(options))
                )"
            }
            Table::Messages => {
                "CREATE TABLE IF NOT EXISTS messages (
                    full_name TEXT NOT NULL PRIMARY KEY,
                    name TEXT NOT NULL,
                    file TEXT NOT NULL,
                    parent_message TEXT,
                    is_map_entry BOOLEAN NOT NULL DEFAULT FALSE,
                    options TEXT CHECK (options IS NULL OR json_valid(options))
                )"
            }
            Table::Fields => {
                "CREATE TABLE IF NOT EXISTS fields (
                    id TEXT NOT NULL PRIMARY KEY,
                    name TEXT NOT NULL,
                    number INTEGER NOT NULL,
                    message TEXT NOT NULL,
                    type TEXT NOT NULL,
                    type_name TEXT,
                    label TEXT,
                    is_repeated BOOLEAN NOT NULL DEFAULT FALSE,
                    is_optional BOOLEAN NOT NULL DEFAULT FALSE,
                    is_map BOOLEAN NOT NULL DEFAULT FALSE,
                    map_key_type TEXT,
                    map_value_type TEXT,
                    default_value TEXT,
                    json_name TEXT,
                    options TEXT CHECK (options IS NULL OR json_valid(options))
                )"
            }
            Table::Enums => {
                "CREATE TABLE IF NOT EXISTS enums (
                    full_name TEXT NOT NULL PRIMARY KEY,
                    name TEXT NOT NULL,
                    file TEXT NOT NULL,
                    parent_message TEXT,
                    options TEXT CHECK (options IS NULL OR json_valid(options))
                )"
            }
            Table::EnumValues => {
                "CREATE TABLE IF NOT EXISTS enum_values (
                    id TEXT NOT NULL PRIMARY KEY,
                    name TEXT NOT NULL,
                    number INTEGER NOT NULL,
                    enum TEXT NOT NULL,
                    options TEXT CHECK (options IS NULL OR json_valid(options))
                )"
            }
            Table::Services => {
                "CREATE TABLE IF NOT EXISTS services (
                    full_name TEXT NOT NULL PRIMARY KEY,
                    name TEXT NOT NULL,
                    file TEXT NOT NULL,
                    options TEXT CHECK (options IS NULL OR json_valid(options))
                )"
            }
            Table::Methods => {
                "CREATE TABLE IF NOT EXISTS methods (
                    full_name TEXT NOT NULL PRIMARY KEY,
                    name TEXT NOT NULL,
                    service TEXT NOT NULL,
                    input_type TEXT NOT NULL,
                    output_type TEXT NOT NULL,
                    client_streaming BOOLEAN NOT NULL DEFAULT FALSE,
                    server_streaming BOOLEAN NOT NULL DEFAULT FALSE,
                    options TEXT CHECK (options IS NULL OR json_valid(options))
                )"
            }
            Table::Extensions => {
                "CREATE TABLE IF NOT EXISTS extensions (
                    full_name TEXT NOT NULL PRIMARY KEY,
                    name TEXT NOT NULL,
                    number INTEGER NOT NULL,
                    file TEXT NOT NULL,
                    extendee TEXT NOT NULL,
                    type TEXT NOT NULL,
                    type_name TEXT,
                    options TEXT CHECK (options IS NULL OR json_valid(options))
                )"
            }
            Table::Oneofs => {
                "CREATE TABLE IF NOT EXISTS oneofs (
                    id TEXT NOT NULL PRIMARY KEY,
                    name TEXT NOT NULL,
                    message TEXT NOT NULL,
                    options TEXT CHECK (options IS NULL OR json_valid(options))
                )"
            }
            Table::OneofFields => {
                "CREATE TABLE IF NOT EXISTS oneof_fields (
                    oneof_id TEXT NOT NULL,
                    field_id TEXT NOT NULL,
                    PRIMARY KEY (oneof_id, field_id)
                )"
            }
            Table::Dependencies => {
                "CREATE TABLE IF NOT EXISTS dependencies (
                    file TEXT NOT NULL,
                    dependency TEXT NOT NULL,
                    is_public BOOLEAN NOT NULL DEFAULT FALSE,
                    is_weak BOOLEAN NOT NULL DEFAULT FALSE,
                    PRIMARY KEY (file, dependency)
                )"
            }
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
