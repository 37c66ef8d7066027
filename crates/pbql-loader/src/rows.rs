//! One struct per output table, in the table's column order.

use pbql_schema::Table;
use rusqlite::{params, Statement};
use serde::Serialize;
use serde_json::Value as Json;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRow {
    pub name: String,
    pub package: String,
    pub syntax: String,
    pub options: Option<Json>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyRow {
    pub file: String,
    pub dependency: String,
    pub is_public: bool,
    pub is_weak: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRow {
    pub full_name: String,
    pub name: String,
    pub file: String,
    pub parent_message: Option<String>,
    pub is_map_entry: bool,
    pub options: Option<Json>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRow {
    pub id: String,
    pub name: String,
    pub number: i32,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub type_name: Option<String>,
    pub label: String,
    pub is_repeated: bool,
    pub is_optional: bool,
    pub is_map: bool,
    pub map_key_type: Option<String>,
    pub map_value_type: Option<String>,
    pub default_value: Option<String>,
    pub json_name: String,
    pub options: Option<Json>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumRow {
    pub full_name: String,
    pub name: String,
    pub file: String,
    pub parent_message: Option<String>,
    pub options: Option<Json>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumValueRow {
    pub id: String,
    pub name: String,
    pub number: i32,
    #[serde(rename = "enum")]
    pub enum_name: String,
    pub options: Option<Json>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRow {
    pub full_name: String,
    pub name: String,
    pub file: String,
    pub options: Option<Json>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodRow {
    pub full_name: String,
    pub name: String,
    pub service: String,
    pub input_type: String,
    pub output_type: String,
    pub client_streaming: bool,
    pub server_streaming: bool,
    pub options: Option<Json>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionRow {
    pub full_name: String,
    pub name: String,
    pub number: i32,
    pub file: String,
    pub extendee: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub type_name: Option<String>,
    pub options: Option<Json>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OneofRow {
    pub id: String,
    pub name: String,
    pub message: String,
    pub options: Option<Json>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OneofFieldRow {
    pub oneof_id: String,
    pub field_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum Row {
    File(FileRow),
    Dependency(DependencyRow),
    Message(MessageRow),
    Field(FieldRow),
    Enum(EnumRow),
    EnumValue(EnumValueRow),
    Service(ServiceRow),
    Method(MethodRow),
    Extension(ExtensionRow),
    Oneof(OneofRow),
    OneofField(OneofFieldRow),
}

impl Row {
    pub fn table(&self) -> Table {
        match self {
            Row::File(_) => Table::Files,
            Row::Dependency(_) => Table::Dependencies,
            Row::Message(_) => Table::Messages,
            Row::Field(_) => Table::Fields,
            Row::Enum(_) => Table::Enums,
            Row::EnumValue(_) => Table::EnumValues,
            Row::Service(_) => Table::Services,
            Row::Method(_) => Table::Methods,
            Row::Extension(_) => Table::Extensions,
            Row::Oneof(_) => Table::Oneofs,
            Row::OneofField(_) => Table::OneofFields,
        }
    }

    /// Primary key as it appears in error messages.
    pub fn key(&self) -> String {
        match self {
            Row::File(r) => r.name.clone(),
            Row::Dependency(r) => format!("({}, {})", r.file, r.dependency),
            Row::Message(r) => r.full_name.clone(),
            Row::Field(r) => r.id.clone(),
            Row::Enum(r) => r.full_name.clone(),
            Row::EnumValue(r) => r.id.clone(),
            Row::Service(r) => r.full_name.clone(),
            Row::Method(r) => r.full_name.clone(),
            Row::Extension(r) => r.full_name.clone(),
            Row::Oneof(r) => r.id.clone(),
            Row::OneofField(r) => format!("({}, {})", r.oneof_id, r.field_id),
        }
    }

    /// Execute `stmt`, prepared from [`Table::insert_sql`] for this row's table.
    pub(crate) fn insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        match self {
            Row::File(r) => {
                stmt.execute(params![r.name, r.package, r.syntax, json_text(&r.options)])
            }
            Row::Dependency(r) => {
                stmt.execute(params![r.file, r.dependency, r.is_public, r.is_weak])
            }
            Row::Message(r) => stmt.execute(params![
                r.full_name,
                r.name,
                r.file,
                r.parent_message,
                r.is_map_entry,
                json_text(&r.options),
            ]),
            Row::Field(r) => stmt.execute(params![
                r.id,
                r.name,
                r.number,
                r.message,
                r.kind,
                r.type_name,
                r.label,
                r.is_repeated,
                r.is_optional,
                r.is_map,
                r.map_key_type,
                r.map_value_type,
                r.default_value,
                r.json_name,
                json_text(&r.options),
            ]),
            Row::Enum(r) => stmt.execute(params![
                r.full_name,
                r.name,
                r.file,
                r.parent_message,
                json_text(&r.options),
            ]),
            Row::EnumValue(r) => stmt.execute(params![
                r.id,
                r.name,
                r.number,
                r.enum_name,
                json_text(&r.options),
            ]),
            Row::Service(r) => {
                stmt.execute(params![r.full_name, r.name, r.file, json_text(&r.options)])
            }
            Row::Method(r) => stmt.execute(params![
                r.full_name,
                r.name,
                r.service,
                r.input_type,
                r.output_type,
                r.client_streaming,
                r.server_streaming,
                json_text(&r.options),
            ]),
            Row::Extension(r) => stmt.execute(params![
                r.full_name,
                r.name,
                r.number,
                r.file,
                r.extendee,
                r.kind,
                r.type_name,
                json_text(&r.options),
            ]),
            Row::Oneof(r) => stmt.execute(params![r.id, r.name, r.message, json_text(&r.options)]),
            Row::OneofField(r) => stmt.execute(params![r.oneof_id, r.field_id]),
        }
    }
}

fn json_text(options: &Option<Json>) -> Option<String> {
    options.as_ref().map(Json::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_keys_name_both_columns() {
        let row = Row::Dependency(DependencyRow {
            file: "a.proto".into(),
            dependency: "b.proto".into(),
            is_public: true,
            is_weak: false,
        });
        assert_eq!(row.table(), Table::Dependencies);
        assert_eq!(row.key(), "(a.proto, b.proto)");
    }

    #[test]
    fn serializes_with_column_names() {
        let row = Row::EnumValue(EnumValueRow {
            id: "acme.Tier.TIER_PRO".into(),
            name: "TIER_PRO".into(),
            number: 1,
            enum_name: "acme.Tier".into(),
            options: None,
        });
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["table"], "enum_value");
        assert_eq!(json["enum"], "acme.Tier");
        assert!(json["options"].is_null());
    }
}
