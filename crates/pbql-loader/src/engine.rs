//! Descriptor tree → rows.
//!
//! The walk is depth-first in declaration order. For each file:
//!
//! ```text
//! File
//!   Dependency*               one per import
//!   Message*                  recursive, see below
//!   Enum* (EnumValue*)
//!   Service* (Method*)
//!   Extension*
//!
//! Message
//!   Oneof*                    synthetic oneofs skipped
//!   Field* (OneofField?)      link only to a non-synthetic oneof
//!   Message* Enum* Extension* nested, same file path, parent = this message
//! ```

use crate::encode::encode_options;
use crate::error::LoadError;
use crate::rows::*;
use crate::sink::BatchWriter;
use pbql_descriptor::model::qualify;
use pbql_descriptor::{
    EnumDescriptor, ExtensionDescriptor, FieldDescriptor, FileDescriptor, MessageDescriptor,
    Registry, Resolver, ServiceDescriptor,
};
use pbql_schema::Table;
use serde::Serialize;
use std::collections::BTreeMap;

/// Rows written per table by one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub rows: BTreeMap<Table, usize>,
}

impl LoadStats {
    pub fn rows(&self, table: Table) -> usize {
        self.rows.get(&table).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.rows.values().sum()
    }

    fn record(&mut self, table: Table) {
        *self.rows.entry(table).or_insert(0) += 1;
    }
}

/// Flatten `files` into `writer` as one atomic batch.
///
/// Nothing is visible unless every row was accepted and the writer flushed.
/// On error the writer is dropped unflushed, discarding the queued rows.
pub fn load_batch<W: BatchWriter>(
    writer: W,
    files: &[FileDescriptor],
) -> Result<LoadStats, LoadError> {
    load_batch_with_imports(writer, files, &[])
}

/// Like [`load_batch`], but `imports` only take part in name resolution.
///
/// Their messages, enums and extensions type the options of `files`; none of
/// their own rows are written.
pub fn load_batch_with_imports<W: BatchWriter>(
    mut writer: W,
    files: &[FileDescriptor],
    imports: &[FileDescriptor],
) -> Result<LoadStats, LoadError> {
    let mut stats = LoadStats::default();
    if files.is_empty() {
        writer.flush().map_err(LoadError::Flush)?;
        return Ok(stats);
    }

    let mut registry = Registry::from_files(imports);
    for file in files {
        registry.add_file(file);
    }
    for file in files {
        let mut emitter = Emitter {
            writer: &mut writer,
            resolver: &registry,
            file: &file.path,
            stats: &mut stats,
        };
        emitter.file(file)?;
        tracing::debug!(file = %file.path, "flattened file");
    }

    writer.flush().map_err(LoadError::Flush)?;

    tracing::info!(
        files = files.len(),
        imports = imports.len(),
        messages = stats.rows(Table::Messages),
        fields = stats.rows(Table::Fields),
        enums = stats.rows(Table::Enums),
        services = stats.rows(Table::Services),
        rows = stats.total(),
        "loaded descriptor batch"
    );
    Ok(stats)
}

struct Emitter<'a, W> {
    writer: &'a mut W,
    resolver: &'a dyn Resolver,
    /// Path of the root file; nested entries carry it too.
    file: &'a str,
    stats: &'a mut LoadStats,
}

impl<W: BatchWriter> Emitter<'_, W> {
    fn emit(&mut self, row: Row) -> Result<(), LoadError> {
        let table = row.table();
        let key = row.key();
        self.writer
            .append(row)
            .map_err(|source| LoadError::Append {
                file: self.file.to_string(),
                table,
                key,
                source,
            })?;
        self.stats.record(table);
        Ok(())
    }

    fn options(
        &self,
        options: Option<&pbql_descriptor::DynamicMessage>,
    ) -> Option<serde_json::Value> {
        encode_options(options, self.resolver)
    }

    fn file(&mut self, file: &FileDescriptor) -> Result<(), LoadError> {
        self.emit(Row::File(FileRow {
            name: file.path.clone(),
            package: file.package.clone(),
            syntax: file.syntax.as_str().to_string(),
            options: self.options(file.options.as_ref()),
        }))?;

        for import in &file.imports {
            self.emit(Row::Dependency(DependencyRow {
                file: file.path.clone(),
                dependency: import.path.clone(),
                is_public: import.is_public,
                is_weak: import.is_weak,
            }))?;
        }

        for message in &file.messages {
            self.message(message, None)?;
        }
        for e in &file.enums {
            self.enumeration(e, None)?;
        }
        for service in &file.services {
            self.service(service)?;
        }
        for ext in &file.extensions {
            self.extension(ext)?;
        }
        Ok(())
    }

    fn message(
        &mut self,
        message: &MessageDescriptor,
        parent: Option<&str>,
    ) -> Result<(), LoadError> {
        self.emit(Row::Message(MessageRow {
            full_name: message.full_name.clone(),
            name: message.name.clone(),
            file: self.file.to_string(),
            parent_message: parent.map(str::to_string),
            is_map_entry: message.is_map_entry,
            options: self.options(message.options.as_ref()),
        }))?;

        // Positional: index i holds the id of oneof i, None if synthetic.
        let mut oneof_ids = Vec::with_capacity(message.oneofs.len());
        for oneof in &message.oneofs {
            if oneof.is_synthetic {
                oneof_ids.push(None);
                continue;
            }
            let id = qualify(&message.full_name, &oneof.name);
            self.emit(Row::Oneof(OneofRow {
                id: id.clone(),
                name: oneof.name.clone(),
                message: message.full_name.clone(),
                options: self.options(oneof.options.as_ref()),
            }))?;
            oneof_ids.push(Some(id));
        }

        for field in &message.fields {
            let field_id = self.field(message, field)?;
            let Some(index) = field.oneof_index else {
                continue;
            };
            match oneof_ids.get(index) {
                Some(Some(oneof_id)) => self.emit(Row::OneofField(OneofFieldRow {
                    oneof_id: oneof_id.clone(),
                    field_id,
                }))?,
                Some(None) => {}
                None => {
                    return Err(LoadError::DanglingOneof {
                        file: self.file.to_string(),
                        field: field_id,
                        index,
                        message: message.full_name.clone(),
                        declared: message.oneofs.len(),
                    })
                }
            }
        }

        for nested in &message.messages {
            self.message(nested, Some(&message.full_name))?;
        }
        for e in &message.enums {
            self.enumeration(e, Some(&message.full_name))?;
        }
        for ext in &message.extensions {
            self.extension(ext)?;
        }
        Ok(())
    }

    fn field(
        &mut self,
        message: &MessageDescriptor,
        field: &FieldDescriptor,
    ) -> Result<String, LoadError> {
        let id = qualify(&message.full_name, &field.name);
        let map = field.map_entry.as_ref();
        self.emit(Row::Field(FieldRow {
            id: id.clone(),
            name: field.name.clone(),
            number: field.number,
            message: message.full_name.clone(),
            kind: field.kind.as_str().to_string(),
            type_name: field.type_name.clone(),
            label: field.cardinality.as_str().to_string(),
            // Map fields are repeated on the wire but not lists.
            is_repeated: field.is_repeated() && !field.is_map(),
            is_optional: field.has_optional_keyword,
            is_map: field.is_map(),
            map_key_type: map.map(|m| m.key_kind.as_str().to_string()),
            map_value_type: map.map(|m| m.value_type()),
            default_value: field.default_value.clone(),
            json_name: field.json_name.clone(),
            options: self.options(field.options.as_ref()),
        }))?;
        Ok(id)
    }

    fn enumeration(&mut self, e: &EnumDescriptor, parent: Option<&str>) -> Result<(), LoadError> {
        self.emit(Row::Enum(EnumRow {
            full_name: e.full_name.clone(),
            name: e.name.clone(),
            file: self.file.to_string(),
            parent_message: parent.map(str::to_string),
            options: self.options(e.options.as_ref()),
        }))?;
        for value in &e.values {
            self.emit(Row::EnumValue(EnumValueRow {
                id: qualify(&e.full_name, &value.name),
                name: value.name.clone(),
                number: value.number,
                enum_name: e.full_name.clone(),
                options: self.options(value.options.as_ref()),
            }))?;
        }
        Ok(())
    }

    fn service(&mut self, service: &ServiceDescriptor) -> Result<(), LoadError> {
        self.emit(Row::Service(ServiceRow {
            full_name: service.full_name.clone(),
            name: service.name.clone(),
            file: self.file.to_string(),
            options: self.options(service.options.as_ref()),
        }))?;
        for method in &service.methods {
            self.emit(Row::Method(MethodRow {
                full_name: qualify(&service.full_name, &method.name),
                name: method.name.clone(),
                service: service.full_name.clone(),
                input_type: method.input_type.clone(),
                output_type: method.output_type.clone(),
                client_streaming: method.client_streaming,
                server_streaming: method.server_streaming,
                options: self.options(method.options.as_ref()),
            }))?;
        }
        Ok(())
    }

    fn extension(&mut self, ext: &ExtensionDescriptor) -> Result<(), LoadError> {
        self.emit(Row::Extension(ExtensionRow {
            full_name: ext.full_name.clone(),
            name: ext.name.clone(),
            number: ext.number,
            file: self.file.to_string(),
            extendee: ext.extendee.clone(),
            kind: ext.kind.as_str().to_string(),
            type_name: ext.type_name.clone(),
            options: self.options(ext.options.as_ref()),
        }))
    }
}
