//! Batch-scoped, name-indexed registry of types.
//!
//! The registry answers the questions the options machinery needs: what is
//! extension `acme.v1.http`, which field of `google.protobuf.FileOptions` is
//! `javaPackage`, and what is the name of value `2` of enum `acme.v1.Tier`.
//! It owns copies of what it indexes, so it can be built before descriptors
//! are finalized and outlives none of them.

use crate::model::{ExtensionDescriptor, FieldDescriptor, FileDescriptor, MessageDescriptor};
use crate::value::FieldInfo;
use crate::well_known;
use std::collections::HashMap;

/// Name resolution used by the options encoder and the descriptor reader.
pub trait Resolver {
    /// Extension declaration by fully-qualified name.
    fn find_extension(&self, full_name: &str) -> Option<&FieldInfo>;

    /// Field of `message` by declared name or JSON name.
    fn find_field(&self, message: &str, key: &str) -> Option<&FieldInfo>;

    /// Name of the first value of `enum_name` with this number.
    fn enum_value_name(&self, enum_name: &str, number: i32) -> Option<&str>;

    fn enum_value_number(&self, enum_name: &str, name: &str) -> Option<i32>;
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    messages: HashMap<String, Vec<FieldInfo>>,
    enums: HashMap<String, Vec<(String, i32)>>,
    extensions: HashMap<String, FieldInfo>,
}

impl Registry {
    /// Registry seeded with the standard options messages of
    /// `google/protobuf/descriptor.proto`.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        well_known::seed(&mut registry);
        registry
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry covering every type declared in `files`.
    pub fn from_files(files: &[FileDescriptor]) -> Self {
        let mut registry = Self::new();
        for file in files {
            registry.add_file(file);
        }
        tracing::debug!(
            messages = registry.messages.len(),
            enums = registry.enums.len(),
            extensions = registry.extensions.len(),
            "built type registry"
        );
        registry
    }

    pub fn add_file(&mut self, file: &FileDescriptor) {
        for message in &file.messages {
            self.add_message(message);
        }
        for e in &file.enums {
            self.register_enum(
                &e.full_name,
                e.values.iter().map(|v| (v.name.clone(), v.number)).collect(),
            );
        }
        for ext in &file.extensions {
            self.register_extension(extension_info(ext));
        }
    }

    fn add_message(&mut self, message: &MessageDescriptor) {
        self.register_message(
            &message.full_name,
            message
                .fields
                .iter()
                .map(|f| field_info(&message.full_name, f))
                .collect(),
        );
        for nested in &message.messages {
            self.add_message(nested);
        }
        for e in &message.enums {
            self.register_enum(
                &e.full_name,
                e.values.iter().map(|v| (v.name.clone(), v.number)).collect(),
            );
        }
        for ext in &message.extensions {
            self.register_extension(extension_info(ext));
        }
    }

    /// Later registrations replace earlier ones with the same name, so a
    /// batch that ships `descriptor.proto` overrides the built-in seed.
    pub fn register_message(&mut self, full_name: &str, fields: Vec<FieldInfo>) {
        self.messages.insert(full_name.to_string(), fields);
    }

    pub fn register_enum(&mut self, full_name: &str, values: Vec<(String, i32)>) {
        self.enums.insert(full_name.to_string(), values);
    }

    pub fn register_extension(&mut self, info: FieldInfo) {
        let info = info.extension();
        self.extensions.insert(info.full_name.clone(), info);
    }

    pub fn contains_message(&self, full_name: &str) -> bool {
        self.messages.contains_key(full_name)
    }

    pub fn contains_enum(&self, full_name: &str) -> bool {
        self.enums.contains_key(full_name)
    }
}

impl Resolver for Registry {
    fn find_extension(&self, full_name: &str) -> Option<&FieldInfo> {
        self.extensions.get(full_name)
    }

    fn find_field(&self, message: &str, key: &str) -> Option<&FieldInfo> {
        self.messages
            .get(message)?
            .iter()
            .find(|f| f.name == key || f.json_name == key)
    }

    fn enum_value_name(&self, enum_name: &str, number: i32) -> Option<&str> {
        self.enums
            .get(enum_name)?
            .iter()
            .find(|(_, n)| *n == number)
            .map(|(name, _)| name.as_str())
    }

    fn enum_value_number(&self, enum_name: &str, name: &str) -> Option<i32> {
        self.enums
            .get(enum_name)?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, number)| *number)
    }
}

/// Options-side view of a message field.
pub fn field_info(message: &str, field: &FieldDescriptor) -> FieldInfo {
    FieldInfo {
        name: field.name.clone(),
        full_name: crate::model::qualify(message, &field.name),
        json_name: field.json_name.clone(),
        number: field.number,
        kind: field.kind,
        type_name: field.type_name.clone(),
        is_list: field.is_repeated() && !field.is_map(),
        map: field.map_entry.clone(),
        is_extension: false,
    }
}

pub fn extension_info(ext: &ExtensionDescriptor) -> FieldInfo {
    FieldInfo {
        name: ext.name.clone(),
        full_name: ext.full_name.clone(),
        json_name: ext.json_name.clone(),
        number: ext.number,
        kind: ext.kind,
        type_name: ext.type_name.clone(),
        is_list: ext.cardinality == crate::model::Cardinality::Repeated,
        map: None,
        is_extension: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cardinality, EnumDescriptor, EnumValueDescriptor, Kind};

    fn tier_enum() -> EnumDescriptor {
        EnumDescriptor {
            name: "Tier".into(),
            full_name: "acme.v1.Tier".into(),
            values: vec![
                EnumValueDescriptor {
                    name: "TIER_FREE".into(),
                    number: 0,
                    options: None,
                },
                EnumValueDescriptor {
                    name: "TIER_PRO".into(),
                    number: 1,
                    options: None,
                },
                EnumValueDescriptor {
                    name: "TIER_PAID".into(),
                    number: 1,
                    options: None,
                },
            ],
            options: None,
        }
    }

    #[test]
    fn resolves_enum_values_first_alias_wins() {
        let file = FileDescriptor {
            path: "acme/v1/tier.proto".into(),
            package: "acme.v1".into(),
            enums: vec![tier_enum()],
            ..Default::default()
        };
        let registry = Registry::from_files(&[file]);

        assert_eq!(registry.enum_value_name("acme.v1.Tier", 1), Some("TIER_PRO"));
        assert_eq!(registry.enum_value_name("acme.v1.Tier", 9), None);
        assert_eq!(registry.enum_value_number("acme.v1.Tier", "TIER_PAID"), Some(1));
        assert_eq!(registry.enum_value_name("acme.v1.Missing", 0), None);
    }

    #[test]
    fn nested_extensions_are_indexed() {
        let ext = ExtensionDescriptor {
            name: "owner".into(),
            full_name: "acme.v1.Holder.owner".into(),
            number: 50100,
            extendee: "google.protobuf.MessageOptions".into(),
            kind: Kind::String,
            type_name: None,
            cardinality: Cardinality::Optional,
            json_name: "owner".into(),
            options: None,
        };
        let holder = MessageDescriptor {
            name: "Holder".into(),
            full_name: "acme.v1.Holder".into(),
            extensions: vec![ext],
            ..Default::default()
        };
        let file = FileDescriptor {
            path: "acme/v1/holder.proto".into(),
            package: "acme.v1".into(),
            messages: vec![holder],
            ..Default::default()
        };
        let registry = Registry::from_files(&[file]);

        let info = registry.find_extension("acme.v1.Holder.owner").unwrap();
        assert!(info.is_extension);
        assert_eq!(info.key(), "acme.v1.Holder.owner");
        assert!(registry.contains_message("acme.v1.Holder"));
    }

    #[test]
    fn standard_options_are_seeded() {
        let registry = Registry::new();
        let by_json = registry
            .find_field("google.protobuf.FileOptions", "javaPackage")
            .unwrap();
        assert_eq!(by_json.name, "java_package");
        let by_name = registry
            .find_field("google.protobuf.FileOptions", "optimize_for")
            .unwrap();
        assert_eq!(by_name.kind, Kind::Enum);
        assert_eq!(
            registry.enum_value_name("google.protobuf.FileOptions.OptimizeMode", 3),
            Some("LITE_RUNTIME")
        );
    }
}
