//! Resolved descriptor tree.
//!
//! Every type reference is a fully-qualified name without the leading dot.
//! Nothing here points at another descriptor: cross references are resolved by
//! name through a [`crate::Registry`].

use crate::value::DynamicMessage;
use serde::Serialize;
use std::fmt;

// =============================================================================
// Enumerations
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Syntax {
    #[default]
    Proto2,
    Proto3,
    Editions,
}

impl Syntax {
    pub fn as_str(self) -> &'static str {
        match self {
            Syntax::Proto2 => "proto2",
            Syntax::Proto3 => "proto3",
            Syntax::Editions => "editions",
        }
    }
}

/// Wire kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Double,
    Float,
    Int64,
    Uint64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Group,
    Message,
    Bytes,
    Uint32,
    Enum,
    Sfixed32,
    Sfixed64,
    Sint32,
    Sint64,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Double => "double",
            Kind::Float => "float",
            Kind::Int64 => "int64",
            Kind::Uint64 => "uint64",
            Kind::Int32 => "int32",
            Kind::Fixed64 => "fixed64",
            Kind::Fixed32 => "fixed32",
            Kind::Bool => "bool",
            Kind::String => "string",
            Kind::Group => "group",
            Kind::Message => "message",
            Kind::Bytes => "bytes",
            Kind::Uint32 => "uint32",
            Kind::Enum => "enum",
            Kind::Sfixed32 => "sfixed32",
            Kind::Sfixed64 => "sfixed64",
            Kind::Sint32 => "sint32",
            Kind::Sint64 => "sint64",
        }
    }

    /// Parse a `FieldDescriptorProto.Type` name (`TYPE_INT32`).
    pub fn from_descriptor_type(s: &str) -> Option<Kind> {
        let kind = match s {
            "TYPE_DOUBLE" => Kind::Double,
            "TYPE_FLOAT" => Kind::Float,
            "TYPE_INT64" => Kind::Int64,
            "TYPE_UINT64" => Kind::Uint64,
            "TYPE_INT32" => Kind::Int32,
            "TYPE_FIXED64" => Kind::Fixed64,
            "TYPE_FIXED32" => Kind::Fixed32,
            "TYPE_BOOL" => Kind::Bool,
            "TYPE_STRING" => Kind::String,
            "TYPE_GROUP" => Kind::Group,
            "TYPE_MESSAGE" => Kind::Message,
            "TYPE_BYTES" => Kind::Bytes,
            "TYPE_UINT32" => Kind::Uint32,
            "TYPE_ENUM" => Kind::Enum,
            "TYPE_SFIXED32" => Kind::Sfixed32,
            "TYPE_SFIXED64" => Kind::Sfixed64,
            "TYPE_SINT32" => Kind::Sint32,
            "TYPE_SINT64" => Kind::Sint64,
            _ => return None,
        };
        Some(kind)
    }

    /// Kinds whose values reference another named type.
    pub fn is_named(self) -> bool {
        matches!(self, Kind::Message | Kind::Group | Kind::Enum)
    }

    pub fn is_message(self) -> bool {
        matches!(self, Kind::Message | Kind::Group)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    #[default]
    Optional,
    Required,
    Repeated,
}

impl Cardinality {
    pub fn as_str(self) -> &'static str {
        match self {
            Cardinality::Optional => "optional",
            Cardinality::Required => "required",
            Cardinality::Repeated => "repeated",
        }
    }

    pub fn from_label(s: &str) -> Option<Cardinality> {
        match s {
            "LABEL_OPTIONAL" => Some(Cardinality::Optional),
            "LABEL_REQUIRED" => Some(Cardinality::Required),
            "LABEL_REPEATED" => Some(Cardinality::Repeated),
            _ => None,
        }
    }
}

// =============================================================================
// Descriptors
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileDescriptor {
    pub path: String,
    pub package: String,
    pub syntax: Syntax,
    pub imports: Vec<Import>,
    pub messages: Vec<MessageDescriptor>,
    pub enums: Vec<EnumDescriptor>,
    pub services: Vec<ServiceDescriptor>,
    pub extensions: Vec<ExtensionDescriptor>,
    pub options: Option<DynamicMessage>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Import {
    pub path: String,
    pub is_public: bool,
    pub is_weak: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageDescriptor {
    pub name: String,
    pub full_name: String,
    pub is_map_entry: bool,
    pub fields: Vec<FieldDescriptor>,
    pub oneofs: Vec<OneofDescriptor>,
    pub messages: Vec<MessageDescriptor>,
    pub enums: Vec<EnumDescriptor>,
    pub extensions: Vec<ExtensionDescriptor>,
    pub options: Option<DynamicMessage>,
}

/// Key and value shape of a map field (the synthesized entry message).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapEntry {
    pub key_kind: Kind,
    pub value_kind: Kind,
    pub value_type_name: Option<String>,
}

impl MapEntry {
    /// `map_value_type` column: the referenced type for message/enum values,
    /// the kind otherwise.
    pub fn value_type(&self) -> String {
        match (&self.value_type_name, self.value_kind.is_named()) {
            (Some(name), true) => name.clone(),
            _ => self.value_kind.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub number: i32,
    pub kind: Kind,
    pub type_name: Option<String>,
    pub cardinality: Cardinality,
    /// Declared with the explicit `optional` keyword.
    pub has_optional_keyword: bool,
    /// Index into the owning message's `oneofs`, synthetic oneofs included.
    pub oneof_index: Option<usize>,
    pub json_name: String,
    pub default_value: Option<String>,
    pub map_entry: Option<MapEntry>,
    pub options: Option<DynamicMessage>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, number: i32, kind: Kind) -> Self {
        let name = name.into();
        Self {
            json_name: json_name(&name),
            name,
            number,
            kind,
            type_name: None,
            cardinality: Cardinality::Optional,
            has_optional_keyword: false,
            oneof_index: None,
            default_value: None,
            map_entry: None,
            options: None,
        }
    }

    pub fn is_repeated(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }

    pub fn is_map(&self) -> bool {
        self.map_entry.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OneofDescriptor {
    pub name: String,
    /// Compiler-generated wrapper of a single explicit-presence field.
    pub is_synthetic: bool,
    pub options: Option<DynamicMessage>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnumDescriptor {
    pub name: String,
    pub full_name: String,
    pub values: Vec<EnumValueDescriptor>,
    pub options: Option<DynamicMessage>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnumValueDescriptor {
    pub name: String,
    pub number: i32,
    pub options: Option<DynamicMessage>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceDescriptor {
    pub name: String,
    pub full_name: String,
    pub methods: Vec<MethodDescriptor>,
    pub options: Option<DynamicMessage>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodDescriptor {
    pub name: String,
    pub input_type: String,
    pub output_type: String,
    pub client_streaming: bool,
    pub server_streaming: bool,
    pub options: Option<DynamicMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionDescriptor {
    pub name: String,
    pub full_name: String,
    pub number: i32,
    pub extendee: String,
    pub kind: Kind,
    pub type_name: Option<String>,
    pub cardinality: Cardinality,
    pub json_name: String,
    pub options: Option<DynamicMessage>,
}

// =============================================================================
// Naming helpers
// =============================================================================

/// Qualify a simple name with a package or enclosing message name.
pub fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

/// Default JSON name: lowerCamelCase with underscores removed.
pub fn json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Inverse of [`json_name`] for option keys with no known declaration.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
