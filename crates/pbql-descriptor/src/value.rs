//! Dynamic options values.
//!
//! An options value is a message whose field set is only partly known ahead
//! of time: standard fields come from `descriptor.proto`, everything else is
//! a third-party extension. [`DynamicMessage`] stores the fields that are
//! actually set, each with the [`FieldInfo`] that describes it.

use crate::model::{Kind, MapEntry};
use std::fmt;

/// Declaration of a field as seen by the options encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub full_name: String,
    pub json_name: String,
    pub number: i32,
    pub kind: Kind,
    pub type_name: Option<String>,
    pub is_list: bool,
    pub map: Option<MapEntry>,
    pub is_extension: bool,
}

impl FieldInfo {
    pub fn new(scope: &str, name: &str, number: i32, kind: Kind) -> Self {
        Self {
            name: name.to_string(),
            full_name: crate::model::qualify(scope, name),
            json_name: crate::model::json_name(name),
            number,
            kind,
            type_name: None,
            is_list: false,
            map: None,
            is_extension: false,
        }
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn repeated(mut self) -> Self {
        self.is_list = true;
        self
    }

    pub fn map(mut self, entry: MapEntry) -> Self {
        self.is_list = false;
        self.map = Some(entry);
        self
    }

    pub fn extension(mut self) -> Self {
        self.is_extension = true;
        self
    }

    /// Output key: extensions by full name, standard fields by declared name.
    pub fn key(&self) -> &str {
        if self.is_extension {
            &self.full_name
        } else {
            &self.name
        }
    }
}

/// A message value holding only its set fields, in the order they were set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicMessage {
    pub type_name: String,
    pub fields: Vec<(FieldInfo, Value)>,
}

impl DynamicMessage {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    pub fn set(&mut self, field: FieldInfo, value: Value) {
        self.fields.push((field, value));
    }

    pub fn with(mut self, field: FieldInfo, value: Value) -> Self {
        self.set(field, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Look up a set field by its output key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field.key() == key)
            .map(|(_, value)| value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Raw enum number; the name is looked up when encoding.
    EnumNumber(i32),
    Message(DynamicMessage),
    List(Vec<Value>),
    Map(Vec<(MapKey, Value)>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    String(String),
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Bool(b) => write!(f, "{b}"),
            MapKey::I32(n) => write!(f, "{n}"),
            MapKey::I64(n) => write!(f, "{n}"),
            MapKey::U32(n) => write!(f, "{n}"),
            MapKey::U64(n) => write!(f, "{n}"),
            MapKey::String(s) => f.write_str(s),
        }
    }
}

/// Generic rendering, used when a value does not fit its declared kind.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::I32(n) => write!(f, "{n}"),
            Value::I64(n) => write!(f, "{n}"),
            Value::U32(n) => write!(f, "{n}"),
            Value::U64(n) => write!(f, "{n}"),
            Value::F32(x) => write!(f, "{x}"),
            Value::F64(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Value::EnumNumber(n) => write!(f, "{n}"),
            Value::Message(m) => {
                f.write_str("{")?;
                for (i, (field, value)) in m.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {value}", field.key())?;
                }
                f.write_str("}")
            }
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}
