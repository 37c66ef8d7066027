//! Reader for Buf's JSON rendering of `google.protobuf.FileDescriptorSet`.
//!
//! ```text
//! buf build <module> --as-file-descriptor-set -o descriptor.json
//! ```
//!
//! Extension options are rendered with bracketed keys, so vendor annotations
//! survive without an extension-aware protobuf runtime:
//!
//! ```json
//! { "[acme.annotations.v1.http]": { "get": "/v1/payments/{payment_id}" } }
//! ```
//!
//! Reading takes two passes. The first builds the descriptor tree without
//! options and indexes every declared type into a [`Registry`]; the second
//! builds it again, this time decoding each options object against the
//! registry so that extension payloads declared anywhere in the set are typed.

use crate::model::{
    json_name, qualify, snake_case, Cardinality, EnumDescriptor, EnumValueDescriptor,
    ExtensionDescriptor, FieldDescriptor, FileDescriptor, Import, Kind, MapEntry,
    MessageDescriptor, MethodDescriptor, OneofDescriptor, ServiceDescriptor, Syntax,
};
use crate::registry::{Registry, Resolver};
use crate::value::{DynamicMessage, FieldInfo, MapKey, Value};
use crate::well_known::options_type;
use anyhow::{anyhow, bail, Context, Result};
use base64::Engine as _;
use serde::Deserialize;
use serde_json::Value as Json;
use std::collections::{BTreeMap, HashMap};

// =============================================================================
// Public API
// =============================================================================

/// Parse a descriptor set rendered as protojson into resolved descriptors.
pub fn read_descriptor_set_json(text: &str) -> Result<Vec<FileDescriptor>> {
    let set: FileDescriptorSetJson =
        serde_json::from_str(text).context("failed to parse descriptor set JSON")?;

    // -------------------------------------------------------------------------
    // Pass 1: map entries, then the option-free tree and its registry.
    // -------------------------------------------------------------------------
    let mut map_entries = HashMap::new();
    for file in &set.file {
        let package = file.package.clone().unwrap_or_default();
        for m in &file.message_type {
            index_map_entries(&package, m, &mut map_entries);
        }
    }

    let skeleton = Builder {
        map_entries: &map_entries,
        registry: None,
    };
    let files = set
        .file
        .iter()
        .map(|f| skeleton.file(f))
        .collect::<Result<Vec<_>>>()?;
    let registry = Registry::from_files(&files);

    // -------------------------------------------------------------------------
    // Pass 2: the same tree with options decoded.
    // -------------------------------------------------------------------------
    let builder = Builder {
        map_entries: &map_entries,
        registry: Some(&registry),
    };
    let files = set
        .file
        .iter()
        .map(|f| builder.file(f))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(files = files.len(), "read descriptor set");
    Ok(files)
}

// =============================================================================
// Descriptor set JSON structs
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
struct FileDescriptorSetJson {
    #[serde(default)]
    file: Vec<FileDescriptorProtoJson>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileDescriptorProtoJson {
    name: Option<String>,
    package: Option<String>,
    #[serde(default)]
    dependency: Vec<String>,
    #[serde(default)]
    public_dependency: Vec<i32>,
    #[serde(default)]
    weak_dependency: Vec<i32>,
    #[serde(default)]
    message_type: Vec<DescriptorProtoJson>,
    #[serde(default)]
    enum_type: Vec<EnumDescriptorProtoJson>,
    #[serde(default)]
    service: Vec<ServiceDescriptorProtoJson>,
    #[serde(default)]
    extension: Vec<FieldDescriptorProtoJson>,
    #[serde(default)]
    options: Option<OptionsJson>,
    syntax: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptorProtoJson {
    name: Option<String>,
    #[serde(default)]
    field: Vec<FieldDescriptorProtoJson>,
    #[serde(default)]
    extension: Vec<FieldDescriptorProtoJson>,
    #[serde(default)]
    nested_type: Vec<DescriptorProtoJson>,
    #[serde(default)]
    enum_type: Vec<EnumDescriptorProtoJson>,
    #[serde(default)]
    oneof_decl: Vec<OneofDescriptorProtoJson>,
    #[serde(default)]
    options: Option<OptionsJson>,
}

#[derive(Debug, Clone, Deserialize)]
struct OneofDescriptorProtoJson {
    name: Option<String>,
    #[serde(default)]
    options: Option<OptionsJson>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldDescriptorProtoJson {
    name: Option<String>,
    number: Option<i32>,
    label: Option<String>,
    #[serde(rename = "type")]
    typ: Option<String>,
    type_name: Option<String>,
    extendee: Option<String>,
    default_value: Option<String>,
    oneof_index: Option<i32>,
    json_name: Option<String>,
    #[serde(default)]
    proto3_optional: bool,
    #[serde(default)]
    options: Option<OptionsJson>,
}

#[derive(Debug, Clone, Deserialize)]
struct EnumDescriptorProtoJson {
    name: Option<String>,
    #[serde(default)]
    value: Vec<EnumValueDescriptorProtoJson>,
    #[serde(default)]
    options: Option<OptionsJson>,
}

#[derive(Debug, Clone, Deserialize)]
struct EnumValueDescriptorProtoJson {
    name: Option<String>,
    number: Option<i32>,
    #[serde(default)]
    options: Option<OptionsJson>,
}

#[derive(Debug, Clone, Deserialize)]
struct ServiceDescriptorProtoJson {
    name: Option<String>,
    #[serde(default)]
    method: Vec<MethodDescriptorProtoJson>,
    #[serde(default)]
    options: Option<OptionsJson>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MethodDescriptorProtoJson {
    name: Option<String>,
    input_type: Option<String>,
    output_type: Option<String>,
    client_streaming: Option<bool>,
    server_streaming: Option<bool>,
    #[serde(default)]
    options: Option<OptionsJson>,
}

type OptionsJson = BTreeMap<String, Json>;

// =============================================================================
// Tree building
// =============================================================================

fn index_map_entries(scope: &str, m: &DescriptorProtoJson, out: &mut HashMap<String, MapEntry>) {
    let Some(name) = m.name.as_deref() else {
        return;
    };
    let full_name = qualify(scope, name);

    let is_map_entry = m
        .options
        .as_ref()
        .and_then(|o| o.get("mapEntry").or_else(|| o.get("map_entry")))
        .and_then(Json::as_bool)
        .unwrap_or(false);
    if is_map_entry {
        let entry_field = |number: i32| {
            m.field
                .iter()
                .find(|f| f.number == Some(number))
                .map(|f| {
                    let kind = f
                        .typ
                        .as_deref()
                        .and_then(Kind::from_descriptor_type)
                        .unwrap_or(Kind::String);
                    (kind, f.type_name.as_deref().map(strip_dot))
                })
        };
        if let (Some((key_kind, _)), Some((value_kind, value_type_name))) =
            (entry_field(1), entry_field(2))
        {
            out.insert(
                full_name.clone(),
                MapEntry {
                    key_kind,
                    value_kind,
                    value_type_name,
                },
            );
        }
    }

    for nested in &m.nested_type {
        index_map_entries(&full_name, nested, out);
    }
}

struct Builder<'a> {
    map_entries: &'a HashMap<String, MapEntry>,
    /// Options are only decoded once a registry exists.
    registry: Option<&'a Registry>,
}

impl Builder<'_> {
    fn file(&self, f: &FileDescriptorProtoJson) -> Result<FileDescriptor> {
        let path = f
            .name
            .clone()
            .ok_or_else(|| anyhow!("file descriptor without a name"))?;
        let package = f.package.clone().unwrap_or_default();
        let syntax = match f.syntax.as_deref() {
            Some("proto3") => Syntax::Proto3,
            Some("editions") => Syntax::Editions,
            _ => Syntax::Proto2,
        };

        let imports = f
            .dependency
            .iter()
            .enumerate()
            .map(|(i, dep)| {
                let i = i as i32;
                Import {
                    path: dep.clone(),
                    is_public: f.public_dependency.contains(&i),
                    is_weak: f.weak_dependency.contains(&i),
                }
            })
            .collect();

        let messages = f
            .message_type
            .iter()
            .map(|m| self.message(&package, syntax, m))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("in file {path}"))?;
        let enums = f
            .enum_type
            .iter()
            .map(|e| self.enumeration(&package, e))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("in file {path}"))?;
        let services = f
            .service
            .iter()
            .map(|s| self.service(&package, s))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("in file {path}"))?;
        let extensions = f
            .extension
            .iter()
            .map(|x| self.extension(&package, x))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("in file {path}"))?;

        Ok(FileDescriptor {
            options: self.options(f.options.as_ref(), options_type::FILE),
            path,
            package,
            syntax,
            imports,
            messages,
            enums,
            services,
            extensions,
        })
    }

    fn message(
        &self,
        scope: &str,
        syntax: Syntax,
        m: &DescriptorProtoJson,
    ) -> Result<MessageDescriptor> {
        let name = required(&m.name, "message", scope)?;
        let full_name = qualify(scope, &name);

        let fields = m
            .field
            .iter()
            .map(|f| self.field(&full_name, syntax, f))
            .collect::<Result<Vec<_>>>()?;

        let oneofs = m
            .oneof_decl
            .iter()
            .enumerate()
            .map(|(i, o)| {
                let members: Vec<_> = m
                    .field
                    .iter()
                    .filter(|f| f.oneof_index == Some(i as i32))
                    .collect();
                Ok(OneofDescriptor {
                    name: required(&o.name, "oneof", &full_name)?,
                    is_synthetic: members.len() == 1 && members[0].proto3_optional,
                    options: self.options(o.options.as_ref(), options_type::ONEOF),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let messages = m
            .nested_type
            .iter()
            .map(|n| self.message(&full_name, syntax, n))
            .collect::<Result<Vec<_>>>()?;
        let enums = m
            .enum_type
            .iter()
            .map(|e| self.enumeration(&full_name, e))
            .collect::<Result<Vec<_>>>()?;
        let extensions = m
            .extension
            .iter()
            .map(|x| self.extension(&full_name, x))
            .collect::<Result<Vec<_>>>()?;

        Ok(MessageDescriptor {
            is_map_entry: self.map_entries.contains_key(&full_name),
            options: self.options(m.options.as_ref(), options_type::MESSAGE),
            name,
            full_name,
            fields,
            oneofs,
            messages,
            enums,
            extensions,
        })
    }

    fn field(
        &self,
        message: &str,
        syntax: Syntax,
        f: &FieldDescriptorProtoJson,
    ) -> Result<FieldDescriptor> {
        let name = required(&f.name, "field", message)?;
        let kind = kind_of(f, message, &name)?;
        let cardinality = f
            .label
            .as_deref()
            .and_then(Cardinality::from_label)
            .unwrap_or_default();
        let type_name = f
            .type_name
            .as_deref()
            .filter(|_| kind.is_named())
            .map(strip_dot);
        let oneof_index = match f.oneof_index {
            Some(i) => Some(
                usize::try_from(i)
                    .map_err(|_| anyhow!("field {message}.{name} has oneof index {i}"))?,
            ),
            None => None,
        };

        let has_optional_keyword = match syntax {
            Syntax::Proto2 => cardinality == Cardinality::Optional && oneof_index.is_none(),
            Syntax::Proto3 | Syntax::Editions => f.proto3_optional,
        };

        let map_entry = match (&type_name, cardinality) {
            (Some(t), Cardinality::Repeated) if kind.is_message() => {
                self.map_entries.get(t).cloned()
            }
            _ => None,
        };

        Ok(FieldDescriptor {
            json_name: f.json_name.clone().unwrap_or_else(|| json_name(&name)),
            number: f.number.unwrap_or_default(),
            default_value: f.default_value.clone(),
            options: self.options(f.options.as_ref(), options_type::FIELD),
            name,
            kind,
            type_name,
            cardinality,
            has_optional_keyword,
            oneof_index,
            map_entry,
        })
    }

    fn extension(&self, scope: &str, x: &FieldDescriptorProtoJson) -> Result<ExtensionDescriptor> {
        let name = required(&x.name, "extension", scope)?;
        let kind = kind_of(x, scope, &name)?;
        Ok(ExtensionDescriptor {
            full_name: qualify(scope, &name),
            number: x.number.unwrap_or_default(),
            extendee: x.extendee.as_deref().map(strip_dot).unwrap_or_default(),
            type_name: x
                .type_name
                .as_deref()
                .filter(|_| kind.is_named())
                .map(strip_dot),
            cardinality: x
                .label
                .as_deref()
                .and_then(Cardinality::from_label)
                .unwrap_or_default(),
            json_name: x.json_name.clone().unwrap_or_else(|| json_name(&name)),
            options: self.options(x.options.as_ref(), options_type::FIELD),
            name,
            kind,
        })
    }

    fn enumeration(&self, scope: &str, e: &EnumDescriptorProtoJson) -> Result<EnumDescriptor> {
        let name = required(&e.name, "enum", scope)?;
        let full_name = qualify(scope, &name);
        let values = e
            .value
            .iter()
            .map(|v| {
                Ok(EnumValueDescriptor {
                    name: required(&v.name, "enum value", &full_name)?,
                    number: v.number.unwrap_or_default(),
                    options: self.options(v.options.as_ref(), options_type::ENUM_VALUE),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(EnumDescriptor {
            options: self.options(e.options.as_ref(), options_type::ENUM),
            name,
            full_name,
            values,
        })
    }

    fn service(&self, scope: &str, s: &ServiceDescriptorProtoJson) -> Result<ServiceDescriptor> {
        let name = required(&s.name, "service", scope)?;
        let full_name = qualify(scope, &name);
        let methods = s
            .method
            .iter()
            .map(|m| {
                Ok(MethodDescriptor {
                    name: required(&m.name, "method", &full_name)?,
                    input_type: m.input_type.as_deref().map(strip_dot).unwrap_or_default(),
                    output_type: m.output_type.as_deref().map(strip_dot).unwrap_or_default(),
                    client_streaming: m.client_streaming.unwrap_or(false),
                    server_streaming: m.server_streaming.unwrap_or(false),
                    options: self.options(m.options.as_ref(), options_type::METHOD),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ServiceDescriptor {
            options: self.options(s.options.as_ref(), options_type::SERVICE),
            name,
            full_name,
            methods,
        })
    }

    fn options(&self, raw: Option<&OptionsJson>, type_name: &str) -> Option<DynamicMessage> {
        let registry = self.registry?;
        raw.map(|o| decode_message(o.iter(), type_name, registry))
    }
}

fn required(name: &Option<String>, what: &str, scope: &str) -> Result<String> {
    match name {
        Some(n) if !n.is_empty() => Ok(n.clone()),
        _ if scope.is_empty() => bail!("{what} without a name"),
        _ => bail!("{what} without a name in {scope}"),
    }
}

fn kind_of(f: &FieldDescriptorProtoJson, scope: &str, name: &str) -> Result<Kind> {
    match f.typ.as_deref() {
        Some(t) => Kind::from_descriptor_type(t)
            .ok_or_else(|| anyhow!("{scope}.{name}: unknown field type {t}")),
        // protoc leaves `type` unset for unresolved references.
        None if f.type_name.is_some() => Ok(Kind::Message),
        None => bail!("{scope}.{name}: missing field type"),
    }
}

fn strip_dot(name: &str) -> String {
    name.strip_prefix('.').unwrap_or(name).to_string()
}

// =============================================================================
// Options decoding
// =============================================================================

fn decode_message<'j>(
    entries: impl Iterator<Item = (&'j String, &'j Json)>,
    type_name: &str,
    registry: &Registry,
) -> DynamicMessage {
    let mut message = DynamicMessage::new(type_name);

    for (key, raw) in entries {
        if raw.is_null() {
            continue;
        }

        let declared = match key.strip_prefix('[').and_then(|k| k.strip_suffix(']')) {
            Some(ext) => registry.find_extension(ext).cloned(),
            None => registry.find_field(type_name, key).cloned(),
        };

        match declared {
            Some(info) => {
                let value = decode_field(&info, raw, registry).unwrap_or_else(|| {
                    tracing::debug!(
                        field = %info.full_name,
                        kind = %info.kind,
                        "option value does not match its declared type"
                    );
                    infer(raw)
                });
                message.set(info, value);
            }
            None => {
                let value = infer(raw);
                let kind = inferred_kind(&value);
                let info = match key.strip_prefix('[').and_then(|k| k.strip_suffix(']')) {
                    Some(ext) => FieldInfo::new("", ext, 0, kind).extension(),
                    None => FieldInfo::new(type_name, &snake_case(key), 0, kind),
                };
                let info = if matches!(value, Value::List(_)) {
                    info.repeated()
                } else {
                    info
                };
                tracing::debug!(
                    option = %key,
                    message = %type_name,
                    "undeclared option typed from JSON"
                );
                message.set(info, value);
            }
        }
    }

    message
}

fn decode_field(info: &FieldInfo, raw: &Json, registry: &Registry) -> Option<Value> {
    if let Some(entry) = &info.map {
        let obj = raw.as_object()?;
        let mut entries = Vec::with_capacity(obj.len());
        for (k, v) in obj {
            let key = decode_map_key(entry.key_kind, k)?;
            let value =
                decode_single(entry.value_kind, entry.value_type_name.as_deref(), v, registry)?;
            entries.push((key, value));
        }
        return Some(Value::Map(entries));
    }

    if info.is_list {
        let items = raw
            .as_array()?
            .iter()
            .map(|v| decode_single(info.kind, info.type_name.as_deref(), v, registry))
            .collect::<Option<Vec<_>>>()?;
        return Some(Value::List(items));
    }

    decode_single(info.kind, info.type_name.as_deref(), raw, registry)
}

fn decode_single(
    kind: Kind,
    type_name: Option<&str>,
    raw: &Json,
    registry: &Registry,
) -> Option<Value> {
    let value = match kind {
        Kind::Bool => Value::Bool(raw.as_bool()?),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
            Value::I32(i32::try_from(integer::<i64>(raw)?).ok()?)
        }
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Value::I64(integer(raw)?),
        Kind::Uint32 | Kind::Fixed32 => Value::U32(u32::try_from(integer::<u64>(raw)?).ok()?),
        Kind::Uint64 | Kind::Fixed64 => Value::U64(integer(raw)?),
        Kind::Float => Value::F32(float(raw)? as f32),
        Kind::Double => Value::F64(float(raw)?),
        Kind::String => Value::String(raw.as_str()?.to_string()),
        Kind::Bytes => Value::Bytes(bytes(raw.as_str()?)?),
        Kind::Enum => match raw {
            Json::String(name) => {
                match type_name.and_then(|t| registry.enum_value_number(t, name)) {
                    Some(number) => Value::EnumNumber(number),
                    None => Value::String(name.clone()),
                }
            }
            _ => Value::EnumNumber(i32::try_from(raw.as_i64()?).ok()?),
        },
        Kind::Message | Kind::Group => {
            let obj = raw.as_object()?;
            Value::Message(decode_message(obj.iter(), type_name.unwrap_or_default(), registry))
        }
    };
    Some(value)
}

fn decode_map_key(kind: Kind, raw: &str) -> Option<MapKey> {
    let key = match kind {
        Kind::Bool => MapKey::Bool(raw.parse().ok()?),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => MapKey::I32(raw.parse().ok()?),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => MapKey::I64(raw.parse().ok()?),
        Kind::Uint32 | Kind::Fixed32 => MapKey::U32(raw.parse().ok()?),
        Kind::Uint64 | Kind::Fixed64 => MapKey::U64(raw.parse().ok()?),
        Kind::String => MapKey::String(raw.to_string()),
        _ => return None,
    };
    Some(key)
}

/// protojson integers: numbers, or decimal strings for 64-bit kinds.
fn integer<T>(raw: &Json) -> Option<T>
where
    T: std::str::FromStr + TryFrom<i64> + TryFrom<u64>,
{
    match raw {
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                <T as TryFrom<i64>>::try_from(i).ok()
            } else {
                n.as_u64().and_then(|u| <T as TryFrom<u64>>::try_from(u).ok())
            }
        }
        Json::String(s) => s.parse::<T>().ok(),
        _ => None,
    }
}

fn float(raw: &Json) -> Option<f64> {
    match raw {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            other => other.parse().ok(),
        },
        _ => None,
    }
}

fn bytes(raw: &str) -> Option<Vec<u8>> {
    use base64::engine::general_purpose::{STANDARD, URL_SAFE};
    STANDARD
        .decode(raw)
        .or_else(|_| URL_SAFE.decode(raw))
        .ok()
}

/// Type a value from its JSON shape alone.
fn infer(raw: &Json) -> Value {
    match raw {
        Json::Null => Value::String(String::new()),
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::I64(i)
            } else if let Some(u) = n.as_u64() {
                Value::U64(u)
            } else {
                Value::F64(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(infer).collect()),
        Json::Object(obj) => {
            let mut message = DynamicMessage::new("");
            for (key, v) in obj {
                if v.is_null() {
                    continue;
                }
                let value = infer(v);
                let kind = inferred_kind(&value);
                let mut info = match key.strip_prefix('[').and_then(|k| k.strip_suffix(']')) {
                    Some(ext) => FieldInfo::new("", ext, 0, kind).extension(),
                    None => FieldInfo::new("", &snake_case(key), 0, kind),
                };
                if matches!(value, Value::List(_)) {
                    info = info.repeated();
                }
                message.set(info, value);
            }
            Value::Message(message)
        }
    }
}

fn inferred_kind(value: &Value) -> Kind {
    match value {
        Value::Bool(_) => Kind::Bool,
        Value::I32(_) => Kind::Int32,
        Value::I64(_) => Kind::Int64,
        Value::U32(_) => Kind::Uint32,
        Value::U64(_) => Kind::Uint64,
        Value::F32(_) => Kind::Float,
        Value::F64(_) => Kind::Double,
        Value::String(_) => Kind::String,
        Value::Bytes(_) => Kind::Bytes,
        Value::EnumNumber(_) => Kind::Enum,
        Value::Message(_) | Value::Map(_) => Kind::Message,
        Value::List(items) => items.first().map(inferred_kind).unwrap_or(Kind::String),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACME: &str = r#"{
      "file": [
        {
          "name": "acme/annotations/v1/annotations.proto",
          "package": "acme.annotations.v1",
          "dependency": ["google/protobuf/descriptor.proto"],
          "messageType": [
            {
              "name": "HttpRule",
              "field": [
                {"name": "get", "number": 1, "label": "LABEL_OPTIONAL", "type": "TYPE_STRING",
                 "jsonName": "get"},
                {"name": "post", "number": 2, "label": "LABEL_OPTIONAL", "type": "TYPE_STRING",
                 "jsonName": "post"}
              ]
            }
          ],
          "extension": [
            {"name": "http", "number": 50001, "label": "LABEL_OPTIONAL", "type": "TYPE_MESSAGE",
             "typeName": ".acme.annotations.v1.HttpRule",
             "extendee": ".google.protobuf.MethodOptions", "jsonName": "http"},
            {"name": "limits", "number": 50002, "label": "LABEL_REPEATED", "type": "TYPE_MESSAGE",
             "typeName": ".acme.annotations.v1.Limits.LimitsEntry",
             "extendee": ".google.protobuf.ServiceOptions", "jsonName": "limits"}
          ],
          "syntax": "proto3"
        },
        {
          "name": "acme/payments/v1/payments.proto",
          "package": "acme.payments.v1",
          "dependency": ["acme/annotations/v1/annotations.proto", "google/protobuf/any.proto"],
          "publicDependency": [0],
          "weakDependency": [1],
          "messageType": [
            {
              "name": "Payment",
              "field": [
                {"name": "payment_id", "number": 1, "label": "LABEL_OPTIONAL",
                 "type": "TYPE_STRING", "jsonName": "paymentId"},
                {"name": "card", "number": 2, "label": "LABEL_OPTIONAL", "type": "TYPE_STRING",
                 "oneofIndex": 0, "jsonName": "card"},
                {"name": "bank", "number": 3, "label": "LABEL_OPTIONAL", "type": "TYPE_STRING",
                 "oneofIndex": 0, "jsonName": "bank"},
                {"name": "memo", "number": 4, "label": "LABEL_OPTIONAL", "type": "TYPE_STRING",
                 "oneofIndex": 1,
                 "jsonName": "memo", "proto3Optional": true},
                {"name": "labels", "number": 5, "label": "LABEL_REPEATED", "type": "TYPE_MESSAGE",
                 "typeName": ".acme.payments.v1.Payment.LabelsEntry", "jsonName": "labels"},
                {"name": "amount", "number": 6, "label": "LABEL_OPTIONAL", "type": "TYPE_INT64",
                 "jsonName": "amount",
                 "options": {"deprecated": true, "jstype": "JS_STRING"}}
              ],
              "nestedType": [
                {
                  "name": "LabelsEntry",
                  "field": [
                    {"name": "key", "number": 1, "label": "LABEL_OPTIONAL",
                     "type": "TYPE_STRING", "jsonName": "key"},
                    {"name": "value", "number": 2, "label": "LABEL_OPTIONAL",
                     "type": "TYPE_INT32", "jsonName": "value"}
                  ],
                  "options": {"mapEntry": true}
                }
              ],
              "oneofDecl": [{"name": "method"}, {"name": "_memo"}],
              "options": {"[acme.vendor.unknown]": {"tier": 2, "tags": ["a", "b"]}}
            }
          ],
          "service": [
            {
              "name": "PaymentService",
              "method": [
                {"name": "GetPayment", "inputType": ".acme.payments.v1.Payment",
                 "outputType": ".acme.payments.v1.Payment",
                 "serverStreaming": true,
                 "options": {"[acme.annotations.v1.http]": {"get": "/v1/payments/{payment_id}"},
                  "idempotencyLevel": "NO_SIDE_EFFECTS"}}
              ],
              "options": {}
            }
          ],
          "options": {"goPackage": "example.com/acme/payments/v1", "optimizeFor": "CODE_SIZE"},
          "syntax": "proto3"
        }
      ]
    }"#;

    fn payments() -> Result<FileDescriptor> {
        let files = read_descriptor_set_json(ACME)?;
        assert_eq!(files.len(), 2);
        Ok(files[1].clone())
    }

    #[test]
    fn reads_imports_with_flags() -> Result<()> {
        let file = payments()?;
        assert_eq!(file.syntax, Syntax::Proto3);
        assert_eq!(file.imports.len(), 2);
        assert!(file.imports[0].is_public && !file.imports[0].is_weak);
        assert!(!file.imports[1].is_public && file.imports[1].is_weak);
        Ok(())
    }

    #[test]
    fn detects_maps_and_synthetic_oneofs() -> Result<()> {
        let file = payments()?;
        let payment = &file.messages[0];
        assert_eq!(payment.full_name, "acme.payments.v1.Payment");

        assert!(!payment.oneofs[0].is_synthetic);
        assert!(payment.oneofs[1].is_synthetic);

        let memo = &payment.fields[3];
        assert!(memo.has_optional_keyword);
        assert_eq!(memo.oneof_index, Some(1));
        // proto3 fields without the keyword have implicit presence.
        assert!(!payment.fields[0].has_optional_keyword);

        let labels = &payment.fields[4];
        let entry = labels.map_entry.as_ref().expect("labels is a map");
        assert_eq!(entry.key_kind, Kind::String);
        assert_eq!(entry.value_type(), "int32");
        assert!(payment.messages[0].is_map_entry);
        Ok(())
    }

    #[test]
    fn decodes_standard_and_extension_options() -> Result<()> {
        let file = payments()?;

        let file_opts = file.options.as_ref().expect("file options");
        assert_eq!(
            file_opts.get("go_package"),
            Some(&Value::String("example.com/acme/payments/v1".into()))
        );
        assert_eq!(file_opts.get("optimize_for"), Some(&Value::EnumNumber(2)));

        let method = &file.services[0].methods[0];
        assert_eq!(method.input_type, "acme.payments.v1.Payment");
        assert!(method.server_streaming && !method.client_streaming);
        let opts = method.options.as_ref().expect("method options");
        match opts.get("acme.annotations.v1.http") {
            Some(Value::Message(rule)) => {
                assert_eq!(rule.type_name, "acme.annotations.v1.HttpRule");
                assert_eq!(
                    rule.get("get"),
                    Some(&Value::String("/v1/payments/{payment_id}".into()))
                );
            }
            other => panic!("unexpected http option: {other:?}"),
        }
        assert_eq!(opts.get("idempotency_level"), Some(&Value::EnumNumber(1)));

        let amount = &file.messages[0].fields[5];
        let amount_opts = amount.options.as_ref().expect("field options");
        assert_eq!(amount_opts.get("deprecated"), Some(&Value::Bool(true)));
        assert_eq!(amount_opts.get("jstype"), Some(&Value::EnumNumber(1)));
        Ok(())
    }

    #[test]
    fn empty_options_object_is_present_but_empty() -> Result<()> {
        let file = payments()?;
        let service = &file.services[0];
        assert!(service.options.as_ref().is_some_and(DynamicMessage::is_empty));
        assert!(file.messages[0].fields[0].options.is_none());
        Ok(())
    }

    #[test]
    fn undeclared_extension_is_inferred() -> Result<()> {
        let file = payments()?;
        let opts = file.messages[0].options.as_ref().expect("message options");
        match opts.get("acme.vendor.unknown") {
            Some(Value::Message(m)) => {
                assert_eq!(m.get("tier"), Some(&Value::I64(2)));
                assert_eq!(
                    m.get("tags"),
                    Some(&Value::List(vec![
                        Value::String("a".into()),
                        Value::String("b".into())
                    ]))
                );
            }
            other => panic!("unexpected vendor option: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn inferred_objects_use_declared_style_keys() -> Result<()> {
        let files = read_descriptor_set_json(
            r#"{"file": [{
                "name": "acme/v1/rules.proto",
                "package": "acme.v1",
                "options": {"[acme.vendor.rules]": {"fieldPresence": "EXPLICIT",
                 "limits": {"maxLen": 3}}}
            }]}"#,
        )?;
        let opts = files[0].options.as_ref().expect("file options");
        let Some(Value::Message(rules)) = opts.get("acme.vendor.rules") else {
            panic!("unexpected vendor option: {opts:?}");
        };
        assert_eq!(
            rules.get("field_presence"),
            Some(&Value::String("EXPLICIT".into()))
        );
        assert!(rules.get("fieldPresence").is_none());
        match rules.get("limits") {
            Some(Value::Message(limits)) => {
                assert_eq!(limits.get("max_len"), Some(&Value::I64(3)));
            }
            other => panic!("unexpected limits: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn missing_file_name_is_an_error() {
        let err = read_descriptor_set_json(r#"{"file": [{"package": "x"}]}"#).unwrap_err();
        assert!(err.to_string().contains("without a name"));
    }

    #[test]
    fn protojson_scalars() {
        assert_eq!(
            integer::<i64>(&Json::String("-9007199254740993".into())),
            Some(-9007199254740993)
        );
        assert_eq!(integer::<u64>(&serde_json::json!(7)), Some(7));
        assert!(float(&Json::String("NaN".into())).is_some_and(f64::is_nan));
        assert_eq!(float(&Json::String("-Infinity".into())), Some(f64::NEG_INFINITY));
        assert_eq!(bytes("AAEC"), Some(vec![0, 1, 2]));
        assert_eq!(decode_map_key(Kind::Int32, "12"), Some(MapKey::I32(12)));
        assert_eq!(decode_map_key(Kind::Bool, "nope"), None);
    }
}
