//! Options → JSON.
//!
//! Values are rendered by their declared kind, so the stored JSON stays close
//! to what protojson would produce for the same options:
//!
//! | kind             | JSON                                        |
//! |------------------|---------------------------------------------|
//! | bool             | `true` / `false`                            |
//! | integers         | number                                      |
//! | float, double    | number; `"NaN"`, `"Infinity"`, `"-Infinity"`|
//! | string           | string                                      |
//! | bytes            | base64 string                               |
//! | enum             | value name, or the number if unknown        |
//! | message, group   | object                                      |
//! | repeated         | array                                       |
//! | map              | object with stringified keys                |
//!
//! Keys are the declared field name for standard options and the full name
//! for extensions. A value that does not fit its declared kind falls back to
//! its generic string form instead of failing.

use base64::Engine as _;
use pbql_descriptor::{DynamicMessage, FieldInfo, Kind, Resolver, Value};
use serde_json::{Map, Number, Value as Json};

/// Encode an options value; `None` when nothing is set.
pub fn encode_options(
    options: Option<&DynamicMessage>,
    resolver: &dyn Resolver,
) -> Option<Json> {
    let message = options?;
    if message.is_empty() {
        return None;
    }
    Some(Json::Object(encode_message(message, resolver)))
}

fn encode_message(message: &DynamicMessage, resolver: &dyn Resolver) -> Map<String, Json> {
    let mut out = Map::new();
    for (field, value) in &message.fields {
        out.insert(field.key().to_string(), encode_field(field, value, resolver));
    }
    out
}

fn encode_field(field: &FieldInfo, value: &Value, resolver: &dyn Resolver) -> Json {
    match (&field.map, value) {
        (Some(entry), Value::Map(entries)) => {
            let mut out = Map::new();
            for (key, v) in entries {
                out.insert(
                    key.to_string(),
                    encode_single(entry.value_kind, entry.value_type_name.as_deref(), v, resolver),
                );
            }
            Json::Object(out)
        }
        (None, Value::List(items)) if field.is_list => Json::Array(
            items
                .iter()
                .map(|v| encode_single(field.kind, field.type_name.as_deref(), v, resolver))
                .collect(),
        ),
        (None, _) if !field.is_list => {
            encode_single(field.kind, field.type_name.as_deref(), value, resolver)
        }
        _ => generic(field, value),
    }
}

fn encode_single(
    kind: Kind,
    type_name: Option<&str>,
    value: &Value,
    resolver: &dyn Resolver,
) -> Json {
    match (kind, value) {
        (Kind::Bool, Value::Bool(b)) => Json::Bool(*b),
        (Kind::Int32 | Kind::Sint32 | Kind::Sfixed32, Value::I32(n)) => Json::from(*n),
        (Kind::Int64 | Kind::Sint64 | Kind::Sfixed64, Value::I64(n)) => Json::from(*n),
        (Kind::Uint32 | Kind::Fixed32, Value::U32(n)) => Json::from(*n),
        (Kind::Uint64 | Kind::Fixed64, Value::U64(n)) => Json::from(*n),
        // Through the shortest decimal form, so 0.1f32 stays 0.1.
        (Kind::Float, Value::F32(x)) => float(format!("{x}").parse().unwrap_or(f64::from(*x))),
        (Kind::Double, Value::F64(x)) => float(*x),
        (Kind::String, Value::String(s)) => Json::String(s.clone()),
        (Kind::Bytes, Value::Bytes(b)) => {
            Json::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
        (Kind::Enum, Value::EnumNumber(n)) => {
            match type_name.and_then(|t| resolver.enum_value_name(t, *n)) {
                Some(name) => Json::String(name.to_string()),
                None => Json::from(*n),
            }
        }
        (Kind::Message | Kind::Group, Value::Message(m)) => {
            Json::Object(encode_message(m, resolver))
        }
        _ => {
            tracing::debug!(kind = %kind, value = %value, "option value rendered generically");
            Json::String(value.to_string())
        }
    }
}

fn generic(field: &FieldInfo, value: &Value) -> Json {
    tracing::debug!(field = %field.full_name, value = %value, "option value rendered generically");
    Json::String(value.to_string())
}

fn float(x: f64) -> Json {
    match Number::from_f64(x) {
        Some(n) => Json::Number(n),
        None if x.is_nan() => Json::String("NaN".to_string()),
        None if x > 0.0 => Json::String("Infinity".to_string()),
        None => Json::String("-Infinity".to_string()),
    }
}
