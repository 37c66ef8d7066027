//! Standard options messages from `google/protobuf/descriptor.proto`.
//!
//! Descriptor sets built with `--exclude-imports` do not carry
//! `descriptor.proto`, yet their options still use its fields. The subset
//! seeded here covers the options that appear in practice; anything else is
//! typed from its JSON shape by the reader.

use crate::model::Kind;
use crate::registry::Registry;
use crate::value::FieldInfo;

const FILE: &str = "google.protobuf.FileOptions";
const MESSAGE: &str = "google.protobuf.MessageOptions";
const FIELD: &str = "google.protobuf.FieldOptions";
const ONEOF: &str = "google.protobuf.OneofOptions";
const ENUM: &str = "google.protobuf.EnumOptions";
const ENUM_VALUE: &str = "google.protobuf.EnumValueOptions";
const SERVICE: &str = "google.protobuf.ServiceOptions";
const METHOD: &str = "google.protobuf.MethodOptions";

pub(crate) fn seed(registry: &mut Registry) {
    registry.register_message(
        FILE,
        vec![
            FieldInfo::new(FILE, "java_package", 1, Kind::String),
            FieldInfo::new(FILE, "java_outer_classname", 8, Kind::String),
            FieldInfo::new(FILE, "java_multiple_files", 10, Kind::Bool),
            FieldInfo::new(FILE, "java_generate_equals_and_hash", 20, Kind::Bool),
            FieldInfo::new(FILE, "java_string_check_utf8", 27, Kind::Bool),
            FieldInfo::new(FILE, "optimize_for", 9, Kind::Enum)
                .with_type_name("google.protobuf.FileOptions.OptimizeMode"),
            FieldInfo::new(FILE, "go_package", 11, Kind::String),
            FieldInfo::new(FILE, "cc_generic_services", 16, Kind::Bool),
            FieldInfo::new(FILE, "java_generic_services", 17, Kind::Bool),
            FieldInfo::new(FILE, "py_generic_services", 18, Kind::Bool),
            FieldInfo::new(FILE, "deprecated", 23, Kind::Bool),
            FieldInfo::new(FILE, "cc_enable_arenas", 31, Kind::Bool),
            FieldInfo::new(FILE, "objc_class_prefix", 36, Kind::String),
            FieldInfo::new(FILE, "csharp_namespace", 37, Kind::String),
            FieldInfo::new(FILE, "swift_prefix", 39, Kind::String),
            FieldInfo::new(FILE, "php_class_prefix", 40, Kind::String),
            FieldInfo::new(FILE, "php_namespace", 41, Kind::String),
            FieldInfo::new(FILE, "php_metadata_namespace", 44, Kind::String),
            FieldInfo::new(FILE, "ruby_package", 45, Kind::String),
        ],
    );
    registry.register_enum(
        "google.protobuf.FileOptions.OptimizeMode",
        values(&[("SPEED", 1), ("CODE_SIZE", 2), ("LITE_RUNTIME", 3)]),
    );

    registry.register_message(
        MESSAGE,
        vec![
            FieldInfo::new(MESSAGE, "message_set_wire_format", 1, Kind::Bool),
            FieldInfo::new(MESSAGE, "no_standard_descriptor_accessor", 2, Kind::Bool),
            FieldInfo::new(MESSAGE, "deprecated", 3, Kind::Bool),
            FieldInfo::new(MESSAGE, "map_entry", 7, Kind::Bool),
            FieldInfo::new(MESSAGE, "deprecated_legacy_json_field_conflicts", 11, Kind::Bool),
        ],
    );

    registry.register_message(
        FIELD,
        vec![
            FieldInfo::new(FIELD, "ctype", 1, Kind::Enum)
                .with_type_name("google.protobuf.FieldOptions.CType"),
            FieldInfo::new(FIELD, "packed", 2, Kind::Bool),
            FieldInfo::new(FIELD, "deprecated", 3, Kind::Bool),
            FieldInfo::new(FIELD, "lazy", 5, Kind::Bool),
            FieldInfo::new(FIELD, "jstype", 6, Kind::Enum)
                .with_type_name("google.protobuf.FieldOptions.JSType"),
            FieldInfo::new(FIELD, "weak", 10, Kind::Bool),
            FieldInfo::new(FIELD, "unverified_lazy", 15, Kind::Bool),
            FieldInfo::new(FIELD, "debug_redact", 16, Kind::Bool),
            FieldInfo::new(FIELD, "retention", 17, Kind::Enum)
                .with_type_name("google.protobuf.FieldOptions.OptionRetention"),
            FieldInfo::new(FIELD, "targets", 19, Kind::Enum)
                .with_type_name("google.protobuf.FieldOptions.OptionTargetType")
                .repeated(),
        ],
    );
    registry.register_enum(
        "google.protobuf.FieldOptions.CType",
        values(&[("STRING", 0), ("CORD", 1), ("STRING_PIECE", 2)]),
    );
    registry.register_enum(
        "google.protobuf.FieldOptions.JSType",
        values(&[("JS_NORMAL", 0), ("JS_STRING", 1), ("JS_NUMBER", 2)]),
    );
    registry.register_enum(
        "google.protobuf.FieldOptions.OptionRetention",
        values(&[
            ("RETENTION_UNKNOWN", 0),
            ("RETENTION_RUNTIME", 1),
            ("RETENTION_SOURCE", 2),
        ]),
    );
    registry.register_enum(
        "google.protobuf.FieldOptions.OptionTargetType",
        values(&[
            ("TARGET_TYPE_UNKNOWN", 0),
            ("TARGET_TYPE_FILE", 1),
            ("TARGET_TYPE_EXTENSION_RANGE", 2),
            ("TARGET_TYPE_MESSAGE", 3),
            ("TARGET_TYPE_FIELD", 4),
            ("TARGET_TYPE_ONEOF", 5),
            ("TARGET_TYPE_ENUM", 6),
            ("TARGET_TYPE_ENUM_ENTRY", 7),
            ("TARGET_TYPE_SERVICE", 8),
            ("TARGET_TYPE_METHOD", 9),
        ]),
    );

    registry.register_message(ONEOF, Vec::new());

    registry.register_message(
        ENUM,
        vec![
            FieldInfo::new(ENUM, "allow_alias", 2, Kind::Bool),
            FieldInfo::new(ENUM, "deprecated", 3, Kind::Bool),
            FieldInfo::new(ENUM, "deprecated_legacy_json_field_conflicts", 6, Kind::Bool),
        ],
    );

    registry.register_message(
        ENUM_VALUE,
        vec![
            FieldInfo::new(ENUM_VALUE, "deprecated", 1, Kind::Bool),
            FieldInfo::new(ENUM_VALUE, "debug_redact", 3, Kind::Bool),
        ],
    );

    registry.register_message(
        SERVICE,
        vec![FieldInfo::new(SERVICE, "deprecated", 33, Kind::Bool)],
    );

    registry.register_message(
        METHOD,
        vec![
            FieldInfo::new(METHOD, "deprecated", 33, Kind::Bool),
            FieldInfo::new(METHOD, "idempotency_level", 34, Kind::Enum)
                .with_type_name("google.protobuf.MethodOptions.IdempotencyLevel"),
        ],
    );
    registry.register_enum(
        "google.protobuf.MethodOptions.IdempotencyLevel",
        values(&[
            ("IDEMPOTENCY_UNKNOWN", 0),
            ("NO_SIDE_EFFECTS", 1),
            ("IDEMPOTENT", 2),
        ]),
    );
}

fn values(pairs: &[(&str, i32)]) -> Vec<(String, i32)> {
    pairs.iter().map(|(n, v)| (n.to_string(), *v)).collect()
}

/// Options message type for each kind of descriptor.
pub mod options_type {
    pub const FILE: &str = super::FILE;
    pub const MESSAGE: &str = super::MESSAGE;
    pub const FIELD: &str = super::FIELD;
    pub const ONEOF: &str = super::ONEOF;
    pub const ENUM: &str = super::ENUM;
    pub const ENUM_VALUE: &str = super::ENUM_VALUE;
    pub const SERVICE: &str = super::SERVICE;
    pub const METHOD: &str = super::METHOD;
}
