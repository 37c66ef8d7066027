//! Resolved protobuf descriptors with structured options.
//!
//! - [`model`]: the descriptor tree (files, messages, fields, enums, services,
//!   extensions), cross-referenced by fully-qualified name
//! - [`value`]: dynamic options values ([`DynamicMessage`])
//! - [`registry`]: batch-scoped name lookup ([`Registry`], [`Resolver`])
//! - [`descriptor_set`]: reader for `buf build --as-file-descriptor-set` JSON

pub mod descriptor_set;
pub mod model;
pub mod registry;
pub mod value;
mod well_known;

pub use descriptor_set::read_descriptor_set_json;
pub use model::{
    Cardinality, EnumDescriptor, EnumValueDescriptor, ExtensionDescriptor, FieldDescriptor,
    FileDescriptor, Import, Kind, MapEntry, MessageDescriptor, MethodDescriptor,
    OneofDescriptor, ServiceDescriptor, Syntax,
};
pub use registry::{Registry, Resolver};
pub use value::{DynamicMessage, FieldInfo, MapKey, Value};
pub use well_known::options_type;
