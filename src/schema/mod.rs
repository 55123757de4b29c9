//! Extraction schemas and the vocabularies they reference.

pub mod registry;
pub mod types;

pub use registry::{LoadIssue, SchemaError, SchemaRegistry, SchemaResult, UnresolvedReference};
pub use types::{FieldDef, FieldType, Schema, Vocabulary, split_enum_ref};
