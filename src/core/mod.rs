//! Core module containing schemas, fields and their extension points

pub mod error;
pub mod errors;
pub mod field;
pub mod hooks;
pub mod inflect;
pub(crate) mod marshal;
pub mod options;
pub mod registry;
pub mod schema;
pub mod validators;
pub mod value;

pub use error::{FieldError, Result, SchemaError};
pub use errors::{ErrorEntry, Errors, SCHEMA_KEY};
pub use field::{Field, FieldKind, NestedSchema, Only};
pub use hooks::{Context, Hooks};
pub use options::{Meta, NamespaceOpts, SchemaOptions, SchemaOpts};
pub use registry::SchemaRegistry;
pub use schema::{MarshalResult, Schema, SchemaBuilder, UnmarshalResult};
