//! # Mallow
//!
//! Object serialization and validation driven by declarative schemas, with
//! hook points for reacting to errors and reshaping output.
//!
//! ## Features
//!
//! - **Typed Fields**: strings, numbers, dates, URLs, emails, computed and nested fields
//! - **Error Handler Hook**: turn collected errors into application errors
//! - **Data Handlers**: ordered post-processing of serialized output
//! - **Options from Meta**: declarative options, extensible per schema type
//! - **Namespacing**: wrap output under `name` or `plural_name`
//! - **Configuration-Based**: define schemas via YAML configuration
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mallow::prelude::*;
//! use serde_json::json;
//!
//! let schema = Schema::builder("UserSchema")
//!     .field("name", Field::string())
//!     .field("email", Field::email())
//!     .meta(Meta::new().set("name", "user"))
//!     .options::<NamespaceOpts>()
//!     .data_handler(|_schema, mut data, obj| {
//!         data["id"] = obj["id"].clone();
//!         Ok(data)
//!     })
//!     .build()?;
//!
//! let result = schema.dump(&json!({"id": 1, "name": "Monty", "email": "monty@python.org"}))?;
//! assert_eq!(
//!     result.data,
//!     json!({"user": {"name": "Monty", "email": "monty@python.org", "id": 1}})
//! );
//! ```

pub mod config;
pub mod core;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Schemas ===
    pub use crate::core::schema::{MarshalResult, Schema, SchemaBuilder, UnmarshalResult};

    // === Fields ===
    pub use crate::core::field::{Field, FieldKind, Only};
    pub use crate::core::validators;

    // === Hooks and options ===
    pub use crate::core::hooks::{Context, Hooks};
    pub use crate::core::options::{Meta, NamespaceOpts, SchemaOptions, SchemaOpts};

    // === Errors ===
    pub use crate::core::error::{FieldError, Result, SchemaError};
    pub use crate::core::errors::{ErrorEntry, Errors, SCHEMA_KEY};

    // === Registry ===
    pub use crate::core::registry::{self, SchemaRegistry};

    // === Config ===
    pub use crate::config::{FieldConfig, OptionsKind, SchemaConfig, SchemasConfig};

    // === External dependencies ===
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
}
