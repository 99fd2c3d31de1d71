//! Extension points registered on a schema
//!
//! Every hook list is ordered and additive: registering appends, and a
//! schema built with [`Schema::extend`](crate::core::schema::Schema::extend)
//! inherits its parent's hooks before adding its own. The error handler and
//! the accessor are single slots; registering again replaces them.
//!
//! # Hook points
//!
//! - Error handler: runs when a dump or load collected errors. Returning an
//!   error aborts the call with that error instead of returning a result.
//! - Data handlers: run after serialization, each receiving the previous
//!   handler's output.
//! - Preprocessors: transform the input of a load, in order.
//! - Validators: schema-level checks on loaded data, reported under `_schema`.
//! - Accessor: replaces attribute lookup while dumping.

use crate::core::error::{Result, SchemaError};
use crate::core::errors::{Errors, SCHEMA_KEY};
use crate::core::schema::Schema;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Context map handed to method and function fields
pub type Context = Map<String, Value>;

/// `(schema, errors, original object)`; an `Err` replaces the result
pub type ErrorHandler = Arc<dyn Fn(&Schema, &Errors, &Value) -> anyhow::Result<()> + Send + Sync>;

/// `(schema, serialized data, original object)` → transformed data
pub type DataHandler = Arc<dyn Fn(&Schema, Value, &Value) -> anyhow::Result<Value> + Send + Sync>;

/// `(schema, raw input)` → input handed to deserialization
pub type Preprocessor = Arc<dyn Fn(&Schema, Value) -> anyhow::Result<Value> + Send + Sync>;

/// `(schema, deserialized data)`; an `Err` message lands under `_schema`
pub type SchemaValidator = Arc<dyn Fn(&Schema, &Value) -> std::result::Result<(), String> + Send + Sync>;

/// `(schema, key, object)` → the attribute value, if present
pub type Accessor = Arc<dyn Fn(&Schema, &str, &Value) -> Option<Value> + Send + Sync>;

/// Named schema method used by method fields: `(value or object, context)`
pub type SchemaMethod =
    Arc<dyn Fn(&Value, &Context) -> std::result::Result<Value, String> + Send + Sync>;

/// Ordered registry of a schema's hooks
#[derive(Clone, Default)]
pub struct Hooks {
    pub(crate) error_handler: Option<ErrorHandler>,
    pub(crate) data_handlers: Vec<DataHandler>,
    pub(crate) preprocessors: Vec<Preprocessor>,
    pub(crate) validators: Vec<SchemaValidator>,
    pub(crate) accessor: Option<Accessor>,
}

impl Hooks {
    pub fn has_error_handler(&self) -> bool {
        self.error_handler.is_some()
    }

    pub fn data_handler_count(&self) -> usize {
        self.data_handlers.len()
    }

    pub(crate) fn accessor(&self) -> Option<&Accessor> {
        self.accessor.as_ref()
    }

    /// Route collected errors through the error handler, if any
    pub(crate) fn handle_errors(&self, schema: &Schema, errors: &Errors, obj: &Value) -> Result<()> {
        let Some(handler) = &self.error_handler else {
            return Ok(());
        };
        if errors.is_empty() {
            return Ok(());
        }
        handler(schema, errors, obj).map_err(|err| {
            tracing::warn!(schema = %schema.name(), error = %err, "error handler aborted the call");
            SchemaError::Handler(err)
        })
    }

    /// Compose the data handlers in registration order
    pub(crate) fn apply_data_handlers(&self, schema: &Schema, data: Value, obj: &Value) -> Result<Value> {
        self.data_handlers
            .iter()
            .try_fold(data, |data, handler| handler(schema, data, obj))
            .map_err(SchemaError::Handler)
    }

    pub(crate) fn apply_preprocessors(&self, schema: &Schema, data: Value) -> Result<Value> {
        self.preprocessors
            .iter()
            .try_fold(data, |data, preprocess| preprocess(schema, data))
            .map_err(SchemaError::Handler)
    }

    /// Run schema-level validators, collecting their messages under `_schema`
    pub(crate) fn run_validators(&self, schema: &Schema, data: &Value, errors: &mut Errors) {
        for validator in &self.validators {
            if let Err(message) = validator(schema, data) {
                tracing::trace!(schema = %schema.name(), %message, "schema validator failed");
                errors.push_message(SCHEMA_KEY, message);
            }
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("error_handler", &self.error_handler.is_some())
            .field("data_handlers", &self.data_handlers.len())
            .field("preprocessors", &self.preprocessors.len())
            .field("validators", &self.validators.len())
            .field("accessor", &self.accessor.is_some())
            .finish()
    }
}
