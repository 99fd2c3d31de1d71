//! Field-by-field serialization and deserialization of objects
//!
//! [`Marshaller`] and [`Unmarshaller`] walk a field map, collect per-field
//! failures into an [`Errors`] mapping and return the partial data. In strict
//! mode the first failure aborts the pass instead.

use crate::core::error::{FieldError, Result, SchemaError};
use crate::core::errors::{Errors, SCHEMA_KEY};
use crate::core::field::{Field, MISSING_REQUIRED};
use crate::core::hooks::Context;
use crate::core::schema::Schema;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::trace;

pub(crate) const EXPECTED_LIST: &str = "Expected a list of objects.";
pub(crate) const INVALID_INPUT: &str = "Invalid input type.";

/// What fields see while they run: the owning schema and its context
#[derive(Clone, Copy)]
pub(crate) struct Env<'a> {
    pub schema: &'a Schema,
    pub context: &'a Context,
}

impl<'a> Env<'a> {
    pub fn new(schema: &'a Schema, context: &'a Context) -> Self {
        Self { schema, context }
    }

    pub fn dateformat(&self) -> Option<&'a str> {
        self.schema.opts().base().dateformat.as_deref()
    }
}

/// Outcome of one field once failures are recorded
enum Stored {
    Value(Value),
    Skip,
}

/// Record a field failure in `errors`, or turn it into an abort when strict
fn store_failure(
    result: std::result::Result<Value, FieldError>,
    key: &str,
    strict: bool,
    errors: &mut Errors,
    abort: fn(Errors) -> SchemaError,
) -> Result<Stored> {
    let mut failed = Errors::new();
    let partial = match result {
        Ok(value) => return Ok(Stored::Value(value)),
        Err(FieldError::Fatal(err)) => return Err(*err),
        Err(FieldError::Invalid(message)) => {
            trace!(field = %key, %message, "field failed");
            failed.insert_message(key, message);
            Value::Null
        }
        Err(FieldError::Nested { errors: nested, partial }) => {
            trace!(field = %key, "nested field failed");
            failed.insert_nested(key, nested);
            partial
        }
    };
    if strict {
        return Err(abort(failed));
    }
    errors.extend(failed);
    Ok(if partial.is_null() {
        Stored::Skip
    } else {
        Stored::Value(partial)
    })
}

/// Dumps objects through a field map
pub(crate) struct Marshaller<'a> {
    env: Env<'a>,
    prefix: &'a str,
    strict: bool,
    skip_missing: bool,
    errors: Errors,
}

impl<'a> Marshaller<'a> {
    pub fn new(env: Env<'a>) -> Self {
        Self {
            prefix: env.schema.prefix(),
            strict: env.schema.is_strict(),
            skip_missing: env.schema.opts().base().skip_missing,
            env,
            errors: Errors::new(),
        }
    }

    pub fn into_errors(self) -> Errors {
        self.errors
    }

    pub fn serialize(&mut self, obj: &Value, fields: &IndexMap<String, Field>, many: bool) -> Result<Value> {
        if !many || obj.is_null() {
            let mut errors = Errors::new();
            let data = self.serialize_one(obj, fields, &mut errors)?;
            self.errors.extend(errors);
            return Ok(data);
        }
        let Value::Array(items) = obj else {
            if self.strict {
                let mut errors = Errors::new();
                errors.push_message(SCHEMA_KEY, EXPECTED_LIST);
                return Err(SchemaError::Marshalling(errors));
            }
            self.errors.push_message(SCHEMA_KEY, EXPECTED_LIST);
            return Ok(Value::Array(Vec::new()));
        };
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let mut item_errors = Errors::new();
            out.push(self.serialize_one(item, fields, &mut item_errors)?);
            if !item_errors.is_empty() {
                self.errors.insert_nested(index.to_string(), item_errors);
            }
        }
        Ok(Value::Array(out))
    }

    fn serialize_one(&self, obj: &Value, fields: &IndexMap<String, Field>, errors: &mut Errors) -> Result<Value> {
        let mut out = Map::new();
        for (name, field) in fields {
            if self.skip_missing
                && field.reads_attribute()
                && field.get_value(name, obj, &self.env).is_null()
            {
                continue;
            }
            let key = format!("{}{}", self.prefix, name);
            let result = field.serialize(name, obj, &self.env);
            let value = match store_failure(result, &key, self.strict, errors, SchemaError::Marshalling)? {
                Stored::Value(value) => value,
                Stored::Skip => Value::Null,
            };
            out.insert(key, value);
        }
        Ok(Value::Object(out))
    }
}

/// Loads input data through a field map
pub(crate) struct Unmarshaller<'a> {
    env: Env<'a>,
    strict: bool,
    errors: Errors,
}

impl<'a> Unmarshaller<'a> {
    pub fn new(env: Env<'a>) -> Self {
        Self {
            strict: env.schema.is_strict(),
            env,
            errors: Errors::new(),
        }
    }

    pub fn into_errors(self) -> Errors {
        self.errors
    }

    pub fn deserialize(&mut self, data: &Value, fields: &IndexMap<String, Field>, many: bool) -> Result<Value> {
        if !many {
            let mut errors = Errors::new();
            let out = self.deserialize_one(data, fields, &mut errors)?;
            self.errors.extend(errors);
            return Ok(out);
        }
        let Value::Array(items) = data else {
            let mut errors = Errors::new();
            errors.push_message(SCHEMA_KEY, EXPECTED_LIST);
            if self.strict {
                return Err(SchemaError::Unmarshalling(errors));
            }
            self.errors.extend(errors);
            return Ok(Value::Array(Vec::new()));
        };
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let mut item_errors = Errors::new();
            out.push(self.deserialize_one(item, fields, &mut item_errors)?);
            if !item_errors.is_empty() {
                self.errors.insert_nested(index.to_string(), item_errors);
            }
        }
        Ok(Value::Array(out))
    }

    /// Input keys are visited in input order; keys naming no field are ignored
    fn deserialize_one(&self, data: &Value, fields: &IndexMap<String, Field>, errors: &mut Errors) -> Result<Value> {
        let Value::Object(input) = data else {
            let mut failed = Errors::new();
            failed.push_message(SCHEMA_KEY, INVALID_INPUT);
            if self.strict {
                return Err(SchemaError::Unmarshalling(failed));
            }
            errors.extend(failed);
            return Ok(Value::Object(Map::new()));
        };

        let mut out = Map::new();
        for (name, raw) in input {
            let Some(field) = fields.get(name) else {
                continue;
            };
            let key = field.load_key(name);
            let result = field.deserialize(name, raw, &self.env);
            if let Stored::Value(value) =
                store_failure(result, key, self.strict, errors, SchemaError::Unmarshalling)?
            {
                out.insert(key.to_string(), value);
            }
        }

        for (name, field) in fields {
            if field.is_required() && !input.contains_key(name) {
                let missing = Err(FieldError::invalid(MISSING_REQUIRED));
                store_failure(missing, field.load_key(name), self.strict, errors, SchemaError::Unmarshalling)?;
            }
        }
        Ok(Value::Object(out))
    }
}
