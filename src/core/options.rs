//! Schema options resolved from a declarative `Meta` block
//!
//! A schema carries a [`Meta`] map. When the schema is built, an options
//! type implementing [`SchemaOptions`] reads it attribute by attribute, each
//! with an explicit default. Custom options extend the recognized keys by
//! delegating to [`SchemaOpts::from_meta`] first:
//!
//! ```rust,ignore
//! #[derive(Debug)]
//! struct VersionedOpts {
//!     base: SchemaOpts,
//!     version: u64,
//! }
//!
//! impl SchemaOptions for VersionedOpts {
//!     fn from_meta(meta: &Meta) -> Result<Self> {
//!         Ok(Self {
//!             base: SchemaOpts::from_meta(meta)?,
//!             version: meta.get_u64("version")?.unwrap_or(1),
//!         })
//!     }
//!
//!     fn base(&self) -> &SchemaOpts {
//!         &self.base
//!     }
//!
//!     fn as_any(&self) -> &dyn Any {
//!         self
//!     }
//! }
//! ```

use crate::core::error::{Result, SchemaError};
use crate::core::inflect;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;

/// Declarative options block attached to a schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meta(Map<String, Value>);

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, builder style
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Keys of `other` override keys of `self`
    pub fn merge(&mut self, other: &Meta) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// A string option; null counts as absent
    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(wrong_type(key, "a string", other)),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(wrong_type(key, "a boolean", other)),
        }
    }

    pub fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_u64()
                .map(Some)
                .ok_or_else(|| wrong_type(key, "a non-negative integer", value)),
        }
    }

    /// A list of names; a single string is accepted as a one-element list
    pub fn get_str_list(&self, key: &str) -> Result<Vec<String>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(vec![s.clone()]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| wrong_type(key, "a list of strings", item))
                })
                .collect(),
            Some(other) => Err(wrong_type(key, "a list of strings", other)),
        }
    }
}

impl From<Map<String, Value>> for Meta {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn wrong_type(key: &str, expected: &str, found: &Value) -> SchemaError {
    SchemaError::Options(format!("Meta option '{}' must be {}, got {}", key, expected, found))
}

/// Options resolved from a [`Meta`] block when a schema is built
pub trait SchemaOptions: fmt::Debug + Send + Sync + 'static {
    /// Read the recognized attributes, falling back to defaults
    fn from_meta(meta: &Meta) -> Result<Self>
    where
        Self: Sized;

    /// The base options every schema relies on
    fn base(&self) -> &SchemaOpts;

    fn as_any(&self) -> &dyn Any;

    /// Transform dumped data after the data handlers ran
    fn postprocess(&self, data: Value, _many: bool) -> Value {
        data
    }

    /// Transform input data before any preprocessor runs
    fn preprocess(&self, data: Value, _many: bool) -> Value {
        data
    }
}

/// Options recognized by every schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaOpts {
    /// Explicit field selection and order; undeclared names are inferred
    pub fields: Vec<String>,
    /// Inferred fields appended to the declared ones
    pub additional: Vec<String>,
    pub exclude: Vec<String>,
    /// Default format for datetime fields without their own
    pub dateformat: Option<String>,
    pub strict: bool,
    /// Omit keys whose source value is missing or null
    pub skip_missing: bool,
}

impl SchemaOptions for SchemaOpts {
    fn from_meta(meta: &Meta) -> Result<Self> {
        let fields = meta.get_str_list("fields")?;
        let additional = meta.get_str_list("additional")?;
        if !fields.is_empty() && !additional.is_empty() {
            return Err(SchemaError::Options(
                "cannot set both 'fields' and 'additional'".to_string(),
            ));
        }
        Ok(Self {
            fields,
            additional,
            exclude: meta.get_str_list("exclude")?,
            dateformat: meta.get_str("dateformat")?.map(str::to_string),
            strict: meta.get_bool("strict")?.unwrap_or(false),
            skip_missing: meta.get_bool("skip_missing")?.unwrap_or(false),
        })
    }

    fn base(&self) -> &SchemaOpts {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Options that wrap dumped data in a namespace key
///
/// Single objects nest under `name`, collections under `plural_name`.
/// `plural_name` defaults to the plural of `name`; declaring only
/// `plural_name` derives `name` as its singular.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceOpts {
    pub base: SchemaOpts,
    pub name: Option<String>,
    pub plural_name: Option<String>,
}

impl NamespaceOpts {
    /// The key used for a single object or a collection
    pub fn key(&self, many: bool) -> Option<&str> {
        if many {
            self.plural_name.as_deref()
        } else {
            self.name.as_deref()
        }
    }
}

impl SchemaOptions for NamespaceOpts {
    fn from_meta(meta: &Meta) -> Result<Self> {
        let base = SchemaOpts::from_meta(meta)?;
        let name = meta.get_str("name")?.map(str::to_string);
        let plural_name = meta.get_str("plural_name")?.map(str::to_string);
        let (name, plural_name) = match (name, plural_name) {
            (Some(name), None) => {
                let plural = inflect::pluralize(&name);
                (Some(name), Some(plural))
            }
            (None, Some(plural)) => (Some(inflect::singularize(&plural)), Some(plural)),
            other => other,
        };
        Ok(Self {
            base,
            name,
            plural_name,
        })
    }

    fn base(&self) -> &SchemaOpts {
        &self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn postprocess(&self, data: Value, many: bool) -> Value {
        match self.key(many) {
            Some(key) => {
                let mut wrapped = Map::new();
                wrapped.insert(key.to_string(), data);
                Value::Object(wrapped)
            }
            None => data,
        }
    }

    fn preprocess(&self, data: Value, many: bool) -> Value {
        let Some(key) = self.key(many) else {
            return data;
        };
        match data {
            Value::Object(mut map) if map.len() == 1 && map.contains_key(key) => {
                map.remove(key).unwrap_or(Value::Null)
            }
            other => other,
        }
    }
}
