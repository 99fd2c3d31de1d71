//! Typed fields: how one attribute is dumped and loaded
//!
//! A [`Field`] pairs a [`FieldKind`] (the formatting and parsing rules) with
//! options shared by every kind: a default, a source attribute, an error
//! message override, validators and the required flag.
//!
//! ```rust,ignore
//! let schema = Schema::builder("UserSchema")
//!     .field("name", Field::string().required())
//!     .field("email", Field::email())
//!     .field("age", Field::integer().validate(validators::range(Some(0.0), None)))
//!     .field("joined", Field::datetime_format("rfc").attribute("created_at"))
//!     .field("friends", Field::nested_self().many().only(["name"]))
//!     .build()?;
//! ```

use crate::core::error::{FieldError, SchemaError};
use crate::core::errors::Errors;
use crate::core::hooks::Context;
use crate::core::marshal::{Env, Marshaller};
use crate::core::registry;
use crate::core::schema::Schema;
use crate::core::validators::{self, Validator};
use crate::core::value::{self, is_truthy, repr, to_text};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Number, Value, json};
use std::fmt::{self, Write as _};
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

/// Message stored when a required field is absent
pub const MISSING_REQUIRED: &str = "Missing data for required field.";

/// Strings that load as `false` for boolean fields
pub const DEFAULT_FALSY: [&str; 5] = ["False", "false", "0", "null", "None"];

/// Closure backing a function field: `(object, context)` → value
pub type FieldFunction = Arc<dyn Fn(&Value, &Context) -> Result<Value, String> + Send + Sync>;

/// Closure turning an input value into loaded data
pub type DeserializeFunction = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Where a nested field finds its schema
#[derive(Clone)]
pub enum NestedSchema {
    Schema(Arc<Schema>),
    /// Looked up in the registry each time it is used
    Named(String),
    /// The schema that owns the field
    SelfRef,
}

/// Which fields of a nested schema are emitted
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Only {
    #[default]
    All,
    /// Emit the bare value of one field instead of an object
    Field(String),
    Fields(Vec<String>),
}

#[derive(Clone)]
pub struct NestedField {
    pub schema: NestedSchema,
    pub only: Only,
    pub exclude: Vec<String>,
    pub many: bool,
    pub allow_null: bool,
}

#[derive(Clone)]
pub enum FieldKind {
    Raw,
    String,
    Uuid,
    Float {
        as_string: bool,
    },
    Integer {
        as_string: bool,
    },
    Boolean {
        truthy: Vec<String>,
        falsy: Vec<String>,
    },
    FormattedString(String),
    Arbitrary,
    Fixed {
        decimals: usize,
    },
    DateTime {
        format: Option<String>,
        local: bool,
    },
    Time,
    Date,
    TimeDelta,
    Url {
        relative: bool,
    },
    Email,
    Method {
        serialize: String,
        deserialize: Option<String>,
    },
    Function {
        serialize: FieldFunction,
        deserialize: Option<DeserializeFunction>,
    },
    Select(Vec<Value>),
    List(Box<Field>),
    Nested(NestedField),
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Raw => "raw",
            FieldKind::String => "string",
            FieldKind::Uuid => "uuid",
            FieldKind::Float { .. } => "float",
            FieldKind::Integer { .. } => "integer",
            FieldKind::Boolean { .. } => "boolean",
            FieldKind::FormattedString(_) => "formatted_string",
            FieldKind::Arbitrary => "arbitrary",
            FieldKind::Fixed { .. } => "fixed",
            FieldKind::DateTime { local: false, .. } => "datetime",
            FieldKind::DateTime { local: true, .. } => "local_datetime",
            FieldKind::Time => "time",
            FieldKind::Date => "date",
            FieldKind::TimeDelta => "timedelta",
            FieldKind::Url { .. } => "url",
            FieldKind::Email => "email",
            FieldKind::Method { .. } => "method",
            FieldKind::Function { .. } => "function",
            FieldKind::Select(_) => "select",
            FieldKind::List(_) => "list",
            FieldKind::Nested(_) => "nested",
        }
    }

    /// Method and function fields compute their value from the whole object
    fn reads_attribute(&self) -> bool {
        !matches!(self, FieldKind::Method { .. } | FieldKind::Function { .. })
    }
}

/// A named, typed unit of serialization and validation
#[derive(Clone)]
pub struct Field {
    kind: FieldKind,
    default: Option<Value>,
    attribute: Option<String>,
    error: Option<String>,
    validators: Vec<Validator>,
    required: bool,
}

impl Field {
    fn with_default(kind: FieldKind, default: Option<Value>) -> Self {
        Self {
            kind,
            default,
            attribute: None,
            error: None,
            validators: Vec::new(),
            required: false,
        }
    }

    fn of(kind: FieldKind) -> Self {
        Self::with_default(kind, Some(Value::Null))
    }

    // === Constructors ===

    /// Passes values through untouched
    pub fn raw() -> Self {
        Self::of(FieldKind::Raw)
    }

    pub fn string() -> Self {
        Self::with_default(FieldKind::String, Some(json!("")))
    }

    pub fn uuid() -> Self {
        Self::of(FieldKind::Uuid)
    }

    pub fn float() -> Self {
        Self::with_default(FieldKind::Float { as_string: false }, Some(json!(0.0)))
    }

    /// Alias of [`Field::float`]
    pub fn number() -> Self {
        Self::float()
    }

    pub fn integer() -> Self {
        Self::with_default(FieldKind::Integer { as_string: false }, Some(json!(0)))
    }

    pub fn boolean() -> Self {
        Self::of(FieldKind::Boolean {
            truthy: Vec::new(),
            falsy: DEFAULT_FALSY.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Interpolates `{key}` placeholders from the dumped object
    pub fn formatted_string(template: impl Into<String>) -> Self {
        Self::of(FieldKind::FormattedString(template.into()))
    }

    /// A number rendered as its shortest exact decimal string
    pub fn arbitrary() -> Self {
        Self::with_default(FieldKind::Arbitrary, Some(json!(0)))
    }

    /// A number rendered as a string with `decimals` places
    pub fn fixed(decimals: usize) -> Self {
        Self::with_default(FieldKind::Fixed { decimals }, Some(json!(0)))
    }

    pub fn price() -> Self {
        Self::fixed(2)
    }

    /// UTC datetime, using the schema `dateformat` or ISO 8601
    pub fn datetime() -> Self {
        Self::of(FieldKind::DateTime {
            format: None,
            local: false,
        })
    }

    /// `"iso"`, `"rfc"` or a strftime format string
    pub fn datetime_format(format: impl Into<String>) -> Self {
        Self::of(FieldKind::DateTime {
            format: Some(format.into()),
            local: false,
        })
    }

    /// Datetime rendered in the local timezone
    pub fn local_datetime() -> Self {
        Self::of(FieldKind::DateTime {
            format: None,
            local: true,
        })
    }

    pub fn time() -> Self {
        Self::of(FieldKind::Time)
    }

    pub fn date() -> Self {
        Self::of(FieldKind::Date)
    }

    /// Dumps total seconds; loads `{secs, nanos}`
    pub fn timedelta() -> Self {
        Self::of(FieldKind::TimeDelta)
    }

    pub fn url() -> Self {
        Self::of(FieldKind::Url { relative: false })
    }

    pub fn relative_url() -> Self {
        Self::of(FieldKind::Url { relative: true })
    }

    pub fn email() -> Self {
        Self::of(FieldKind::Email)
    }

    /// Value computed by the schema method registered under `name`
    pub fn method(name: impl Into<String>) -> Self {
        Self::of(FieldKind::Method {
            serialize: name.into(),
            deserialize: None,
        })
    }

    /// Like [`Field::method`], loading through the method named `deserialize`
    pub fn method_with_deserialize(name: impl Into<String>, deserialize: impl Into<String>) -> Self {
        Self::of(FieldKind::Method {
            serialize: name.into(),
            deserialize: Some(deserialize.into()),
        })
    }

    pub fn function<F>(serialize: F) -> Self
    where
        F: Fn(&Value, &Context) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self::of(FieldKind::Function {
            serialize: Arc::new(serialize),
            deserialize: None,
        })
    }

    pub fn function_with_deserialize<F, D>(serialize: F, deserialize: D) -> Self
    where
        F: Fn(&Value, &Context) -> Result<Value, String> + Send + Sync + 'static,
        D: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self::of(FieldKind::Function {
            serialize: Arc::new(serialize),
            deserialize: Some(Arc::new(deserialize)),
        })
    }

    /// Value constrained to `choices`
    pub fn select<I, V>(choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::of(FieldKind::Select(choices.into_iter().map(Into::into).collect()))
    }

    pub fn list(item: Field) -> Self {
        Self::of(FieldKind::List(Box::new(item)))
    }

    pub fn nested(schema: impl Into<Arc<Schema>>) -> Self {
        Self::nested_from(NestedSchema::Schema(schema.into()))
    }

    /// Nest a schema registered under `name`; `"self"` nests the owning schema
    pub fn nested_named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == "self" {
            Self::nested_self()
        } else {
            Self::nested_from(NestedSchema::Named(name))
        }
    }

    pub fn nested_self() -> Self {
        Self::nested_from(NestedSchema::SelfRef)
    }

    fn nested_from(schema: NestedSchema) -> Self {
        Self::with_default(
            FieldKind::Nested(NestedField {
                schema,
                only: Only::All,
                exclude: Vec::new(),
                many: false,
                allow_null: false,
            }),
            None,
        )
    }

    /// Pick a field kind from the shape of a sample value
    pub fn infer(sample: &Value) -> Self {
        match sample {
            Value::String(_) => Self::string(),
            Value::Bool(_) => Self::boolean(),
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::integer(),
            Value::Number(_) => Self::float(),
            _ => Self::raw(),
        }
    }

    // === Options ===

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Read the value from `attribute` instead of the field name
    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Replace any failure message of this field
    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn validate<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Number kinds: emit the number as a string
    pub fn as_string(mut self) -> Self {
        match &mut self.kind {
            FieldKind::Float { as_string } | FieldKind::Integer { as_string } => *as_string = true,
            _ => {}
        }
        self
    }

    /// Boolean kind: only these strings load as `true`
    pub fn truthy<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let FieldKind::Boolean { truthy, .. } = &mut self.kind {
            *truthy = values.into_iter().map(Into::into).collect();
        }
        self
    }

    pub fn falsy<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let FieldKind::Boolean { falsy, .. } = &mut self.kind {
            *falsy = values.into_iter().map(Into::into).collect();
        }
        self
    }

    /// Nested kind: the value is a collection
    pub fn many(mut self) -> Self {
        if let FieldKind::Nested(nested) = &mut self.kind {
            nested.many = true;
        }
        self
    }

    pub fn only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let FieldKind::Nested(nested) = &mut self.kind {
            nested.only = Only::Fields(names.into_iter().map(Into::into).collect());
        }
        self
    }

    /// Nested kind: emit the bare value of one nested field
    pub fn only_field(mut self, name: impl Into<String>) -> Self {
        if let FieldKind::Nested(nested) = &mut self.kind {
            nested.only = Only::Field(name.into());
        }
        self
    }

    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let FieldKind::Nested(nested) = &mut self.kind {
            nested.exclude = names.into_iter().map(Into::into).collect();
        }
        self
    }

    /// Nested kind: dump a null object as null instead of an object of defaults
    pub fn allow_null(mut self) -> Self {
        if let FieldKind::Nested(nested) = &mut self.kind {
            nested.allow_null = true;
        }
        self
    }

    // === Accessors ===

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn attribute_name(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Key under which loaded data is stored
    pub(crate) fn load_key<'a>(&'a self, name: &'a str) -> &'a str {
        self.attribute.as_deref().unwrap_or(name)
    }

    // === Dump ===

    /// Raw value of the attribute backing this field, null when missing
    pub(crate) fn get_value(&self, name: &str, obj: &Value, env: &Env<'_>) -> Value {
        let key = self.attribute.as_deref().unwrap_or(name);
        match env.schema.hooks().accessor() {
            Some(accessor) => accessor(env.schema, key, obj).unwrap_or(Value::Null),
            None => value::get_value(key, obj).cloned().unwrap_or(Value::Null),
        }
    }

    pub(crate) fn reads_attribute(&self) -> bool {
        self.kind.reads_attribute()
    }

    pub(crate) fn serialize(&self, name: &str, obj: &Value, env: &Env<'_>) -> Result<Value, FieldError> {
        let value = self.get_value(name, obj, env);
        self.serialize_value(&value, name, obj, env)
    }

    fn serialize_value(
        &self,
        value: &Value,
        name: &str,
        obj: &Value,
        env: &Env<'_>,
    ) -> Result<Value, FieldError> {
        if value.is_null() && self.kind.reads_attribute() {
            if self.required {
                return Err(FieldError::invalid(MISSING_REQUIRED));
            }
            if let Some(default) = &self.default {
                return self.format(default, obj, env);
            }
        }
        let output = self.format(value, obj, env);
        self.checked(name, output)
    }

    /// Format a value according to the field kind
    fn format(&self, value: &Value, obj: &Value, env: &Env<'_>) -> Result<Value, FieldError> {
        match &self.kind {
            FieldKind::Raw => Ok(value.clone()),
            FieldKind::String => Ok(match value {
                Value::Null => Value::Null,
                other => Value::String(to_text(other)),
            }),
            FieldKind::Uuid => parse_uuid(value),
            FieldKind::Float { as_string } => format_float(value, *as_string),
            FieldKind::Integer { as_string } => format_integer(value, *as_string),
            FieldKind::Boolean { .. } => Ok(Value::Bool(is_truthy(value))),
            FieldKind::FormattedString(template) => interpolate(template, obj),
            FieldKind::Arbitrary => format_arbitrary(value),
            FieldKind::Fixed { decimals } => format_fixed(value, *decimals),
            FieldKind::DateTime { format, local } => {
                if !is_truthy(value) {
                    return Ok(Value::Null);
                }
                let format = format.as_deref().or(env.dateformat()).unwrap_or("iso");
                format_datetime(value, format, *local)
            }
            FieldKind::Time => format_time(value),
            FieldKind::Date => format_date(value),
            FieldKind::TimeDelta => format_timedelta(value),
            FieldKind::Url { relative } => match value.as_str() {
                None if value.is_null() => Ok(Value::Null),
                Some("") => Ok(Value::Null),
                _ => validators::url(&to_text(value), *relative)
                    .map(Value::String)
                    .map_err(FieldError::Invalid),
            },
            FieldKind::Email => match value.as_str() {
                None if value.is_null() => Ok(Value::Null),
                Some("") => Ok(Value::Null),
                _ => validators::email(&to_text(value))
                    .map(Value::String)
                    .map_err(FieldError::Invalid),
            },
            FieldKind::Method { serialize, .. } => call_method(env, serialize, obj),
            FieldKind::Function { serialize, .. } => {
                serialize(obj, env.context).map_err(FieldError::Invalid)
            }
            FieldKind::Select(choices) => check_choice(value, choices),
            FieldKind::List(item) => match value {
                Value::Null => Ok(Value::Null),
                Value::Array(items) => collect_items(items.iter().enumerate().map(|(index, element)| {
                    item.serialize_value(element, &index.to_string(), value, env)
                })),
                single => collect_items(std::iter::once(item.serialize_value(single, "0", value, env))),
            },
            FieldKind::Nested(nested) => serialize_nested(nested, value, env),
        }
    }

    /// Run validators on a successful output and apply the error override
    fn checked(&self, name: &str, output: Result<Value, FieldError>) -> Result<Value, FieldError> {
        let output = match output {
            Ok(value) => self
                .validators
                .iter()
                .try_for_each(|validator| validator(name, &value))
                .map(|()| value)
                .map_err(FieldError::Invalid),
            Err(err) => Err(err),
        };
        match (output, &self.error) {
            (Err(FieldError::Invalid(_)), Some(message)) => Err(FieldError::Invalid(message.clone())),
            (other, _) => other,
        }
    }

    // === Load ===

    pub(crate) fn deserialize(&self, name: &str, value: &Value, env: &Env<'_>) -> Result<Value, FieldError> {
        let output = self.parse(value, env);
        self.checked(name, output)
    }

    fn parse(&self, value: &Value, env: &Env<'_>) -> Result<Value, FieldError> {
        match &self.kind {
            FieldKind::Raw | FieldKind::FormattedString(_) => Ok(value.clone()),
            FieldKind::String => Ok(match value {
                Value::Null => self.default_or_null(),
                other => Value::String(to_text(other)),
            }),
            FieldKind::Uuid => parse_uuid(value),
            FieldKind::Float { as_string } => match value {
                Value::Null => Ok(self.default_or_null()),
                other => format_float(other, *as_string),
            },
            FieldKind::Integer { as_string } => match value {
                Value::Null => Ok(self.default_or_null()),
                other => format_integer(other, *as_string),
            },
            FieldKind::Boolean { truthy, falsy } => parse_boolean(value, truthy, falsy),
            FieldKind::Arbitrary => format_arbitrary(self.or_default(value)),
            FieldKind::Fixed { decimals } => format_fixed(self.or_default(value), *decimals),
            FieldKind::DateTime { format, .. } => {
                parse_datetime(value, format.as_deref().or(env.dateformat()))
            }
            FieldKind::Time => parse_time(value),
            FieldKind::Date => parse_date(value),
            FieldKind::TimeDelta => parse_timedelta(value),
            FieldKind::Url { relative } => match value {
                Value::Null => Ok(self.default_or_null()),
                other => validators::url(&to_text(other), *relative)
                    .map(Value::String)
                    .map_err(FieldError::Invalid),
            },
            FieldKind::Email => validators::email(value.as_str().unwrap_or(&repr(value)))
                .map(Value::String)
                .map_err(FieldError::Invalid),
            FieldKind::Method { deserialize, .. } => match deserialize {
                Some(method) => call_method(env, method, value),
                None => Ok(value.clone()),
            },
            FieldKind::Function { deserialize, .. } => match deserialize {
                Some(function) => function(value).map_err(FieldError::Invalid),
                None => Ok(value.clone()),
            },
            FieldKind::Select(choices) => check_choice(value, choices),
            FieldKind::List(item) => match value {
                Value::Null => Ok(self.default_or_null()),
                Value::Array(items) => collect_items(
                    items
                        .iter()
                        .enumerate()
                        .map(|(index, element)| item.deserialize(&index.to_string(), element, env)),
                ),
                _ => Err(FieldError::invalid("Not a valid list.")),
            },
            FieldKind::Nested(nested) => deserialize_nested(nested, value, env),
        }
    }

    fn default_or_null(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }

    fn or_default<'a>(&'a self, value: &'a Value) -> &'a Value {
        match (value, &self.default) {
            (Value::Null, Some(default)) => default,
            _ => value,
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("kind", &self.kind.name())
            .field("default", &self.default)
            .field("attribute", &self.attribute)
            .field("required", &self.required)
            .field("validators", &self.validators.len())
            .finish()
    }
}

// === Kind helpers ===

fn to_f64(value: &Value) -> Result<f64, FieldError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| FieldError::invalid(format!("{} is not a valid number.", n))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| FieldError::invalid(format!("could not convert string to float: {}", repr(value)))),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(FieldError::invalid(format!("{} is not a valid number.", repr(other)))),
    }
}

fn to_i64(value: &Value) -> Result<i64, FieldError> {
    match value {
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(i),
            (None, Some(f)) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(f.trunc() as i64),
            _ => Err(FieldError::invalid(format!("{} is not a valid integer.", n))),
        },
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| FieldError::invalid(format!("invalid literal for integer: {}", repr(value)))),
        Value::Bool(b) => Ok(i64::from(*b)),
        other => Err(FieldError::invalid(format!("{} is not a valid integer.", repr(other)))),
    }
}

fn format_float(value: &Value, as_string: bool) -> Result<Value, FieldError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let num = to_f64(value)?;
    if as_string {
        return Ok(Value::String(format!("{:?}", num)));
    }
    Number::from_f64(num)
        .map(Value::Number)
        .ok_or_else(|| FieldError::invalid(format!("{} is not a finite number.", num)))
}

fn format_integer(value: &Value, as_string: bool) -> Result<Value, FieldError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let num = to_i64(value)?;
    Ok(if as_string {
        Value::String(num.to_string())
    } else {
        json!(num)
    })
}

fn format_arbitrary(value: &Value) -> Result<Value, FieldError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let num = to_f64(value)?;
    if !num.is_finite() {
        return Err(FieldError::invalid(format!("{} is not a finite number.", num)));
    }
    Ok(Value::String(num.to_string()))
}

/// Round half to even on the binary value, as decimal quantization does
fn format_fixed(value: &Value, decimals: usize) -> Result<Value, FieldError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let num = to_f64(value)?;
    if !num.is_finite() || (num != 0.0 && !num.is_normal()) {
        return Err(FieldError::invalid("Invalid Fixed precision number."));
    }
    Ok(Value::String(format!("{:.*}", decimals, num)))
}

fn parse_uuid(value: &Value) -> Result<Value, FieldError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::String(s) => Uuid::parse_str(s.trim())
            .map(|id| Value::String(id.hyphenated().to_string()))
            .map_err(|_| FieldError::invalid(format!("{} is not a valid UUID.", repr(value)))),
        other => Err(FieldError::invalid(format!("{} is not a valid UUID.", repr(other)))),
    }
}

fn parse_boolean(value: &Value, truthy: &[String], falsy: &[String]) -> Result<Value, FieldError> {
    if !is_truthy(value) {
        return Ok(Value::Bool(false));
    }
    let text = match value {
        Value::Bool(true) => "True".to_string(),
        other => to_text(other),
    };
    if falsy.contains(&text) {
        return Ok(Value::Bool(false));
    }
    if !truthy.is_empty() && !truthy.contains(&text) {
        return Err(FieldError::invalid(format!(
            "{:?} is not in {:?} nor {:?}",
            text, truthy, falsy
        )));
    }
    Ok(Value::Bool(true))
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{([A-Za-z_][A-Za-z0-9_.]*)\}").expect("placeholder regex is valid")
    })
}

fn interpolate(template: &str, obj: &Value) -> Result<Value, FieldError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for captures in placeholder().captures_iter(template) {
        let (Some(whole), Some(key)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let found = value::get_value(key.as_str(), obj).ok_or_else(|| {
            FieldError::invalid(format!("missing key {:?} for formatted string", key.as_str()))
        })?;
        out.push_str(&template[last..whole.start()]);
        out.push_str(&to_text(found));
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(Value::String(out))
}

fn input_datetime(value: &Value) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .or_else(|_| DateTime::parse_from_rfc2822(s))
                .ok()
                .or_else(|| naive_datetime(s).map(|naive| naive.and_utc().fixed_offset()))
        }
        Value::Number(n) => {
            let secs = n.as_f64()?;
            let whole = secs.floor();
            let nanos = ((secs - whole) * 1e9).round() as u32;
            DateTime::<Utc>::from_timestamp(whole as i64, nanos.min(999_999_999)).map(|dt| dt.fixed_offset())
        }
        _ => None,
    }
}

fn naive_datetime(s: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}

fn strftime(dt: &DateTime<FixedOffset>, format: &str) -> Result<String, FieldError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(FieldError::invalid(format!("invalid date format {:?}", format)));
    }
    let mut out = String::new();
    write!(out, "{}", dt.format(format))
        .map_err(|_| FieldError::invalid(format!("invalid date format {:?}", format)))?;
    Ok(out)
}

fn format_datetime(value: &Value, format: &str, local: bool) -> Result<Value, FieldError> {
    let parsed = input_datetime(value).ok_or_else(|| {
        FieldError::invalid(format!("{} cannot be formatted as a datetime.", repr(value)))
    })?;
    let dt = if local {
        parsed.with_timezone(&Local).fixed_offset()
    } else {
        parsed.with_timezone(&Utc).fixed_offset()
    };
    let text = match format {
        "iso" | "iso8601" => dt.to_rfc3339(),
        "rfc" | "rfc822" if local => strftime(&dt, "%a, %d %b %Y %H:%M:%S %z")?,
        "rfc" | "rfc822" => strftime(&dt, "%a, %d %b %Y %H:%M:%S -0000")?,
        custom => strftime(&dt, custom)?,
    };
    Ok(Value::String(text))
}

fn parse_datetime(value: &Value, format: Option<&str>) -> Result<Value, FieldError> {
    let error = || FieldError::invalid(format!("Cannot deserialize {} to a datetime", repr(value)));
    let text = value.as_str().map(str::trim).ok_or_else(error)?;
    let parsed = match format {
        None | Some("iso" | "iso8601") => DateTime::parse_from_rfc3339(text)
            .ok()
            .or_else(|| naive_datetime(text).map(|naive| naive.and_utc().fixed_offset())),
        Some("rfc" | "rfc822") => DateTime::parse_from_rfc2822(text).ok(),
        Some(custom) => DateTime::parse_from_str(text, custom)
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(text, custom)
                    .ok()
                    .map(|naive| naive.and_utc().fixed_offset())
            })
            .or_else(|| input_datetime(value)),
    };
    parsed.map(|dt| Value::String(dt.to_rfc3339())).ok_or_else(error)
}

fn input_time(value: &Value) -> Option<NaiveTime> {
    let text = value.as_str()?.trim();
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
        .or_else(|| input_datetime(value).map(|dt| dt.time()))
}

fn render_time(time: NaiveTime) -> String {
    if time.nanosecond() == 0 {
        time.format("%H:%M:%S").to_string()
    } else {
        time.format("%H:%M:%S%.3f").to_string()
    }
}

fn format_time(value: &Value) -> Result<Value, FieldError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    input_time(value)
        .map(|time| Value::String(render_time(time)))
        .ok_or_else(|| FieldError::invalid(format!("{} cannot be formatted as a time.", repr(value))))
}

fn parse_time(value: &Value) -> Result<Value, FieldError> {
    input_time(value)
        .map(|time| Value::String(time.format("%H:%M:%S%.f").to_string()))
        .ok_or_else(|| {
            FieldError::invalid(format!("Could not deserialize {} to a time object.", repr(value)))
        })
}

fn input_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| input_datetime(value).map(|dt| dt.date_naive()))
}

fn format_date(value: &Value) -> Result<Value, FieldError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    input_date(value)
        .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
        .ok_or_else(|| FieldError::invalid(format!("{} cannot be formatted as a date.", repr(value))))
}

fn parse_date(value: &Value) -> Result<Value, FieldError> {
    input_date(value)
        .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
        .ok_or_else(|| {
            FieldError::invalid(format!("Could not deserialize {} to a date object.", repr(value)))
        })
}

/// Accepts seconds or a serialized `std::time::Duration` (`{secs, nanos}`)
fn total_seconds(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Object(map) => {
            let secs = map.get("secs")?.as_f64()?;
            let nanos = map.get("nanos").and_then(Value::as_f64).unwrap_or(0.0);
            Some(secs + nanos / 1e9)
        }
        _ => None,
    }
}

fn format_timedelta(value: &Value) -> Result<Value, FieldError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    total_seconds(value)
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| {
            FieldError::invalid(format!("{} cannot be formatted as a timedelta.", repr(value)))
        })
}

fn parse_timedelta(value: &Value) -> Result<Value, FieldError> {
    let seconds = match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        other => total_seconds(other),
    };
    match seconds.and_then(|secs| std::time::Duration::try_from_secs_f64(secs).ok()) {
        Some(duration) => Ok(json!({ "secs": duration.as_secs(), "nanos": duration.subsec_nanos() })),
        None => Err(FieldError::invalid(format!(
            "Cannot deserialize {} to a timedelta",
            repr(value)
        ))),
    }
}

fn check_choice(value: &Value, choices: &[Value]) -> Result<Value, FieldError> {
    if choices.contains(value) {
        Ok(value.clone())
    } else {
        Err(FieldError::invalid(format!(
            "{} is not a valid choice for this field.",
            repr(value)
        )))
    }
}

fn call_method(env: &Env<'_>, name: &str, value: &Value) -> Result<Value, FieldError> {
    let method = env.schema.method(name).ok_or_else(|| {
        FieldError::invalid(format!(
            "schema {:?} has no method named {:?}",
            env.schema.name(),
            name
        ))
    })?;
    method(value, env.context).map_err(FieldError::Invalid)
}

/// Gather per-item results; item failures are keyed by index
fn collect_items<I>(results: I) -> Result<Value, FieldError>
where
    I: Iterator<Item = Result<Value, FieldError>>,
{
    let mut items = Vec::new();
    let mut errors = Errors::new();
    for (index, result) in results.enumerate() {
        match result {
            Ok(value) => items.push(value),
            Err(FieldError::Invalid(message)) => {
                errors.insert_message(index.to_string(), message);
                items.push(Value::Null);
            }
            Err(FieldError::Nested { errors: nested, partial }) => {
                errors.insert_nested(index.to_string(), nested);
                items.push(partial);
            }
            Err(fatal @ FieldError::Fatal(_)) => return Err(fatal),
        }
    }
    if errors.is_empty() {
        Ok(Value::Array(items))
    } else {
        Err(FieldError::Nested {
            errors,
            partial: Value::Array(items),
        })
    }
}

fn with_nested_schema<T>(
    nested: &NestedField,
    env: &Env<'_>,
    run: impl FnOnce(&Schema) -> Result<T, FieldError>,
) -> Result<T, FieldError> {
    match &nested.schema {
        NestedSchema::Schema(schema) => run(schema),
        NestedSchema::Named(name) => {
            let schema = registry::get(name)?;
            run(&schema)
        }
        NestedSchema::SelfRef => run(env.schema),
    }
}

/// Apply `only`/`exclude` to the nested schema's fields; `only` wins
fn select_fields(nested: &NestedField, all: IndexMap<String, Field>) -> IndexMap<String, Field> {
    match &nested.only {
        Only::Field(name) => all.into_iter().filter(|(key, _)| key == name).collect(),
        Only::Fields(names) => all
            .into_iter()
            .filter(|(key, _)| names.contains(key))
            .collect(),
        Only::All => all
            .into_iter()
            .filter(|(key, _)| !nested.exclude.contains(key))
            .collect(),
    }
}

fn serialize_nested(nested: &NestedField, value: &Value, env: &Env<'_>) -> Result<Value, FieldError> {
    if value.is_null() && (nested.allow_null || matches!(nested.schema, NestedSchema::SelfRef)) {
        return Ok(Value::Null);
    }
    let (data, errors) = with_nested_schema(nested, env, |schema| {
        let fields = select_fields(nested, schema.fields_for(value));
        if let Only::Field(name) = &nested.only {
            if !fields.contains_key(name) {
                return Err(FieldError::invalid(format!(
                    "{} has no field named {:?}.",
                    schema.name(),
                    name
                )));
            }
        }
        let mut context: Context = schema.context().clone();
        context.extend(env.context.iter().map(|(k, v)| (k.clone(), v.clone())));
        let nested_env = Env::new(schema, &context);
        let mut marshaller = Marshaller::new(nested_env);
        match marshaller.serialize(value, &fields, nested.many) {
            Ok(data) => Ok((data, marshaller.into_errors())),
            Err(SchemaError::Marshalling(errors)) => Ok((Value::Null, errors)),
            Err(other) => Err(FieldError::from(other)),
        }
    })?;

    let data = match &nested.only {
        Only::Field(name) => pluck(data, name, nested.many),
        _ => data,
    };
    if errors.is_empty() {
        Ok(data)
    } else {
        Err(FieldError::Nested {
            errors,
            partial: data,
        })
    }
}

fn pluck(data: Value, key: &str, many: bool) -> Value {
    let take = |item: Value| match item {
        Value::Object(mut map) => map.remove(key).unwrap_or(Value::Null),
        _ => Value::Null,
    };
    match data {
        Value::Array(items) if many => Value::Array(items.into_iter().map(take).collect()),
        other => take(other),
    }
}

fn deserialize_nested(nested: &NestedField, value: &Value, env: &Env<'_>) -> Result<Value, FieldError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let result = with_nested_schema(nested, env, |schema| {
        schema
            .load_with(value, Some(nested.many))
            .or_else(|err| match err {
                SchemaError::Unmarshalling(errors) => Ok(crate::core::schema::UnmarshalResult {
                    data: Value::Object(Map::new()),
                    errors,
                }),
                other => Err(other),
            })
            .map_err(FieldError::from)
    })?;
    if result.errors.is_empty() {
        Ok(result.data)
    } else {
        Err(FieldError::Nested {
            errors: result.errors,
            partial: result.data,
        })
    }
}
