//! Schemas: declared fields, resolved options and registered hooks
//!
//! A [`Schema`] is assembled with a [`SchemaBuilder`] and is immutable once
//! built. Subclassing is modelled by [`Schema::extend`], which starts a new
//! builder carrying the parent's fields, `Meta`, options type, hooks and
//! methods.
//!
//! # Dump pipeline
//!
//! 1. select fields (declared, `Meta.fields`/`additional`, `exclude`, `only`)
//! 2. serialize every field, collecting failures into [`Errors`]
//! 3. merge `extra` keys into each serialized object
//! 4. call the error handler when errors were collected
//! 5. pass the data through every data handler, in order
//! 6. let the options post-process the result (namespacing)
//!
//! # Load pipeline
//!
//! Options pre-processing, then preprocessors, then field deserialization,
//! then schema validators, then the error handler.

use crate::core::error::{Result, SchemaError};
use crate::core::errors::{Errors, SCHEMA_KEY};
use crate::core::field::Field;
use crate::core::hooks::{
    Accessor, Context, DataHandler, ErrorHandler, Hooks, Preprocessor, SchemaMethod, SchemaValidator,
};
use crate::core::marshal::{Env, Marshaller, Unmarshaller};
use crate::core::options::{Meta, SchemaOptions, SchemaOpts};
use crate::core::registry;
use crate::core::value;
use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

/// Builds the options object of a schema from its `Meta` block
pub(crate) type OptionsResolver = Arc<dyn Fn(&Meta) -> Result<Arc<dyn SchemaOptions>> + Send + Sync>;

fn resolver_for<O: SchemaOptions>() -> OptionsResolver {
    Arc::new(|meta: &Meta| {
        let opts = O::from_meta(meta)?;
        Ok(Arc::new(opts) as Arc<dyn SchemaOptions>)
    })
}

/// Output of a dump: serialized data plus the errors collected on the way
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarshalResult<T = Value> {
    pub data: T,
    pub errors: Errors,
}

/// Output of a load: deserialized data plus the errors collected on the way
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmarshalResult<T = Value> {
    pub data: T,
    pub errors: Errors,
}

impl<T> MarshalResult<T> {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl<T> UnmarshalResult<T> {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A built schema
#[derive(Clone)]
pub struct Schema {
    name: String,
    declared_fields: IndexMap<String, Field>,
    meta: Meta,
    opts: Arc<dyn SchemaOptions>,
    resolver: OptionsResolver,
    hooks: Hooks,
    methods: IndexMap<String, SchemaMethod>,
    many: bool,
    strict: bool,
    only: Vec<String>,
    exclude: Vec<String>,
    prefix: String,
    context: Context,
    extra: Option<Map<String, Value>>,
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// Start a child schema inheriting fields, `Meta`, options type, hooks and methods
    ///
    /// Instance parameters (`many`, `strict`, `only`, context...) are not inherited.
    pub fn extend(&self, name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            fields: self.declared_fields.clone(),
            meta: self.meta.clone(),
            resolver: Arc::clone(&self.resolver),
            hooks: self.hooks.clone(),
            methods: self.methods.clone(),
            ..SchemaBuilder::new(name)
        }
    }

    /// Register this schema in the global registry
    pub fn register(self) -> Arc<Schema> {
        registry::register(self)
    }

    // === Accessors ===

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields declared on the schema, in declaration order
    pub fn declared_fields(&self) -> &IndexMap<String, Field> {
        &self.declared_fields
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn opts(&self) -> &dyn SchemaOptions {
        self.opts.as_ref()
    }

    /// The resolved options as their concrete type
    pub fn opts_as<O: SchemaOptions>(&self) -> Option<&O> {
        self.opts.as_any().downcast_ref::<O>()
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn method(&self, name: &str) -> Option<&SchemaMethod> {
        self.methods.get(name)
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_many(&self) -> bool {
        self.many
    }

    /// Strict when requested on the instance or by the `Meta` block
    pub fn is_strict(&self) -> bool {
        self.strict || self.opts.base().strict
    }

    // === Instance variants ===

    pub fn with_many(mut self, many: bool) -> Self {
        self.many = many;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    // === Field selection ===

    /// Fields used for `obj`; names inferred from `Meta` read the first item of a collection
    pub(crate) fn fields_for(&self, obj: &Value) -> IndexMap<String, Field> {
        static NULL: Value = Value::Null;
        let sample = match obj {
            Value::Array(items) => items.first().unwrap_or(&NULL),
            other => other,
        };
        let infer = |name: &str| Field::infer(value::get_value(name, sample).unwrap_or(&NULL));
        let opts: &SchemaOpts = self.opts.base();

        let mut fields: IndexMap<String, Field> = if opts.fields.is_empty() {
            let mut fields = self.declared_fields.clone();
            for name in &opts.additional {
                if !fields.contains_key(name) {
                    fields.insert(name.clone(), infer(name));
                }
            }
            fields
        } else {
            opts.fields
                .iter()
                .map(|name| {
                    let field = self.declared_fields.get(name).cloned().unwrap_or_else(|| infer(name));
                    (name.clone(), field)
                })
                .collect()
        };

        for name in opts.exclude.iter().chain(&self.exclude) {
            fields.shift_remove(name);
        }
        if !self.only.is_empty() {
            fields.retain(|name, _| self.only.contains(name));
        }
        fields
    }

    // === Dump ===

    /// Serialize any `Serialize` value
    pub fn dump<T: Serialize + ?Sized>(&self, obj: &T) -> Result<MarshalResult> {
        let value = serde_json::to_value(obj)?;
        self.dump_with(&value, None)
    }

    /// Serialize a collection regardless of the instance `many` flag
    pub fn dump_many<T: Serialize>(&self, objs: &[T]) -> Result<MarshalResult> {
        let value = serde_json::to_value(objs)?;
        self.dump_with(&value, Some(true))
    }

    pub fn dump_value(&self, obj: &Value) -> Result<MarshalResult> {
        self.dump_with(obj, None)
    }

    /// Dump and encode the data as a JSON string
    pub fn dumps<T: Serialize + ?Sized>(&self, obj: &T) -> Result<MarshalResult<String>> {
        let MarshalResult { data, errors } = self.dump(obj)?;
        Ok(MarshalResult {
            data: serde_json::to_string(&data)?,
            errors,
        })
    }

    /// Dump with an explicit `many`; `None` uses the instance flag
    pub fn dump_with(&self, obj: &Value, many: Option<bool>) -> Result<MarshalResult> {
        let many = many.unwrap_or(self.many);
        let fields = self.fields_for(obj);
        debug!(schema = %self.name, many, fields = fields.len(), "dumping");

        let env = Env::new(self, &self.context);
        let mut marshaller = Marshaller::new(env);
        let mut data = marshaller.serialize(obj, &fields, many)?;
        let errors = marshaller.into_errors();

        if let Some(extra) = &self.extra {
            merge_extra(&mut data, extra);
        }
        if !errors.is_empty() {
            debug!(schema = %self.name, errors = errors.len(), "dump collected errors");
        }
        self.hooks.handle_errors(self, &errors, obj)?;
        let data = self.hooks.apply_data_handlers(self, data, obj)?;
        let data = self.opts.postprocess(data, many);
        Ok(MarshalResult { data, errors })
    }

    // === Load ===

    pub fn load(&self, data: &Value) -> Result<UnmarshalResult> {
        self.load_with(data, None)
    }

    /// Decode a JSON string, then load it
    pub fn loads(&self, json: &str) -> Result<UnmarshalResult> {
        let value: Value = serde_json::from_str(json)?;
        self.load(&value)
    }

    /// Load with an explicit `many`; `None` uses the instance flag
    pub fn load_with(&self, data: &Value, many: Option<bool>) -> Result<UnmarshalResult> {
        let many = many.unwrap_or(self.many);
        let input = self.opts.preprocess(data.clone(), many);
        let input = self.hooks.apply_preprocessors(self, input)?;
        let fields = self.fields_for(&input);
        debug!(schema = %self.name, many, fields = fields.len(), "loading");

        let env = Env::new(self, &self.context);
        let mut unmarshaller = Unmarshaller::new(env);
        let result = unmarshaller.deserialize(&input, &fields, many)?;
        let mut errors = unmarshaller.into_errors();

        match (&input, &result) {
            (Value::Array(inputs), Value::Array(items)) if many => {
                for (index, (raw, item)) in inputs.iter().zip(items).enumerate() {
                    if !raw.is_object() {
                        continue;
                    }
                    let mut item_errors = Errors::new();
                    self.hooks.run_validators(self, item, &mut item_errors);
                    if !item_errors.is_empty() {
                        errors.merge_nested(index.to_string(), item_errors);
                    }
                }
            }
            (Value::Object(_), _) if !many => self.hooks.run_validators(self, &result, &mut errors),
            _ => {}
        }

        if !errors.is_empty() {
            debug!(schema = %self.name, errors = errors.len(), "load collected errors");
        }
        self.hooks.handle_errors(self, &errors, data)?;
        Ok(UnmarshalResult { data: result, errors })
    }

    /// Load, then deserialize the data into `T` when no errors were collected
    ///
    /// A `T` that cannot be built from the loaded data reports the serde
    /// message under `_schema`.
    pub fn load_object<T: DeserializeOwned>(&self, data: &Value) -> Result<UnmarshalResult<Option<T>>> {
        let UnmarshalResult { data, mut errors } = self.load(data)?;
        if !errors.is_empty() {
            return Ok(UnmarshalResult { data: None, errors });
        }
        match serde_json::from_value::<T>(data) {
            Ok(obj) => Ok(UnmarshalResult {
                data: Some(obj),
                errors,
            }),
            Err(err) => {
                errors.push_message(SCHEMA_KEY, err.to_string());
                Ok(UnmarshalResult { data: None, errors })
            }
        }
    }

    /// Like [`Schema::load_object`], then run the type's `validator` rules
    pub fn load_validated<T>(&self, data: &Value) -> Result<UnmarshalResult<Option<T>>>
    where
        T: DeserializeOwned + Validate,
    {
        let mut result = self.load_object::<T>(data)?;
        let Some(obj) = &result.data else {
            return Ok(result);
        };
        if let Err(report) = obj.validate() {
            for (field, failures) in report.field_errors() {
                for failure in failures.iter() {
                    let message = failure
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| failure.code.to_string());
                    result.errors.push_message(&*field, message);
                }
            }
            result.data = None;
        }
        Ok(result)
    }

    /// Errors a load of `data` would collect
    pub fn validate(&self, data: &Value) -> Result<Errors> {
        self.load(data).map(|result| result.errors)
    }
}

fn merge_extra(data: &mut Value, extra: &Map<String, Value>) {
    match data {
        Value::Array(items) => items.iter_mut().for_each(|item| merge_extra(item, extra)),
        Value::Object(map) => {
            for (key, value) in extra {
                map.insert(key.clone(), value.clone());
            }
        }
        _ => {}
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.declared_fields.keys().collect::<Vec<_>>())
            .field("opts", &self.opts)
            .field("hooks", &self.hooks)
            .field("many", &self.many)
            .field("strict", &self.strict)
            .finish()
    }
}

/// Builder for [`Schema`]
///
/// # Example
///
/// ```rust,ignore
/// let schema = Schema::builder("UserSchema")
///     .field("name", Field::string())
///     .field("email", Field::email())
///     .meta(Meta::new().set("name", "user"))
///     .options::<NamespaceOpts>()
///     .error_handler(|schema, errors, _obj| {
///         Err(anyhow::anyhow!("{} failed: {}", schema.name(), errors))
///     })
///     .data_handler(|_schema, data, _obj| Ok(data))
///     .build()?;
/// ```
pub struct SchemaBuilder {
    name: String,
    fields: IndexMap<String, Field>,
    meta: Meta,
    resolver: OptionsResolver,
    hooks: Hooks,
    methods: IndexMap<String, SchemaMethod>,
    many: bool,
    strict: bool,
    only: Vec<String>,
    exclude: Vec<String>,
    prefix: String,
    context: Context,
    extra: Option<Map<String, Value>>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
            meta: Meta::new(),
            resolver: resolver_for::<SchemaOpts>(),
            hooks: Hooks::default(),
            methods: IndexMap::new(),
            many: false,
            strict: false,
            only: Vec::new(),
            exclude: Vec::new(),
            prefix: String::new(),
            context: Context::new(),
            extra: None,
        }
    }

    /// Declare a field; redeclaring a name replaces it in place
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Merge a `Meta` block; its keys override earlier ones
    pub fn meta(mut self, meta: Meta) -> Self {
        self.meta.merge(&meta);
        self
    }

    pub fn meta_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key, value);
        self
    }

    /// Options type the `Meta` block is resolved into
    pub fn options<O: SchemaOptions>(mut self) -> Self {
        self.resolver = resolver_for::<O>();
        self
    }

    // === Hooks ===

    /// Set the error handler, replacing any inherited one
    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Schema, &Errors, &Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let handler: ErrorHandler = Arc::new(handler);
        self.hooks.error_handler = Some(handler);
        self
    }

    /// Append a data handler after the ones already registered
    pub fn data_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Schema, Value, &Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let handler: DataHandler = Arc::new(handler);
        self.hooks.data_handlers.push(handler);
        self
    }

    pub fn preprocessor<F>(mut self, preprocess: F) -> Self
    where
        F: Fn(&Schema, Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let preprocess: Preprocessor = Arc::new(preprocess);
        self.hooks.preprocessors.push(preprocess);
        self
    }

    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Schema, &Value) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        let validator: SchemaValidator = Arc::new(validator);
        self.hooks.validators.push(validator);
        self
    }

    /// Replace attribute lookup while dumping
    pub fn accessor<F>(mut self, accessor: F) -> Self
    where
        F: Fn(&Schema, &str, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        let accessor: Accessor = Arc::new(accessor);
        self.hooks.accessor = Some(accessor);
        self
    }

    /// Named method for method fields
    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&Value, &Context) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        let method: SchemaMethod = Arc::new(method);
        self.methods.insert(name.into(), method);
        self
    }

    // === Instance parameters ===

    pub fn many(mut self, many: bool) -> Self {
        self.many = many;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Restrict output to these field names; wins over `exclude`
    pub fn only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    /// Prepended to every dumped key
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn context_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Keys merged into every dumped object
    pub fn extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Resolve the options and freeze the schema
    pub fn build(self) -> Result<Schema> {
        let opts = (self.resolver)(&self.meta).map_err(|err| match err {
            SchemaError::Options(message) => {
                SchemaError::Options(format!("{}: {}", self.name, message))
            }
            other => other,
        })?;
        debug!(
            schema = %self.name,
            fields = self.fields.len(),
            data_handlers = self.hooks.data_handler_count(),
            error_handler = self.hooks.has_error_handler(),
            "built schema"
        );
        Ok(Schema {
            name: self.name,
            declared_fields: self.fields,
            meta: self.meta,
            opts,
            resolver: self.resolver,
            hooks: self.hooks,
            methods: self.methods,
            many: self.many,
            strict: self.strict,
            only: self.only,
            exclude: self.exclude,
            prefix: self.prefix,
            context: self.context,
            extra: self.extra,
        })
    }

    /// Build and register in the global registry
    pub fn register(self) -> Result<Arc<Schema>> {
        Ok(self.build()?.register())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::NamespaceOpts;
    use serde_json::json;

    fn user_schema() -> SchemaBuilder {
        Schema::builder("UserSchema")
            .field("name", Field::string())
            .field("age", Field::integer())
    }

    #[test]
    fn test_dump_declared_fields_in_order() {
        let schema = user_schema().build().unwrap();
        let result = schema.dump_value(&json!({"age": "42", "name": "Monty", "x": 1})).unwrap();
        assert_eq!(result.data, json!({"name": "Monty", "age": 42}));
        let keys: Vec<&String> = result.data.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["name", "age"]);
        assert!(result.is_valid());
    }

    #[test]
    fn test_meta_fields_infer_undeclared() {
        let schema = user_schema()
            .meta(Meta::new().set("fields", json!(["age", "email"])))
            .build()
            .unwrap();
        let result = schema
            .dump_value(&json!({"name": "Monty", "age": 42, "email": "m@p.org"}))
            .unwrap();
        assert_eq!(result.data, json!({"age": 42, "email": "m@p.org"}));
    }

    #[test]
    fn test_additional_and_exclude() {
        let schema = user_schema()
            .meta(Meta::new().set("additional", json!(["id"])).set("exclude", "age"))
            .build()
            .unwrap();
        let result = schema.dump_value(&json!({"id": 7, "name": "Monty", "age": 1})).unwrap();
        assert_eq!(result.data, json!({"name": "Monty", "id": 7}));
    }

    #[test]
    fn test_only_wins_over_exclude() {
        let schema = user_schema().only(["age"]).exclude(["name"]).build().unwrap();
        let result = schema.dump_value(&json!({"name": "Monty", "age": 1})).unwrap();
        assert_eq!(result.data, json!({"age": 1}));
    }

    #[test]
    fn test_prefix_and_extra() {
        let mut extra = Map::new();
        extra.insert("kind".to_string(), json!("person"));
        let schema = user_schema().prefix("usr_").extra(extra).build().unwrap();
        let result = schema.dump_value(&json!({"name": "Monty", "age": 1})).unwrap();
        assert_eq!(result.data, json!({"usr_name": "Monty", "usr_age": 1, "kind": "person"}));
    }

    #[test]
    fn test_dump_many_keys_errors_by_index() {
        let schema = user_schema().build().unwrap();
        let result = schema
            .dump_many(&[json!({"name": "a", "age": 1}), json!({"name": "b", "age": "old"})])
            .unwrap();
        assert_eq!(result.data.as_array().unwrap().len(), 2);
        assert!(result.errors.get("1").and_then(|e| e.as_nested()).is_some_and(|e| e.contains_key("age")));
    }

    #[test]
    fn test_many_with_non_list_reports_schema_error() {
        let schema = user_schema().many(true).build().unwrap();
        let result = schema.dump_value(&json!({"name": "a"})).unwrap();
        assert_eq!(result.errors.schema_messages(), vec!["Expected a list of objects."]);
    }

    #[test]
    fn test_strict_dump_raises() {
        let schema = user_schema().strict(true).build().unwrap();
        let err = schema.dump_value(&json!({"age": "x"})).unwrap_err();
        assert!(matches!(err, SchemaError::Marshalling(_)));
        assert!(err.errors().unwrap().contains_key("age"));
    }

    #[test]
    fn test_strict_from_meta() {
        let schema = user_schema().meta(Meta::new().set("strict", true)).build().unwrap();
        assert!(schema.is_strict());
    }

    #[test]
    fn test_load_follows_input_order_and_attribute() {
        let schema = Schema::builder("RenamedSchema")
            .field("name", Field::string().attribute("full_name"))
            .field("age", Field::integer())
            .build()
            .unwrap();
        let result = schema.load(&json!({"age": "3", "name": "Monty", "other": true})).unwrap();
        assert_eq!(result.data, json!({"age": 3, "full_name": "Monty"}));
        let keys: Vec<&String> = result.data.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["age", "full_name"]);
    }

    #[test]
    fn test_load_missing_required() {
        let schema = Schema::builder("RequiredSchema")
            .field("email", Field::email().required())
            .build()
            .unwrap();
        let errors = schema.validate(&json!({})).unwrap();
        assert_eq!(errors.message("email"), Some("Missing data for required field."));
    }

    #[test]
    fn test_load_invalid_input_type() {
        let schema = user_schema().build().unwrap();
        let result = schema.load(&json!("not an object")).unwrap();
        assert_eq!(result.errors.schema_messages(), vec!["Invalid input type."]);
    }

    #[test]
    fn test_loads_decodes_json() {
        let schema = user_schema().build().unwrap();
        let result = schema.loads(r#"{"name": "Monty"}"#).unwrap();
        assert_eq!(result.data, json!({"name": "Monty"}));
        assert!(schema.loads("{oops").is_err());
    }

    #[test]
    fn test_dumps_encodes_json() {
        let schema = user_schema().build().unwrap();
        let result = schema.dumps(&json!({"name": "Monty", "age": 1})).unwrap();
        assert_eq!(result.data, r#"{"name":"Monty","age":1}"#);
    }

    #[test]
    fn test_opts_as_downcasts() {
        let schema = user_schema()
            .meta(Meta::new().set("name", "user"))
            .options::<NamespaceOpts>()
            .build()
            .unwrap();
        let opts = schema.opts_as::<NamespaceOpts>().unwrap();
        assert_eq!(opts.plural_name.as_deref(), Some("users"));
        assert!(schema.opts_as::<SchemaOpts>().is_none());
    }

    #[test]
    fn test_invalid_meta_fails_build() {
        let err = user_schema()
            .meta(Meta::new().set("fields", json!(["a"])).set("additional", json!(["b"])))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("UserSchema"));
    }

    #[test]
    fn test_extend_inherits_fields_and_meta() {
        let parent = user_schema()
            .meta(Meta::new().set("exclude", "age").set("dateformat", "rfc"))
            .build()
            .unwrap();
        let child = parent
            .extend("AdminSchema")
            .field("role", Field::string())
            .meta(Meta::new().set("exclude", json!([])))
            .build()
            .unwrap();
        assert_eq!(child.declared_fields().len(), 3);
        assert_eq!(child.opts().base().dateformat.as_deref(), Some("rfc"));
        let result = child.dump_value(&json!({"name": "a", "age": 1, "role": "root"})).unwrap();
        assert_eq!(result.data, json!({"name": "a", "age": 1, "role": "root"}));
    }
}
