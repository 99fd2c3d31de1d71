//! Declarative schema definitions loaded from YAML
//!
//! ```yaml
//! schemas:
//!   - name: AuthorSchema
//!     options: namespace
//!     meta:
//!       name: author
//!     fields:
//!       name: { type: string, required: true, max_length: 80 }
//!       email: { type: email }
//!       books: { type: nested, schema: BookSchema, many: true, only: title }
//!   - name: BookSchema
//!     fields:
//!       title: { type: string }
//!       price: { type: price }
//! ```

use crate::core::error::{Result, SchemaError};
use crate::core::field::Field;
use crate::core::hooks::Context;
use crate::core::options::{Meta, NamespaceOpts, SchemaOpts};
use crate::core::registry;
use crate::core::schema::Schema;
use crate::core::validators;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Options type a configured schema resolves its `meta` into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionsKind {
    #[default]
    Default,
    Namespace,
}

/// `only` of a nested field: one name plucks a bare value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OnlyConfig {
    Field(String),
    Fields(Vec<String>),
}

/// One field of a configured schema
///
/// `type` selects the kind; the remaining keys apply to the kinds that use them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub required: bool,
    pub attribute: Option<String>,
    pub default: Option<Value>,
    pub error: Option<String>,

    pub as_string: bool,
    pub format: Option<String>,
    pub decimals: Option<usize>,
    pub relative: bool,
    pub template: Option<String>,
    pub method: Option<String>,
    pub deserialize: Option<String>,
    pub choices: Vec<Value>,
    pub truthy: Vec<String>,
    pub falsy: Option<Vec<String>>,

    pub item: Option<Box<FieldConfig>>,
    pub schema: Option<String>,
    pub many: bool,
    pub only: Option<OnlyConfig>,
    pub exclude: Vec<String>,
    pub allow_null: bool,

    // Validation rules
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub one_of: Vec<Value>,
    pub pattern: Option<String>,
}

impl FieldConfig {
    /// Build the field this entry describes
    pub fn to_field(&self, name: &str) -> Result<Field> {
        let missing = |key: &str| {
            SchemaError::Config(format!(
                "field '{}' of type '{}' requires '{}'",
                name, self.kind, key
            ))
        };

        let mut field = match self.kind.as_str() {
            "raw" => Field::raw(),
            "string" | "str" => Field::string(),
            "uuid" => Field::uuid(),
            "float" | "number" => Field::float(),
            "integer" | "int" => Field::integer(),
            "boolean" | "bool" => {
                let mut field = Field::boolean().truthy(self.truthy.iter().cloned());
                if let Some(falsy) = &self.falsy {
                    field = field.falsy(falsy.iter().cloned());
                }
                field
            }
            "formatted_string" => {
                Field::formatted_string(self.template.clone().ok_or_else(|| missing("template"))?)
            }
            "arbitrary" => Field::arbitrary(),
            "fixed" => Field::fixed(self.decimals.unwrap_or(5)),
            "price" => Field::price(),
            "datetime" => match &self.format {
                Some(format) => Field::datetime_format(format.clone()),
                None => Field::datetime(),
            },
            "local_datetime" => Field::local_datetime(),
            "time" => Field::time(),
            "date" => Field::date(),
            "timedelta" => Field::timedelta(),
            "url" if self.relative => Field::relative_url(),
            "url" => Field::url(),
            "email" => Field::email(),
            "method" => {
                let method = self.method.clone().ok_or_else(|| missing("method"))?;
                match &self.deserialize {
                    Some(deserialize) => Field::method_with_deserialize(method, deserialize.clone()),
                    None => Field::method(method),
                }
            }
            "select" | "enum" => Field::select(self.choices.iter().cloned()),
            "list" => {
                let item = self.item.as_ref().ok_or_else(|| missing("item"))?;
                Field::list(item.to_field(name)?)
            }
            "nested" => self.nested_field(name)?,
            "" => {
                return Err(SchemaError::Config(format!("field '{}' has no type", name)));
            }
            other => {
                return Err(SchemaError::Config(format!(
                    "field '{}' has unknown type '{}'",
                    name, other
                )));
            }
        };

        if self.as_string {
            field = field.as_string();
        }
        if self.required {
            field = field.required();
        }
        if let Some(attribute) = &self.attribute {
            field = field.attribute(attribute.clone());
        }
        if let Some(default) = &self.default {
            field = field.default(default.clone());
        }
        if let Some(error) = &self.error {
            field = field.error(error.clone());
        }
        self.apply_rules(name, field)
    }

    fn nested_field(&self, name: &str) -> Result<Field> {
        let schema = self.schema.as_deref().ok_or_else(|| {
            SchemaError::Config(format!("nested field '{}' requires 'schema'", name))
        })?;
        let mut field = Field::nested_named(schema).exclude(self.exclude.iter().cloned());
        if self.many {
            field = field.many();
        }
        if self.allow_null {
            field = field.allow_null();
        }
        field = match &self.only {
            Some(OnlyConfig::Field(only)) => field.only_field(only.clone()),
            Some(OnlyConfig::Fields(only)) => field.only(only.iter().cloned()),
            None => field,
        };
        Ok(field)
    }

    fn apply_rules(&self, name: &str, mut field: Field) -> Result<Field> {
        if self.min_length.is_some() || self.max_length.is_some() {
            field = field.validate(validators::length(self.min_length, self.max_length));
        }
        if self.min.is_some() || self.max.is_some() {
            field = field.validate(validators::range(self.min, self.max));
        }
        if !self.one_of.is_empty() {
            field = field.validate(validators::one_of(self.one_of.clone()));
        }
        if let Some(pattern) = &self.pattern {
            let regex = Regex::new(pattern).map_err(|err| {
                SchemaError::Config(format!("field '{}' has an invalid pattern: {}", name, err))
            })?;
            field = field.validate(validators::regexp(regex));
        }
        Ok(field)
    }
}

/// One configured schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub name: String,

    #[serde(default)]
    pub options: OptionsKind,

    #[serde(default)]
    pub meta: Meta,

    #[serde(default)]
    pub fields: IndexMap<String, FieldConfig>,

    #[serde(default)]
    pub many: bool,

    #[serde(default)]
    pub strict: bool,

    #[serde(default)]
    pub context: Context,
}

impl SchemaConfig {
    pub fn build(&self) -> Result<Schema> {
        let mut builder = Schema::builder(self.name.clone())
            .meta(self.meta.clone())
            .many(self.many)
            .strict(self.strict)
            .context(self.context.clone());
        builder = match self.options {
            OptionsKind::Default => builder.options::<SchemaOpts>(),
            OptionsKind::Namespace => builder.options::<NamespaceOpts>(),
        };
        for (name, field) in &self.fields {
            builder = builder.field(name.clone(), field.to_field(name)?);
        }
        builder.build()
    }
}

/// A set of schema definitions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemasConfig {
    pub schemas: Vec<SchemaConfig>,
}

impl SchemasConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.check_names()?;
        Ok(config)
    }

    fn check_names(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for schema in &self.schemas {
            if schema.name.is_empty() {
                return Err(SchemaError::Config("schema without a name".to_string()));
            }
            if !seen.insert(schema.name.as_str()) {
                return Err(SchemaError::Config(format!(
                    "schema '{}' is defined twice",
                    schema.name
                )));
            }
        }
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<&SchemaConfig> {
        self.schemas.iter().find(|schema| schema.name == name)
    }

    /// Build every schema, in definition order
    pub fn build(&self) -> Result<Vec<Schema>> {
        self.schemas.iter().map(SchemaConfig::build).collect()
    }

    /// Build every schema and register it, so nested names resolve
    pub fn register_all(&self) -> Result<Vec<Arc<Schema>>> {
        let schemas = self.build()?;
        tracing::info!(count = schemas.len(), "registering configured schemas");
        Ok(schemas.into_iter().map(registry::register).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
schemas:
  - name: ConfigAuthor
    options: namespace
    meta:
      name: author
    fields:
      name: { type: string, required: true, max_length: 10 }
      email: { type: email }
  - name: ConfigBook
    fields:
      title: { type: string }
      price: { type: price }
"#;

    #[test]
    fn test_parse_yaml() {
        let config = SchemasConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.schemas.len(), 2);
        let author = config.find("ConfigAuthor").unwrap();
        assert_eq!(author.options, OptionsKind::Namespace);
        assert_eq!(author.fields.keys().collect::<Vec<_>>(), vec!["name", "email"]);
        assert!(author.fields["name"].required);
        assert_eq!(author.fields["name"].max_length, Some(10));
    }

    #[test]
    fn test_build_schemas() {
        let schemas = SchemasConfig::from_yaml_str(YAML).unwrap().build().unwrap();
        let author = &schemas[0];
        assert!(author.opts_as::<NamespaceOpts>().is_some());
        assert_eq!(author.declared_fields().len(), 2);
        assert!(author.declared_fields()["name"].is_required());
    }

    #[test]
    fn test_unknown_type_is_config_error() {
        let yaml = "schemas:\n  - name: Bad\n    fields:\n      x: { type: blob }\n";
        let err = SchemasConfig::from_yaml_str(yaml).unwrap().build().unwrap_err();
        assert!(matches!(err, SchemaError::Config(_)));
        assert!(err.to_string().contains("blob"));
    }

    #[test]
    fn test_missing_type_is_config_error() {
        let yaml = "schemas:\n  - name: Bad\n    fields:\n      x: { required: true }\n";
        let err = SchemasConfig::from_yaml_str(yaml).unwrap().build().unwrap_err();
        assert!(err.to_string().contains("no type"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let yaml = "schemas:\n  - name: A\n  - name: A\n";
        assert!(SchemasConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let yaml = "schemas:\n  - name: P\n    fields:\n      code: { type: string, pattern: '(' }\n";
        let err = SchemasConfig::from_yaml_str(yaml).unwrap().build().unwrap_err();
        assert!(err.to_string().contains("invalid pattern"));
    }
}
