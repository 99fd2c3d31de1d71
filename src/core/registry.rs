//! Registry of named schemas
//!
//! Nested fields can refer to a schema by name; the name is resolved here
//! each time the field runs, so a schema may refer to one registered later.

use crate::core::error::{Result, SchemaError};
use crate::core::schema::Schema;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Thread-safe map of schema name to schema
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<String, Arc<Schema>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema under its name, replacing any previous one
    pub fn register(&self, schema: Schema) -> Arc<Schema> {
        let schema = Arc::new(schema);
        let previous = self
            .schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(schema.name().to_string(), Arc::clone(&schema));
        if previous.is_some() {
            tracing::debug!(schema = %schema.name(), "replaced registered schema");
        } else {
            tracing::debug!(schema = %schema.name(), "registered schema");
        }
        schema
    }

    pub fn get(&self, name: &str) -> Result<Arc<Schema>> {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::Registry(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<Schema>> {
        self.schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

/// The process-wide registry used by named nested fields
pub fn global() -> &'static SchemaRegistry {
    static GLOBAL: OnceLock<SchemaRegistry> = OnceLock::new();
    GLOBAL.get_or_init(SchemaRegistry::new)
}

pub fn register(schema: Schema) -> Arc<Schema> {
    global().register(schema)
}

pub fn get(name: &str) -> Result<Arc<Schema>> {
    global().get(name)
}

pub fn contains(name: &str) -> bool {
    global().contains(name)
}

pub fn unregister(name: &str) -> Option<Arc<Schema>> {
    global().unregister(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(name: &str) -> Schema {
        Schema::builder(name).build().unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let registry = SchemaRegistry::new();
        registry.register(schema("Author"));
        assert!(registry.contains("Author"));
        assert_eq!(registry.get("Author").unwrap().name(), "Author");
    }

    #[test]
    fn test_missing_schema_is_registry_error() {
        let registry = SchemaRegistry::new();
        let err = registry.get("Ghost").unwrap_err();
        assert!(matches!(err, SchemaError::Registry(_)));
        assert!(err.to_string().contains("Ghost"));
    }

    #[test]
    fn test_register_replaces_and_unregister_removes() {
        let registry = SchemaRegistry::new();
        registry.register(schema("Book"));
        registry.register(schema("Book"));
        assert_eq!(registry.names(), vec!["Book"]);
        assert!(registry.unregister("Book").is_some());
        assert!(!registry.contains("Book"));
    }

    #[test]
    fn test_global_registry() {
        register(schema("RegistryGlobalTestSchema"));
        assert!(contains("RegistryGlobalTestSchema"));
        assert!(unregister("RegistryGlobalTestSchema").is_some());
        assert!(get("RegistryGlobalTestSchema").is_err());
    }
}
