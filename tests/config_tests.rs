//! Tests for YAML-declared schemas

use mallow::prelude::*;
use std::io::Write;

const LIBRARY_YAML: &str = r#"
schemas:
  - name: ConfigLibraryAuthor
    options: namespace
    meta:
      name: author
    fields:
      name: { type: string, required: true, max_length: 20 }
      email: { type: email }
      books:
        type: nested
        schema: ConfigLibraryBook
        many: true
        only: title
  - name: ConfigLibraryBook
    meta:
      strict: false
    fields:
      title: { type: string, required: true }
      price: { type: price }
      tags: { type: list, item: { type: string } }
      status: { type: select, choices: [draft, published] }
"#;

mod config_file_tests {
    use super::*;

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LIBRARY_YAML.as_bytes()).unwrap();

        let config = SchemasConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.schemas.len(), 2);
        assert_eq!(config.schemas[0].name, "ConfigLibraryAuthor");
        assert_eq!(config.schemas[0].options, OptionsKind::Namespace);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SchemasConfig::from_yaml_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, SchemaError::Io(_)));
    }

    #[test]
    fn test_malformed_yaml_is_yaml_error() {
        let err = SchemasConfig::from_yaml_str("schemas: [").unwrap_err();
        assert!(matches!(err, SchemaError::Yaml(_)));
    }
}

mod config_schema_tests {
    use super::*;

    #[test]
    fn test_registered_schemas_dump_nested_by_name() {
        let config = SchemasConfig::from_yaml_str(LIBRARY_YAML).unwrap();
        let registered = config.register_all().unwrap();
        assert_eq!(registered.len(), 2);

        let author = registry::get("ConfigLibraryAuthor").unwrap();
        let result = author
            .dump(&json!({
                "name": "Monty",
                "email": "monty@python.org",
                "books": [{"title": "Holy Grail"}, {"title": "Life of Brian"}]
            }))
            .unwrap();
        assert_eq!(
            result.data,
            json!({"author": {
                "name": "Monty",
                "email": "monty@python.org",
                "books": ["Holy Grail", "Life of Brian"]
            }})
        );
    }

    #[test]
    fn test_configured_rules_validate_on_load() {
        let schemas = SchemasConfig::from_yaml_str(LIBRARY_YAML).unwrap().build().unwrap();
        let book = &schemas[1];

        let result = book
            .load(&json!({"title": "Holy Grail", "price": "3", "tags": ["comedy", 1], "status": "draft"}))
            .unwrap();
        assert!(result.is_valid());
        assert_eq!(
            result.data,
            json!({"title": "Holy Grail", "price": "3.00", "tags": ["comedy", "1"], "status": "draft"})
        );

        let errors = book.validate(&json!({"status": "archived"})).unwrap();
        assert!(errors.contains_key("title"));
        assert!(errors.contains_key("status"));
    }

    #[test]
    fn test_max_length_rule() {
        let schemas = SchemasConfig::from_yaml_str(LIBRARY_YAML).unwrap().build().unwrap();
        let errors = schemas[0]
            .validate(&json!({"name": "a name that is much too long"}))
            .unwrap();
        assert!(errors.message("name").is_some_and(|m| m.contains("at most 20")));
    }
}
