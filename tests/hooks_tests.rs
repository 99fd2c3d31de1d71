//! Tests for the error handler and data handler hooks
//!
//! These tests verify that:
//! - Invalid input without an error handler yields errors, not a failure
//! - A registered error handler receives the errors and the original object
//! - An error raised by the handler replaces the result
//! - Data handlers compose in registration order
//! - Hooks are inherited by extended schemas

use mallow::prelude::*;
use std::sync::{Arc, Mutex};

#[derive(Debug, thiserror::Error)]
#[error("invalid {schema}: {count} field(s)")]
struct AppError {
    schema: String,
    count: usize,
}

fn user_schema() -> SchemaBuilder {
    Schema::builder("HookUserSchema")
        .field("name", Field::string())
        .field("email", Field::email())
        .field("age", Field::integer())
}

fn raising_handler(schema: &Schema, errors: &Errors, _obj: &Value) -> anyhow::Result<()> {
    Err(AppError {
        schema: schema.name().to_string(),
        count: errors.len(),
    }
    .into())
}

// =============================================================================
// Error Handler Tests
// =============================================================================

mod error_handler_tests {
    use super::*;

    #[test]
    fn test_without_handler_errors_are_returned() {
        let schema = user_schema().build().unwrap();
        let result = schema
            .dump(&json!({"name": "Monty", "email": "invalid", "age": 3}))
            .unwrap();
        assert!(!result.errors.is_empty());
        assert!(result.errors.contains_key("email"));
        assert_eq!(result.data["name"], json!("Monty"));
    }

    #[test]
    fn test_without_handler_load_errors_are_returned() {
        let schema = user_schema().build().unwrap();
        let result = schema.load(&json!({"email": "nope"})).unwrap();
        assert_eq!(
            result.errors.message("email"),
            Some("\"nope\" is not a valid email address.")
        );
    }

    #[test]
    fn test_handler_error_replaces_dump_result() {
        let schema = user_schema().error_handler(raising_handler).build().unwrap();
        let err = schema
            .dump(&json!({"name": "Monty", "email": "invalid"}))
            .unwrap_err();
        let app = err.handler_error::<AppError>().expect("application error");
        assert_eq!(app.schema, "HookUserSchema");
        assert_eq!(app.count, 1);
    }

    #[test]
    fn test_handler_error_replaces_load_result() {
        let schema = user_schema().error_handler(raising_handler).build().unwrap();
        let err = schema.load(&json!({"age": "old", "email": "x"})).unwrap_err();
        assert!(matches!(err, SchemaError::Handler(_)));
        assert_eq!(err.to_string(), "invalid HookUserSchema: 2 field(s)");
    }

    #[test]
    fn test_handler_receives_errors_and_original_object() {
        let seen: Arc<Mutex<Vec<(Errors, Value)>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let schema = user_schema()
            .error_handler(move |_schema, errors, obj| {
                sink.lock().unwrap().push((errors.clone(), obj.clone()));
                Ok(())
            })
            .build()
            .unwrap();

        let obj = json!({"name": "Monty", "email": "invalid", "extra": true});
        let result = schema.dump(&obj).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, result.errors);
        assert_eq!(seen[0].1, obj);
    }

    #[test]
    fn test_handler_not_called_for_valid_input() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let schema = user_schema()
            .error_handler(move |_, _, _| {
                *counter.lock().unwrap() += 1;
                Ok(())
            })
            .build()
            .unwrap();

        let result = schema
            .dump(&json!({"name": "Monty", "email": "monty@python.org", "age": 1}))
            .unwrap();
        assert!(result.is_valid());
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_handler_sees_schema_validator_errors() {
        let schema = user_schema()
            .validator(|_, data| match data.get("age").and_then(Value::as_i64) {
                Some(age) if age < 18 => Err("Must be an adult.".to_string()),
                _ => Ok(()),
            })
            .error_handler(|_, errors, _| anyhow::bail!("rejected: {}", errors.schema_messages().join(", ")))
            .build()
            .unwrap();

        let err = schema.load(&json!({"age": 12})).unwrap_err();
        assert_eq!(err.to_string(), "rejected: Must be an adult.");
    }

    #[test]
    fn test_second_handler_replaces_first() {
        let schema = user_schema()
            .error_handler(|_, _, _| anyhow::bail!("first"))
            .error_handler(|_, _, _| anyhow::bail!("second"))
            .build()
            .unwrap();
        let err = schema.dump(&json!({"email": "bad"})).unwrap_err();
        assert_eq!(err.to_string(), "second");
    }

    #[test]
    fn test_extended_schema_inherits_handler() {
        let parent = user_schema().error_handler(raising_handler).build().unwrap();
        let child = parent
            .extend("HookAdminSchema")
            .field("role", Field::select(["admin", "owner"]))
            .build()
            .unwrap();
        let err = child.load(&json!({"role": "guest"})).unwrap_err();
        let app = err.handler_error::<AppError>().unwrap();
        assert_eq!(app.schema, "HookAdminSchema");
    }

    #[test]
    fn test_strict_mode_bypasses_handler() {
        let schema = user_schema()
            .strict(true)
            .error_handler(raising_handler)
            .build()
            .unwrap();
        let err = schema.load(&json!({"email": "bad"})).unwrap_err();
        assert!(matches!(err, SchemaError::Unmarshalling(_)));
    }
}

// =============================================================================
// Data Handler Tests
// =============================================================================

mod data_handler_tests {
    use super::*;

    fn add_key(key: &'static str, value: i64) -> impl Fn(&Schema, Value, &Value) -> anyhow::Result<Value> {
        move |_: &Schema, mut data: Value, _: &Value| {
            data[key] = json!(value);
            Ok(data)
        }
    }

    #[test]
    fn test_single_handler_transforms_output() {
        let schema = user_schema()
            .data_handler(|_, mut data, obj| {
                data["id"] = obj["id"].clone();
                Ok(data)
            })
            .build()
            .unwrap();
        let result = schema
            .dump(&json!({"id": 9, "name": "Monty", "email": "monty@python.org", "age": 1}))
            .unwrap();
        assert_eq!(
            result.data,
            json!({"name": "Monty", "email": "monty@python.org", "age": 1, "id": 9})
        );
    }

    #[test]
    fn test_handlers_compose_in_registration_order() {
        let schema = Schema::builder("HookCounterSchema")
            .field("n", Field::integer())
            .data_handler(|_, mut data, _| {
                data["n"] = json!(data["n"].as_i64().unwrap_or(0) + 1);
                Ok(data)
            })
            .data_handler(|_, mut data, _| {
                data["n"] = json!(data["n"].as_i64().unwrap_or(0) * 10);
                Ok(data)
            })
            .build()
            .unwrap();
        let result = schema.dump(&json!({"n": 2})).unwrap();
        assert_eq!(result.data, json!({"n": 30}));
    }

    #[test]
    fn test_handlers_see_previous_output() {
        let schema = Schema::builder("HookChainSchema")
            .field("name", Field::string())
            .data_handler(add_key("first", 1))
            .data_handler(|_, mut data, _| {
                let first = data["first"].clone();
                data["second"] = json!(first.as_i64().map(|n| n + 1));
                Ok(data)
            })
            .build()
            .unwrap();
        let result = schema.dump(&json!({"name": "a"})).unwrap();
        assert_eq!(result.data, json!({"name": "a", "first": 1, "second": 2}));
    }

    #[test]
    fn test_handler_receives_whole_collection_when_many() {
        let schema = Schema::builder("HookManySchema")
            .field("name", Field::string())
            .many(true)
            .data_handler(|_, data, obj| {
                Ok(json!({"count": obj.as_array().map_or(0, Vec::len), "items": data}))
            })
            .build()
            .unwrap();
        let result = schema.dump(&json!([{"name": "a"}, {"name": "b"}])).unwrap();
        assert_eq!(
            result.data,
            json!({"count": 2, "items": [{"name": "a"}, {"name": "b"}]})
        );
    }

    #[test]
    fn test_handler_error_aborts_dump() {
        let schema = user_schema()
            .data_handler(|_, _, _| anyhow::bail!("storage offline"))
            .build()
            .unwrap();
        let err = schema.dump(&json!({"name": "a"})).unwrap_err();
        assert!(matches!(err, SchemaError::Handler(_)));
        assert_eq!(err.to_string(), "storage offline");
    }

    #[test]
    fn test_handlers_run_with_collected_errors() {
        let schema = user_schema().data_handler(add_key("checked", 1)).build().unwrap();
        let result = schema.dump(&json!({"email": "bad"})).unwrap();
        assert!(result.errors.contains_key("email"));
        assert_eq!(result.data["checked"], json!(1));
    }

    #[test]
    fn test_extended_schema_appends_handlers() {
        let parent = Schema::builder("HookParentSchema")
            .field("n", Field::integer())
            .data_handler(add_key("parent", 1))
            .build()
            .unwrap();
        let child = parent
            .extend("HookChildSchema")
            .data_handler(|_, mut data, _| {
                data["child"] = json!(data.get("parent").is_some());
                Ok(data)
            })
            .build()
            .unwrap();

        assert_eq!(parent.hooks().data_handler_count(), 1);
        assert_eq!(child.hooks().data_handler_count(), 2);
        let result = child.dump(&json!({"n": 1})).unwrap();
        assert_eq!(result.data, json!({"n": 1, "parent": 1, "child": true}));
    }

    #[test]
    fn test_handlers_not_applied_on_load() {
        let schema = user_schema().data_handler(add_key("dumped", 1)).build().unwrap();
        let result = schema.load(&json!({"name": "a"})).unwrap();
        assert_eq!(result.data, json!({"name": "a"}));
    }
}

// =============================================================================
// Load Hook Tests
// =============================================================================

mod load_hook_tests {
    use super::*;

    #[test]
    fn test_preprocessors_run_in_order() {
        let schema = user_schema()
            .preprocessor(|_, mut data| {
                data["name"] = json!(data["name"].as_str().unwrap_or("").trim());
                Ok(data)
            })
            .preprocessor(|_, mut data| {
                data["name"] = json!(data["name"].as_str().unwrap_or("").to_lowercase());
                Ok(data)
            })
            .build()
            .unwrap();
        let result = schema.load(&json!({"name": "  MONTY "})).unwrap();
        assert_eq!(result.data, json!({"name": "monty"}));
    }

    #[test]
    fn test_schema_validators_collect_under_schema_key() {
        let schema = Schema::builder("HookRangeSchema")
            .field("low", Field::integer())
            .field("high", Field::integer())
            .validator(|_, data| {
                if data["low"].as_i64() > data["high"].as_i64() {
                    Err("low must not exceed high".to_string())
                } else {
                    Ok(())
                }
            })
            .validator(|_, _| Err("always".to_string()))
            .build()
            .unwrap();
        let errors = schema.validate(&json!({"low": 5, "high": 1})).unwrap();
        assert_eq!(errors.schema_messages(), vec!["low must not exceed high", "always"]);
    }

    #[test]
    fn test_accessor_overrides_lookup() {
        let schema = Schema::builder("HookAccessorSchema")
            .field("name", Field::string())
            .accessor(|_, key, obj| obj.get("attrs").and_then(|attrs| attrs.get(key)).cloned())
            .build()
            .unwrap();
        let result = schema.dump(&json!({"attrs": {"name": "Monty"}})).unwrap();
        assert_eq!(result.data, json!({"name": "Monty"}));
    }
}
