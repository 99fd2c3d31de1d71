//! Namespaced output with an error handler and data handlers
//!
//! This example demonstrates:
//! - Resolving `NamespaceOpts` from a `Meta` block
//! - Post-processing dumped data with ordered data handlers
//! - Turning validation errors into an application error
//!
//! Run with `RUST_LOG=mallow=debug cargo run --example namespaced`

use mallow::prelude::*;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[error("invalid {schema}: {errors}")]
struct InvalidPayload {
    schema: String,
    errors: Errors,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    id: Uuid,
    name: String,
    email: String,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("mallow namespaced example");
    println!("=========================\n");

    let schema = Schema::builder("UserSchema")
        .field("id", Field::uuid())
        .field("name", Field::string())
        .field("email", Field::email())
        .meta(Meta::new().set("name", "user"))
        .options::<NamespaceOpts>()
        .error_handler(|schema, errors, _obj| {
            Err(InvalidPayload {
                schema: schema.name().to_string(),
                errors: errors.clone(),
            }
            .into())
        })
        .data_handler(|_schema, mut data, obj| {
            if let Some(id) = obj.get("id").and_then(Value::as_str) {
                data["href"] = json!(format!("/users/{}", id));
            }
            Ok(data)
        })
        .build()?;

    let users = vec![
        User {
            id: Uuid::new_v4(),
            name: "Monty".to_string(),
            email: "monty@python.org".to_string(),
        },
        User {
            id: Uuid::new_v4(),
            name: "Mick".to_string(),
            email: "mick@stones.com".to_string(),
        },
    ];

    let single = schema.dump(&users[0])?;
    println!("single: {}", serde_json::to_string_pretty(&single.data)?);

    let many = schema.dump_many(&users)?;
    println!("many: {}", serde_json::to_string_pretty(&many.data)?);

    match schema.load(&json!({"user": {"name": "Nobody", "email": "not-an-email"}})) {
        Ok(result) => println!("loaded: {}", result.data),
        Err(err) => match err.handler_error::<InvalidPayload>() {
            Some(invalid) => println!("rejected by {}: {}", invalid.schema, invalid.errors),
            None => return Err(err.into()),
        },
    }

    Ok(())
}
