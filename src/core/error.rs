//! Typed errors for schema operations
//!
//! Collected validation failures are not errors: they are returned as data
//! in [`Errors`](crate::core::errors::Errors) alongside the (partial) result.
//! [`SchemaError`] is reserved for conditions that terminate a call:
//!
//! - strict mode hitting its first field failure
//! - an error handler or data handler returning an application error
//! - a nested schema name missing from the registry
//! - invalid options or configuration
//!
//! # Example
//!
//! ```rust,ignore
//! match schema.dump(&user) {
//!     Ok(result) if result.errors.is_empty() => send(result.data),
//!     Ok(result) => log_partial(result.errors),
//!     Err(SchemaError::Handler(err)) => match err.downcast_ref::<AppError>() {
//!         Some(app) => respond(app),
//!         None => return Err(err),
//!     },
//!     Err(other) => return Err(other.into()),
//! }
//! ```

use crate::core::errors::Errors;

/// Errors that terminate a dump, load or schema construction
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Strict mode: serialization stopped at the first invalid field
    #[error("marshalling failed: {0}")]
    Marshalling(Errors),

    /// Strict mode: deserialization stopped at the first invalid field
    #[error("unmarshalling failed: {0}")]
    Unmarshalling(Errors),

    /// Raised by a registered error handler or data handler
    #[error(transparent)]
    Handler(anyhow::Error),

    /// A nested schema was referenced by a name nobody registered
    #[error("no schema registered under the name {0:?}")]
    Registry(String),

    /// The `Meta` block could not be resolved into options
    #[error("invalid schema options: {0}")]
    Options(String),

    /// A declarative schema definition is inconsistent
    #[error("invalid schema configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SchemaError {
    /// The collected errors carried by strict-mode failures
    pub fn errors(&self) -> Option<&Errors> {
        match self {
            SchemaError::Marshalling(errors) | SchemaError::Unmarshalling(errors) => Some(errors),
            _ => None,
        }
    }

    /// Downcast a handler error back to the application type that raised it
    pub fn handler_error<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        match self {
            SchemaError::Handler(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// Outcome of a failed field serialization or deserialization
#[derive(Debug)]
pub enum FieldError {
    /// A single message stored under the field's key
    Invalid(String),

    /// A nested schema collected errors; its partial data is still emitted
    Nested {
        errors: Errors,
        partial: serde_json::Value,
    },

    /// Not collectable: propagates out of the whole call
    Fatal(Box<SchemaError>),
}

impl FieldError {
    pub fn invalid(message: impl Into<String>) -> Self {
        FieldError::Invalid(message.into())
    }
}

impl From<SchemaError> for FieldError {
    fn from(err: SchemaError) -> Self {
        FieldError::Fatal(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, SchemaError>;
