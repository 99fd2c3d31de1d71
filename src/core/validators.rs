//! Reusable field validators
//!
//! A validator receives the field name and the field's formatted output
//! (on dump) or deserialized value (on load). Values of a type the validator
//! does not handle pass through, leaving them to another validator.

use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use validator::{ValidateEmail, ValidateUrl};

/// Shared validator function stored on a field
pub type Validator = Arc<dyn Fn(&str, &Value) -> Result<(), String> + Send + Sync>;

/// Validator: field is required (not null)
pub fn required() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| {
        if value.is_null() {
            Err(format!("Field '{}' is required", field))
        } else {
            Ok(())
        }
    }
}

/// Validator: number must be strictly positive
pub fn positive() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| match value.as_f64() {
        Some(num) if num <= 0.0 => Err(format!(
            "Field '{}' must be positive (value: {})",
            field, num
        )),
        _ => Ok(()),
    }
}

/// Validator: string length (in characters) within `[min, max]`
pub fn length(
    min: Option<usize>,
    max: Option<usize>,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        let Some(s) = value.as_str() else {
            return Ok(());
        };
        let len = s.chars().count();
        if let Some(min) = min.filter(|m| len < *m) {
            return Err(format!(
                "'{}' must be at least {} characters long (currently: {})",
                field, min, len
            ));
        }
        if let Some(max) = max.filter(|m| len > *m) {
            return Err(format!(
                "'{}' must be at most {} characters long (currently: {})",
                field, max, len
            ));
        }
        Ok(())
    }
}

/// Validator: number within `[min, max]`
pub fn range(
    min: Option<f64>,
    max: Option<f64>,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        let Some(num) = value.as_f64() else {
            return Ok(());
        };
        if let Some(min) = min.filter(|m| num < *m) {
            return Err(format!("'{}' must be at least {} (value: {})", field, min, num));
        }
        if let Some(max) = max.filter(|m| num > *m) {
            return Err(format!("'{}' must not exceed {} (value: {})", field, max, num));
        }
        Ok(())
    }
}

/// Validator: value must be one of `allowed`
pub fn one_of(
    allowed: Vec<Value>,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        if value.is_null() || allowed.contains(value) {
            Ok(())
        } else {
            let choices: Vec<String> = allowed.iter().map(Value::to_string).collect();
            Err(format!(
                "'{}' must be one of: {} (current value: {})",
                field,
                choices.join(", "),
                value
            ))
        }
    }
}

/// Validator: date string must match a chrono format
pub fn date_format(
    format: &'static str,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| match value.as_str() {
        Some(s) if chrono::NaiveDate::parse_from_str(s, format).is_err() => Err(format!(
            "'{}' must use the format {} (current value: {})",
            field, format, s
        )),
        _ => Ok(()),
    }
}

/// Validator: string must match `pattern`
pub fn regexp(pattern: Regex) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| match value.as_str() {
        Some(s) if !pattern.is_match(s) => Err(format!(
            "'{}' does not match the pattern {}",
            field,
            pattern.as_str()
        )),
        _ => Ok(()),
    }
}

/// Adapt a boolean predicate; a `false` result fails with
/// `Validator <name>(<value>) is not True`
pub fn predicate<F>(
    name: &'static str,
    check: F,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone
where
    F: Fn(&Value) -> bool + Send + Sync + Clone,
{
    move |_: &str, value: &Value| {
        if check(value) {
            Ok(())
        } else {
            Err(format!("Validator {}({}) is not True", name, value))
        }
    }
}

/// Check an email address, returning the normalized address
pub fn email(value: &str) -> Result<String, String> {
    let candidate = value.trim().to_string();
    if candidate.validate_email() {
        Ok(candidate)
    } else {
        Err(format!("\"{}\" is not a valid email address.", value))
    }
}

/// Check a URL; with `relative`, paths such as `/users/1?page=2` are accepted
pub fn url(value: &str, relative: bool) -> Result<String, String> {
    static SCHEME: OnceLock<Regex> = OnceLock::new();
    static RELATIVE: OnceLock<Regex> = OnceLock::new();

    let scheme = SCHEME.get_or_init(|| {
        Regex::new(r"(?i)^(?:http|ftp)s?://").expect("scheme regex is valid")
    });
    let candidate = value.trim().to_string();
    if scheme.is_match(&candidate) && candidate.validate_url() {
        return Ok(candidate);
    }
    if relative {
        let relative_path = RELATIVE.get_or_init(|| {
            Regex::new(r"^/[^\s]*$|^\?[^\s]+$|^#[^\s]+$").expect("relative url regex is valid")
        });
        if relative_path.is_match(&candidate) {
            return Ok(candidate);
        }
    }
    Err(format!("\"{}\" is not a valid URL.", value))
}
