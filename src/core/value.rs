//! Helpers over `serde_json::Value` shared by fields and schemas

use serde_json::Value;

/// Look up `key` in `obj`
///
/// Dotted keys walk nested objects (`"author.name"`), and numeric segments
/// index into arrays. A missing segment yields `None`.
pub fn get_value<'a>(key: &str, obj: &'a Value) -> Option<&'a Value> {
    if let Some(found) = lookup(key, obj) {
        return Some(found);
    }
    if !key.contains('.') {
        return None;
    }
    key.split('.')
        .try_fold(obj, |current, segment| lookup(segment, current))
}

fn lookup<'a>(segment: &str, obj: &'a Value) -> Option<&'a Value> {
    match obj {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Truthiness of a JSON value: null, false, zero and empty containers are false
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Text form of a value: strings as-is, everything else as compact JSON
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Short representation used inside error messages
pub fn repr(value: &Value) -> String {
    value.to_string()
}
