//! The errors mapping returned alongside dumped and loaded data

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Key under which schema-level validator messages are collected
pub const SCHEMA_KEY: &str = "_schema";

/// One entry of an [`Errors`] mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorEntry {
    Message(String),
    Messages(Vec<String>),
    Nested(Errors),
}

impl ErrorEntry {
    /// The message, if this entry is a single message
    pub fn as_message(&self) -> Option<&str> {
        match self {
            ErrorEntry::Message(m) => Some(m),
            _ => None,
        }
    }

    /// The nested mapping, if this entry came from a nested schema or a `many` item
    pub fn as_nested(&self) -> Option<&Errors> {
        match self {
            ErrorEntry::Nested(e) => Some(e),
            _ => None,
        }
    }

    /// All messages held by this entry, flattened
    pub fn messages(&self) -> Vec<String> {
        match self {
            ErrorEntry::Message(m) => vec![m.clone()],
            ErrorEntry::Messages(ms) => ms.clone(),
            ErrorEntry::Nested(e) => e.values().flat_map(ErrorEntry::messages).collect(),
        }
    }
}

/// Ordered mapping of field key to error entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Errors(IndexMap<String, ErrorEntry>);

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&ErrorEntry> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Message stored for `key`, if it is a single message
    pub fn message(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ErrorEntry::as_message)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &ErrorEntry> {
        self.0.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ErrorEntry)> {
        self.0.iter()
    }

    /// Store a field message; a later failure for the same key replaces it
    pub fn insert_message(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.0.insert(key.into(), ErrorEntry::Message(message.into()));
    }

    pub fn insert_nested(&mut self, key: impl Into<String>, errors: Errors) {
        self.0.insert(key.into(), ErrorEntry::Nested(errors));
    }

    /// Merge `errors` into the nested mapping under `key`, creating it if needed
    pub fn merge_nested(&mut self, key: impl Into<String>, errors: Errors) {
        let key = key.into();
        match self.0.get_mut(&key) {
            Some(ErrorEntry::Nested(existing)) => existing.extend(errors),
            _ => {
                self.0.insert(key, ErrorEntry::Nested(errors));
            }
        }
    }

    /// Append a message under `key`, keeping earlier ones
    pub fn push_message(&mut self, key: &str, message: impl Into<String>) {
        let message = message.into();
        match self.0.get_mut(key) {
            Some(ErrorEntry::Messages(list)) => list.push(message),
            Some(entry @ ErrorEntry::Message(_)) => {
                let first = entry.messages();
                *entry = ErrorEntry::Messages(first.into_iter().chain([message]).collect());
            }
            _ => {
                self.0
                    .insert(key.to_string(), ErrorEntry::Messages(vec![message]));
            }
        }
    }

    /// Messages collected under [`SCHEMA_KEY`]
    pub fn schema_messages(&self) -> Vec<String> {
        self.get(SCHEMA_KEY)
            .map(ErrorEntry::messages)
            .unwrap_or_default()
    }

    /// Merge another mapping in; entries of `other` win on conflicting keys
    pub fn extend(&mut self, other: Errors) {
        self.0.extend(other.0);
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{:?}", self.0),
        }
    }
}

impl IntoIterator for Errors {
    type Item = (String, ErrorEntry);
    type IntoIter = indexmap::map::IntoIter<String, ErrorEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_and_read_message() {
        let mut errors = Errors::new();
        errors.insert_message("email", "Not a valid email address.");
        assert_eq!(errors.message("email"), Some("Not a valid email address."));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_push_message_accumulates_schema_messages() {
        let mut errors = Errors::new();
        errors.push_message(SCHEMA_KEY, "first");
        errors.push_message(SCHEMA_KEY, "second");
        assert_eq!(errors.schema_messages(), vec!["first", "second"]);
    }

    #[test]
    fn test_push_message_promotes_single_message() {
        let mut errors = Errors::new();
        errors.insert_message("name", "one");
        errors.push_message("name", "two");
        assert_eq!(errors.get("name").map(ErrorEntry::messages), Some(vec!["one".to_string(), "two".to_string()]));
    }

    #[test]
    fn test_serializes_nested_shape() {
        let mut inner = Errors::new();
        inner.insert_message("email", "bad");
        let mut errors = Errors::new();
        errors.insert_nested("author", inner);
        errors.push_message(SCHEMA_KEY, "schema level");
        assert_eq!(
            errors.to_value(),
            json!({"author": {"email": "bad"}, "_schema": ["schema level"]})
        );
    }

    #[test]
    fn test_display_is_json() {
        let mut errors = Errors::new();
        errors.insert_message("age", "invalid");
        assert_eq!(errors.to_string(), r#"{"age":"invalid"}"#);
    }
}
