//! Documents and query predicates
//!
//! The remote store is schemaless: a document is an ID plus a JSON object.
//! Typed models serialize into and out of that object; the store itself
//! never interprets fields beyond predicate matching.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};

/// One stored document: its ID and its top-level fields
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    /// Deserialize the fields into a typed model
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(Into::into)
    }
}

/// Serialize a model into the field map a store write expects.
/// The model must serialize to a JSON object.
pub fn fields_of<T: Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Generic(format!(
            "expected a JSON object for a document body, got {other}"
        ))),
    }
}

/// Query predicate, matching the filter surface the store exposes:
/// equality, range-prefix on strings and array membership.
#[derive(Debug, Clone)]
pub enum Predicate {
    Eq { field: String, value: Value },
    Prefix { field: String, prefix: String },
    Contains { field: String, value: Value },
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Predicate::Prefix {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Predicate::Eq { field, value } => doc.fields.get(field) == Some(value),
            Predicate::Prefix { field, prefix } => doc
                .fields
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| s.starts_with(prefix)),
            Predicate::Contains { field, value } => doc
                .fields
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(body: Value) -> Document {
        let Value::Object(fields) = body else {
            panic!("test body must be an object")
        };
        Document {
            id: "d1".into(),
            fields,
        }
    }

    #[test]
    fn eq_matches_exact_value() {
        let d = doc(json!({"status": "pending"}));
        assert!(Predicate::eq("status", "pending").matches(&d));
        assert!(!Predicate::eq("status", "done").matches(&d));
        assert!(!Predicate::eq("missing", "pending").matches(&d));
    }

    #[test]
    fn prefix_matches_string_fields_only() {
        let d = doc(json!({"email": "grace@example.com", "size": 3}));
        assert!(Predicate::prefix("email", "gra").matches(&d));
        assert!(!Predicate::prefix("email", "hop").matches(&d));
        assert!(!Predicate::prefix("size", "3").matches(&d));
    }

    #[test]
    fn contains_matches_array_membership() {
        let d = doc(json!({"collaborators": ["a@x.com", "b@x.com"]}));
        assert!(Predicate::contains("collaborators", "a@x.com").matches(&d));
        assert!(!Predicate::contains("collaborators", "c@x.com").matches(&d));
    }

    #[test]
    fn fields_of_rejects_non_objects() {
        assert!(fields_of(&"just a string").is_err());
    }
}
