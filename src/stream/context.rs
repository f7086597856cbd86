//! Parent-derived request context

use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};

/// Placeholder values for one child invocation
///
/// Built from a parent record, used to render the child's path, injected into
/// the child's records and, for incremental children, used as the partition
/// key of the child's bookmark.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestContext(JsonObject);

impl RequestContext {
    /// Empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Set a value in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.0.iter()
    }

    /// Whether the context holds nothing
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow as a JSON object
    pub fn as_object(&self) -> &JsonObject {
        &self.0
    }

    /// Copy every entry into `record` unless the record already has it
    pub fn inject_into(&self, record: &mut JsonObject) {
        for (key, value) in &self.0 {
            if !record.contains_key(key) {
                record.insert(key.clone(), value.clone());
            }
        }
    }

    /// Compact string form used in logs
    pub fn describe(&self) -> String {
        JsonValue::Object(self.0.clone()).to_string()
    }
}

impl From<JsonObject> for RequestContext {
    fn from(map: JsonObject) -> Self {
        Self(map)
    }
}
