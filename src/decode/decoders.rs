//! Decoder implementations

use super::types::{RecordDecoder, RecordLayout};
use crate::error::{Error, Result};
use crate::pagination::lookup_path;
use crate::types::JsonObject;
use serde_json::Value;

/// Default location of records in a Jotform response
pub const CONTENT_PATH: &str = "content";

// ============================================================================
// Content Decoder
// ============================================================================

/// Reads records from a fixed path of the response body
#[derive(Debug, Clone)]
pub struct ContentDecoder {
    record_path: String,
    layout: RecordLayout,
}

impl Default for ContentDecoder {
    fn default() -> Self {
        Self::new(RecordLayout::Array)
    }
}

impl ContentDecoder {
    /// Decoder reading `content` with the given layout
    pub fn new(layout: RecordLayout) -> Self {
        Self {
            record_path: CONTENT_PATH.to_string(),
            layout,
        }
    }

    /// Read records from a different path
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.record_path = path.into();
        self
    }

    fn decode_array(&self, items: &[Value]) -> Result<Vec<JsonObject>> {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(map) => Ok(map.clone()),
                other => Err(Error::parse(format!(
                    "'{}[{index}]' is not an object: {other}",
                    self.record_path
                ))),
            })
            .collect()
    }

    fn decode_keyed(
        &self,
        entries: &JsonObject,
        key_field: &str,
        promote: &[String],
        value_field: &str,
    ) -> Result<Vec<JsonObject>> {
        let mut records = Vec::with_capacity(entries.len());

        for (key, entry) in entries {
            let mut record = JsonObject::new();
            record.insert(key_field.to_string(), Value::String(key.clone()));

            for field in promote {
                let value = entry.get(field).ok_or_else(|| {
                    Error::parse(format!(
                        "'{}.{key}' has no '{field}' field",
                        self.record_path
                    ))
                })?;
                record.insert(field.clone(), value.clone());
            }

            record.insert(value_field.to_string(), entry.clone());
            records.push(record);
        }

        Ok(records)
    }
}

impl RecordDecoder for ContentDecoder {
    fn decode(&self, body: &Value) -> Result<Vec<JsonObject>> {
        let content = lookup_path(body, &self.record_path)
            .ok_or_else(|| Error::parse(format!("response has no '{}'", self.record_path)))?;

        match (&self.layout, content) {
            (_, Value::Null) => Ok(Vec::new()),
            (RecordLayout::Array, Value::Array(items)) => self.decode_array(items),
            (
                RecordLayout::KeyedObject {
                    key_field,
                    promote,
                    value_field,
                },
                Value::Object(entries),
            ) => self.decode_keyed(entries, key_field, promote, value_field),
            // An empty keyed collection is serialized as `[]`
            (RecordLayout::KeyedObject { .. }, Value::Array(items)) if items.is_empty() => {
                Ok(Vec::new())
            }
            (layout, other) => Err(Error::parse(format!(
                "'{}' does not match layout {layout:?}: {}",
                self.record_path,
                json_type(other)
            ))),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
