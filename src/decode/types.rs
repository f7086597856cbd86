//! Decoder types and traits

use crate::error::Result;
use crate::types::JsonObject;
use serde_json::Value;

/// Shape of the record container inside a response body
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RecordLayout {
    /// A JSON array of record objects
    #[default]
    Array,

    /// An object keyed by record id
    ///
    /// Each entry becomes `{key_field: <key>, <promoted fields>..., value_field: <entry>}`.
    KeyedObject {
        /// Field receiving the entry key
        key_field: String,
        /// Entry fields copied to the top level, in order
        promote: Vec<String>,
        /// Field receiving the whole entry
        value_field: String,
    },
}

impl RecordLayout {
    /// Keyed-object layout
    pub fn keyed(
        key_field: impl Into<String>,
        promote: &[&str],
        value_field: impl Into<String>,
    ) -> Self {
        Self::KeyedObject {
            key_field: key_field.into(),
            promote: promote.iter().map(|s| (*s).to_string()).collect(),
            value_field: value_field.into(),
        }
    }
}

/// Trait for extracting raw records from a decoded response body
pub trait RecordDecoder: Send + Sync {
    /// Extract the records carried by `body`, in response order
    fn decode(&self, body: &Value) -> Result<Vec<JsonObject>>;
}
