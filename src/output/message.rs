//! Singer messages
//!
//! One JSON object per line on stdout:
//!
//! ```text
//! {"type": "SCHEMA", "stream": "forms", "schema": {..}, "key_properties": ["id"]}
//! {"type": "RECORD", "stream": "forms", "record": {..}}
//! {"type": "STATE", "value": {"bookmarks": {..}}}
//! ```

use crate::state::State;
use crate::stream::StreamDefinition;
use crate::types::{JsonObject, JsonValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message emitted during sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Record shape of a stream
    Schema {
        /// Stream name
        stream: String,
        /// JSON Schema of the records
        schema: JsonValue,
        /// Primary key fields
        key_properties: Vec<String>,
        /// Replication key, when incremental
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        bookmark_properties: Vec<String>,
    },
    /// One normalized record
    Record {
        /// Stream name
        stream: String,
        /// The record
        record: JsonObject,
        /// Extraction time
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_extracted: Option<DateTime<Utc>>,
    },
    /// Bookmark checkpoint
    State {
        /// Complete state at this point
        value: State,
    },
}

impl Message {
    /// Schema message for a stream definition
    pub fn schema(definition: &StreamDefinition) -> Self {
        Self::Schema {
            stream: definition.name.clone(),
            schema: definition.schema.clone(),
            key_properties: definition.primary_keys.clone(),
            bookmark_properties: definition.replication_key.iter().cloned().collect(),
        }
    }

    /// Create a record message stamped with the current time
    pub fn record(stream: impl Into<String>, record: JsonObject) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted: Some(Utc::now()),
        }
    }

    /// Create a state message
    pub fn state(value: State) -> Self {
        Self::State { value }
    }

    /// Stream this message belongs to, if any
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Schema { stream, .. } | Self::Record { stream, .. } => Some(stream),
            Self::State { .. } => None,
        }
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Check if this is a schema message
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }
}
