//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs:
//!
//! ```json
//! {"bookmarks": {"forms": {"replication_key": "updated_at",
//!                          "replication_key_value": "2024-01-01 10:00:00"}}}
//! ```

use crate::stream::RequestContext;
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete state for a tap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Per-stream bookmarks
    #[serde(default)]
    pub bookmarks: BTreeMap<String, StreamState>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for a stream
    pub fn get_stream(&self, stream: &str) -> Option<&StreamState> {
        self.bookmarks.get(stream)
    }

    /// Get mutable state for a stream, creating if needed
    pub fn get_stream_mut(&mut self, stream: &str) -> &mut StreamState {
        self.bookmarks.entry(stream.to_string()).or_default()
    }

    /// Bookmark of a stream, or of one of its partitions
    pub fn bookmark(&self, stream: &str, partition: Option<&RequestContext>) -> Option<&JsonValue> {
        let stream_state = self.get_stream(stream)?;
        match partition {
            None => stream_state.replication_key_value.as_ref(),
            Some(context) => stream_state
                .get_partition(context)?
                .replication_key_value
                .as_ref(),
        }
    }

    /// Overwrite a bookmark without comparing
    pub fn put_bookmark(
        &mut self,
        stream: &str,
        partition: Option<&RequestContext>,
        replication_key: &str,
        value: JsonValue,
    ) {
        let stream_state = self.get_stream_mut(stream);
        match partition {
            None => {
                stream_state.replication_key = Some(replication_key.to_string());
                stream_state.replication_key_value = Some(value);
            }
            Some(context) => {
                let partition = stream_state.get_partition_mut(context);
                partition.replication_key = Some(replication_key.to_string());
                partition.replication_key_value = Some(value);
            }
        }
    }
}

/// State for a single stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamState {
    /// Field the bookmark tracks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,

    /// High-water value of the replication key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key_value: Option<JsonValue>,

    /// Per-context bookmarks of a child stream
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partitions: Vec<PartitionState>,
}

impl StreamState {
    /// Create a new empty stream state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get partition state
    pub fn get_partition(&self, context: &RequestContext) -> Option<&PartitionState> {
        self.partitions.iter().find(|p| &p.context == context)
    }

    /// Get mutable partition state, creating if needed
    pub fn get_partition_mut(&mut self, context: &RequestContext) -> &mut PartitionState {
        let index = match self.partitions.iter().position(|p| &p.context == context) {
            Some(index) => index,
            None => {
                self.partitions.push(PartitionState::new(context.clone()));
                self.partitions.len() - 1
            }
        };
        &mut self.partitions[index]
    }
}

/// State for a single partition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionState {
    /// Context identifying the partition
    pub context: RequestContext,

    /// Field the bookmark tracks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,

    /// High-water value within this partition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key_value: Option<JsonValue>,
}

impl PartitionState {
    /// Create a new empty partition state
    pub fn new(context: RequestContext) -> Self {
        Self {
            context,
            replication_key: None,
            replication_key_value: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_default() {
        let state = State::new();
        assert!(state.bookmarks.is_empty());
        assert_eq!(serde_json::to_value(&state).unwrap(), json!({"bookmarks": {}}));
    }

    #[test]
    fn test_stream_bookmark() {
        let mut state = State::new();
        assert!(state.bookmark("forms", None).is_none());

        state.put_bookmark("forms", None, "updated_at", json!("2024-01-01"));
        assert_eq!(state.bookmark("forms", None), Some(&json!("2024-01-01")));
    }

    #[test]
    fn test_partition_bookmarks() {
        let mut state = State::new();
        let a = RequestContext::new().with("form_id", "A");
        let b = RequestContext::new().with("form_id", "B");

        state.put_bookmark("answers", Some(&a), "updated_at", json!("1"));
        state.put_bookmark("answers", Some(&b), "updated_at", json!("2"));
        state.put_bookmark("answers", Some(&a), "updated_at", json!("3"));

        assert_eq!(state.bookmark("answers", Some(&a)), Some(&json!("3")));
        assert_eq!(state.bookmark("answers", Some(&b)), Some(&json!("2")));
        assert_eq!(state.bookmark("answers", None), None);
        assert_eq!(state.get_stream("answers").unwrap().partitions.len(), 2);
    }

    #[test]
    fn test_singer_shape() {
        let mut state = State::new();
        state.put_bookmark("forms", None, "updated_at", json!("2024-01-01 00:00:00"));
        let ctx = RequestContext::new().with("form_id", "9");
        state.put_bookmark("child", Some(&ctx), "updated_at", json!("x"));

        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({
                "bookmarks": {
                    "child": {
                        "partitions": [{
                            "context": {"form_id": "9"},
                            "replication_key": "updated_at",
                            "replication_key_value": "x"
                        }]
                    },
                    "forms": {
                        "replication_key": "updated_at",
                        "replication_key_value": "2024-01-01 00:00:00"
                    }
                }
            })
        );
    }

    #[test]
    fn test_parse_foreign_state() {
        let state: State = serde_json::from_str(
            r#"{"bookmarks": {"forms": {"replication_key": "updated_at",
                "replication_key_value": "2023-05-01 12:00:00", "starting_replication_value": null}}}"#,
        )
        .unwrap();
        assert_eq!(
            state.bookmark("forms", None),
            Some(&json!("2023-05-01 12:00:00"))
        );
    }
}
