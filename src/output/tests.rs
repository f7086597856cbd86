//! Tests for message output

use super::*;
use crate::state::State;
use crate::stream::{forms, questions};
use crate::types::JsonObject;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

fn object(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn test_schema_message() {
    let message = Message::schema(&forms());
    let value = serde_json::to_value(&message).unwrap();

    assert_eq!(value["type"], "SCHEMA");
    assert_eq!(value["stream"], "forms");
    assert_eq!(value["key_properties"], json!(["id"]));
    assert_eq!(value["bookmark_properties"], json!(["updated_at"]));
    assert_eq!(value["schema"]["properties"]["height"]["type"], json!(["integer", "null"]));
}

#[test]
fn test_schema_message_without_replication_key() {
    let value = serde_json::to_value(Message::schema(&questions())).unwrap();
    assert_eq!(value["key_properties"], json!(["form_id", "qid"]));
    assert!(value.get("bookmark_properties").is_none());
}

#[test]
fn test_record_message() {
    let message = Message::Record {
        stream: "forms".to_string(),
        record: object(json!({"id": "1"})),
        time_extracted: None,
    };
    assert_eq!(
        serde_json::to_string(&message).unwrap(),
        r#"{"type":"RECORD","stream":"forms","record":{"id":"1"}}"#
    );
    assert_eq!(message.stream(), Some("forms"));
    assert!(message.is_record());
}

#[test]
fn test_state_message() {
    let mut state = State::new();
    state.put_bookmark("forms", None, "updated_at", json!("2024-01-01"));
    let message = Message::state(state);

    assert_eq!(
        serde_json::to_value(&message).unwrap(),
        json!({
            "type": "STATE",
            "value": {"bookmarks": {"forms": {
                "replication_key": "updated_at",
                "replication_key_value": "2024-01-01"
            }}}
        })
    );
    assert_eq!(message.stream(), None);
}

#[test]
fn test_message_round_trip_from_text() {
    let message: Message =
        serde_json::from_str(r#"{"type": "RECORD", "stream": "reports", "record": {"id": "7"}}"#)
            .unwrap();
    assert!(matches!(message, Message::Record { ref stream, .. } if stream == "reports"));
}

#[test]
fn test_json_lines_sink() {
    let sink = JsonLinesSink::new(Vec::new());
    sink.write(Message::schema(&forms())).unwrap();
    sink.emit("forms", object(json!({"id": "1", "title": "A"})))
        .unwrap();
    sink.write(Message::state(State::new())).unwrap();

    let output = String::from_utf8(sink.into_inner().unwrap()).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 3);

    let record: Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(record["type"], "RECORD");
    assert_eq!(record["record"], json!({"id": "1", "title": "A"}));
    assert!(record["time_extracted"].is_string());
    assert_eq!(lines[2], r#"{"type":"STATE","value":{"bookmarks":{}}}"#);
}

#[test]
fn test_json_lines_sink_keeps_record_key_order() {
    let sink = JsonLinesSink::new(Vec::new());
    sink.write(Message::Record {
        stream: "s".to_string(),
        record: object(json!({"z": 1, "a": 2})),
        time_extracted: None,
    })
    .unwrap();
    let output = String::from_utf8(sink.into_inner().unwrap()).unwrap();
    assert!(output.contains(r#"{"z":1,"a":2}"#));
}

#[test]
fn test_memory_sink() {
    let sink = MemorySink::new();
    sink.emit("forms", object(json!({"id": "1"}))).unwrap();
    sink.emit("reports", object(json!({"id": "r"}))).unwrap();
    sink.emit("forms", object(json!({"id": "2"}))).unwrap();
    sink.write(Message::state(State::new())).unwrap();

    let ids: Vec<Value> = sink
        .records("forms")
        .into_iter()
        .map(|r| r["id"].clone())
        .collect();
    assert_eq!(ids, vec![json!("1"), json!("2")]);
    assert_eq!(sink.state_count(), 1);
    assert_eq!(sink.messages().len(), 4);
}

#[test]
fn test_memory_sink_concurrent_writers() {
    let sink = Arc::new(MemorySink::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let sink = Arc::clone(&sink);
            std::thread::spawn(move || {
                for j in 0..25 {
                    sink.emit("s", object(json!({"id": format!("{i}-{j}")})))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(sink.records("s").len(), 200);
}
