//! Tests for decoder module

use super::*;
use crate::error::ErrorKind;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn questions_layout() -> RecordLayout {
    RecordLayout::keyed("qid", &["type", "order"], "question")
}

// ============================================================================
// Array layout
// ============================================================================

#[test]
fn test_array_content() {
    let decoder = ContentDecoder::default();
    let body = json!({
        "responseCode": 200,
        "content": [{"id": "1", "title": "A"}, {"id": "2", "title": "B"}],
        "resultSet": {"count": 2}
    });

    let records = decoder.decode(&body).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["id"], "1");
    assert_eq!(records[1]["title"], "B");
}

#[test]
fn test_array_preserves_key_order() {
    let decoder = ContentDecoder::default();
    let body = json!({"content": [{"z": 1, "a": 2, "m": 3}]});

    let records = decoder.decode(&body).unwrap();
    let keys: Vec<&str> = records[0].keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["z", "a", "m"]);
}

#[test]
fn test_empty_and_null_content() {
    let decoder = ContentDecoder::default();
    assert!(decoder.decode(&json!({"content": []})).unwrap().is_empty());
    assert!(decoder.decode(&json!({"content": null})).unwrap().is_empty());
}

#[test]
fn test_missing_content_is_parse_error() {
    let decoder = ContentDecoder::default();
    let err = decoder.decode(&json!({"message": "oops"})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn test_non_object_item_is_parse_error() {
    let decoder = ContentDecoder::default();
    let err = decoder.decode(&json!({"content": [{"id": "1"}, 7]})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains("content[1]"));
}

#[test]
fn test_object_content_for_array_layout_is_parse_error() {
    let decoder = ContentDecoder::default();
    let err = decoder.decode(&json!({"content": {"id": "1"}})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn test_custom_path() {
    let decoder = ContentDecoder::default().with_path("data.items");
    let records = decoder
        .decode(&json!({"data": {"items": [{"id": 1}]}}))
        .unwrap();
    assert_eq!(records.len(), 1);
}

// ============================================================================
// Keyed layout
// ============================================================================

#[test]
fn test_keyed_content() {
    let decoder = ContentDecoder::new(questions_layout());
    let body = json!({
        "content": {
            "1": {"qid": "1", "type": "control_head", "order": "1", "text": "Title"},
            "3": {"qid": "3", "type": "control_textbox", "order": "2", "text": "Name"}
        }
    });

    let records = decoder.decode(&body).unwrap();
    assert_eq!(records.len(), 2);

    let first = Value::Object(records[0].clone());
    assert_eq!(
        first,
        json!({
            "qid": "1",
            "type": "control_head",
            "order": "1",
            "question": {"qid": "1", "type": "control_head", "order": "1", "text": "Title"}
        })
    );
    let keys: Vec<&str> = records[0].keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["qid", "type", "order", "question"]);
    assert_eq!(records[1]["qid"], "3");
}

#[test]
fn test_keyed_empty_array_is_empty() {
    let decoder = ContentDecoder::new(questions_layout());
    assert!(decoder.decode(&json!({"content": []})).unwrap().is_empty());
}

#[test]
fn test_keyed_missing_promoted_field() {
    let decoder = ContentDecoder::new(questions_layout());
    let err = decoder
        .decode(&json!({"content": {"1": {"type": "control_head"}}}))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains("order"));
}
