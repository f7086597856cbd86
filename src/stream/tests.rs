//! Tests for stream definitions, registry and catalog

use super::schema::{integer_properties, Property, Schema};
use super::*;
use crate::error::{Error, ErrorKind};
use crate::types::{JsonObject, SyncMode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn object(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn names(selected: &[&str]) -> Vec<String> {
    selected.iter().map(|s| (*s).to_string()).collect()
}

// ============================================================================
// Catalog
// ============================================================================

#[test]
fn test_catalog_order_and_names() {
    let registry = jotform_catalog().unwrap();
    assert_eq!(
        registry.names(),
        vec!["forms", "questions", "submissions", "reports", "user_history"]
    );
    let roots: Vec<&str> = registry.roots().map(|d| d.name.as_str()).collect();
    assert_eq!(roots, vec!["forms", "submissions", "reports", "user_history"]);
}

#[test]
fn test_catalog_capabilities() {
    let registry = jotform_catalog().unwrap();

    let forms = registry.get("forms").unwrap().capabilities(true);
    assert_eq!(
        forms,
        Capabilities {
            paginated: true,
            has_children: true,
            needs_coercion: true,
        }
    );

    let questions = registry.get("questions").unwrap().capabilities(false);
    assert!(!questions.paginated);
    assert!(!questions.has_children);

    let submissions = registry.get("submissions").unwrap().capabilities(false);
    assert!(submissions.paginated);
    assert!(submissions.needs_coercion);

    let user_history = registry.get("user_history").unwrap().capabilities(false);
    assert!(!user_history.paginated);
    assert!(user_history.needs_coercion);
}

#[test]
fn test_catalog_sync_modes() {
    let registry = jotform_catalog().unwrap();
    assert_eq!(registry.get("forms").unwrap().sync_mode(), SyncMode::Incremental);
    assert_eq!(
        registry.get("submissions").unwrap().sync_mode(),
        SyncMode::Incremental
    );
    assert_eq!(
        registry.get("reports").unwrap().sync_mode(),
        SyncMode::FullRefresh
    );
    assert_eq!(
        registry.get("questions").unwrap().sync_mode(),
        SyncMode::FullRefresh
    );
}

#[test]
fn test_catalog_integer_fields_match_schema() {
    let registry = jotform_catalog().unwrap();
    for def in registry.ordered() {
        let mut declared = def.integer_fields.clone();
        declared.sort();
        let mut typed = integer_properties(&def.schema);
        typed.sort();
        assert_eq!(declared, typed, "stream {}", def.name);
    }
}

#[test]
fn test_user_history_params() {
    let def = user_history();
    assert!(def.primary_keys.is_empty());
    assert_eq!(
        def.extra_params,
        vec![
            ("action".to_string(), "all".to_string()),
            ("date".to_string(), "all".to_string()),
            ("sortBy".to_string(), "ASC".to_string()),
        ]
    );
}

#[test]
fn test_unknown_stream() {
    let registry = jotform_catalog().unwrap();
    let err = registry.get("nope").unwrap_err();
    assert!(matches!(err, Error::StreamNotFound { .. }));
}

// ============================================================================
// Registry validation
// ============================================================================

#[test]
fn test_children_declared_first_are_reordered() {
    let registry = StreamRegistry::new(vec![
        StreamDefinition::new("child", "/p/{pid}/c").child_of(ParentLink::field("parent", "id", "pid")),
        StreamDefinition::new("other", "/other"),
        StreamDefinition::new("parent", "/parent"),
    ])
    .unwrap();

    assert_eq!(registry.names(), vec!["other", "parent", "child"]);
    let ancestors: Vec<&str> = registry
        .ancestors("child")
        .unwrap()
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(ancestors, vec!["parent"]);
}

#[test]
fn test_duplicate_names_rejected() {
    let err = StreamRegistry::new(vec![
        StreamDefinition::new("forms", "/a"),
        StreamDefinition::new("forms", "/b"),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("duplicate"));
}

#[test]
fn test_unknown_parent_rejected() {
    let err = StreamRegistry::new(vec![StreamDefinition::new("q", "/f/{id}")
        .child_of(ParentLink::field("missing", "id", "id"))])
    .unwrap_err();
    assert!(err.to_string().contains("unknown parent"));
}

#[test]
fn test_cycle_rejected() {
    let err = StreamRegistry::new(vec![
        StreamDefinition::new("a", "/a").child_of(ParentLink::field("b", "id", "b_id")),
        StreamDefinition::new("b", "/b").child_of(ParentLink::field("a", "id", "a_id")),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("cycle"));
}

#[test]
fn test_zero_page_size_rejected() {
    let err = StreamRegistry::new(vec![StreamDefinition::new("a", "/a").paginated(0)]).unwrap_err();
    assert!(err.to_string().contains("page size"));
}

#[test]
fn test_unbound_placeholder_rejected() {
    let err = StreamRegistry::new(vec![StreamDefinition::new("a", "/form/{form_id}")]).unwrap_err();
    assert!(err.to_string().contains("form_id"));
}

#[test]
fn test_duplicate_primary_key_rejected() {
    let err = StreamRegistry::new(vec![
        StreamDefinition::new("a", "/a").primary_keys(&["id", "id"])
    ])
    .unwrap_err();
    assert!(err.to_string().contains("primary key"));
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_select_all() {
    let registry = jotform_catalog().unwrap();
    let selection = registry.select(None).unwrap();
    assert!(selection.emits("forms"));
    assert!(selection.emits("questions"));
    assert_eq!(selection.emitted().len(), 5);
}

#[test]
fn test_select_child_pulls_in_parent_silently() {
    let registry = jotform_catalog().unwrap();
    let selection = registry.select(Some(&names(&["questions"]))).unwrap();

    assert!(selection.runs("questions"));
    assert!(selection.emits("questions"));
    assert!(selection.runs("forms"));
    assert!(!selection.emits("forms"));
    assert!(!selection.runs("submissions"));
}

#[test]
fn test_select_parent_and_child() {
    let registry = jotform_catalog().unwrap();
    let selection = registry
        .select(Some(&names(&["questions", "forms"])))
        .unwrap();
    assert!(selection.emits("forms"));
    assert!(selection.emits("questions"));
}

#[test]
fn test_select_unknown_stream() {
    let registry = jotform_catalog().unwrap();
    assert!(registry.select(Some(&names(&["forms", "bogus"]))).is_err());
}

// ============================================================================
// Context mapping
// ============================================================================

#[test]
fn test_field_mapping() {
    let link = ParentLink::field("forms", "id", "form_id");
    let ctx = link
        .context_for("questions", &object(json!({"id": "A", "title": "x"})))
        .unwrap();
    assert_eq!(ctx, RequestContext::new().with("form_id", "A"));
}

#[test]
fn test_field_mapping_missing_or_null() {
    let link = ParentLink::field("forms", "id", "form_id");

    let err = link
        .context_for("questions", &object(json!({"title": "x"})))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChildContext);

    let err = link
        .context_for("questions", &object(json!({"id": null})))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChildContext);
}

fn owner_and_form(record: &JsonObject) -> Option<RequestContext> {
    let id = record.get("id")?.clone();
    let owner = record.get("username")?.clone();
    Some(RequestContext::new().with("form_id", id).with("owner", owner))
}

#[test]
fn test_custom_mapping() {
    let link = ParentLink::custom("forms", "owner_and_form", &["form_id", "owner"], owner_and_form);
    assert_eq!(link.mapping.provided_keys(), names(&["form_id", "owner"]));

    let ctx = link
        .context_for("c", &object(json!({"id": "1", "username": "ann"})))
        .unwrap();
    assert_eq!(ctx.get("owner"), Some(&json!("ann")));

    let err = link.context_for("c", &object(json!({"id": "1"}))).unwrap_err();
    assert!(err.to_string().contains("owner_and_form"));
}

#[test]
fn test_context_injection_does_not_overwrite() {
    let ctx = RequestContext::new().with("form_id", "A").with("extra", 1);
    let mut record = object(json!({"qid": "1", "form_id": "kept"}));
    ctx.inject_into(&mut record);
    assert_eq!(
        Value::Object(record),
        json!({"qid": "1", "form_id": "kept", "extra": 1})
    );
}

#[test]
fn test_missing_primary_key() {
    let def = questions();
    assert_eq!(
        def.missing_primary_key(&object(json!({"form_id": "1", "qid": null}))),
        Some("qid")
    );
    assert_eq!(
        def.missing_primary_key(&object(json!({"form_id": "1", "qid": "2"}))),
        None
    );
    assert_eq!(user_history().missing_primary_key(&object(json!({}))), None);
}

// ============================================================================
// Schema
// ============================================================================

#[test]
fn test_schema_rendering() {
    let schema = Schema::new()
        .property(Property::string("id").required())
        .property(Property::integer("count"))
        .property(Property::date_time("created_at"))
        .property(Property::string("status").allowed(&["A", "B"]))
        .into_value();

    assert_eq!(
        schema,
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "string"},
                "count": {"type": ["integer", "null"]},
                "created_at": {"type": ["string", "null"], "format": "date-time"},
                "status": {"type": ["string", "null"], "enum": ["A", "B", null]}
            },
            "required": ["id"]
        })
    );
    assert_eq!(integer_properties(&schema), vec!["count".to_string()]);
}

#[test]
fn test_submission_answers_schema() {
    let def = submissions();
    let answers = &def.schema["properties"]["answers"];
    assert_eq!(answers["type"], json!(["array", "null"]));
    assert_eq!(answers["items"]["type"], json!(["object", "null"]));
    assert_eq!(answers["items"]["properties"]["qid"]["type"], json!("string"));
}
