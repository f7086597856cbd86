//! Jotform stream catalog

use super::definition::{ParentLink, StreamDefinition};
use super::registry::StreamRegistry;
use super::schema::{Property, Schema};
use crate::decode::RecordLayout;
use crate::error::Result;
use crate::normalize::PostProcess;
use serde_json::json;

/// Records per page for paginated endpoints
pub const PAGE_SIZE: u64 = 100;

/// Every Jotform stream, validated and ordered
pub fn jotform_catalog() -> Result<StreamRegistry> {
    StreamRegistry::new(vec![
        forms(),
        questions(),
        submissions(),
        reports(),
        user_history(),
    ])
}

/// `/user/forms`
pub fn forms() -> StreamDefinition {
    let schema = Schema::new()
        .property(Property::string("id").describe("The Form ID"))
        .property(Property::string("username"))
        .property(Property::string("title"))
        .property(Property::integer("height"))
        .property(Property::string("url"))
        .property(Property::string("status"))
        .property(Property::date_time("created_at"))
        .property(Property::date_time("updated_at"))
        .property(Property::date_time("last_submission"))
        .property(Property::integer("new").describe("Total number of unread submissions"))
        .property(Property::integer("count").describe("Total number of submissions"))
        .property(Property::string("type"))
        .property(Property::integer("favorite"))
        .property(Property::integer("archived"));

    StreamDefinition::new("forms", "/user/forms")
        .replication_key("updated_at")
        .paginated(PAGE_SIZE)
        .integer_fields(&["height", "new", "count", "favorite", "archived"])
        .hook(PostProcess::fallback("updated_at", "created_at"))
        .schema(schema.into_value())
}

/// `/form/{form_id}/questions`, one invocation per form
pub fn questions() -> StreamDefinition {
    let schema = Schema::new()
        .property(Property::string("qid").required().describe("Question ID"))
        .property(Property::string("form_id").required().describe("Form ID"))
        .property(
            Property::string("type")
                .required()
                .describe("Question type such as textbox or dropdown"),
        )
        .property(
            Property::integer("order")
                .required()
                .describe("Question order in the form"),
        )
        .property(
            Property::object("question")
                .required()
                .describe("Question data"),
        );

    StreamDefinition::new("questions", "/form/{form_id}/questions")
        .primary_keys(&["form_id", "qid"])
        .layout(RecordLayout::keyed("qid", &["type", "order"], "question"))
        .integer_fields(&["order"])
        .child_of(ParentLink::field("forms", "id", "form_id"))
        .schema(schema.into_value())
}

/// `/user/submissions`
pub fn submissions() -> StreamDefinition {
    let answer = Schema::new()
        .property(Property::string("qid").required())
        .property(Property::string("answer"));

    let schema = Schema::new()
        .property(Property::string("id").describe("The Submission ID"))
        .property(Property::string("form_id"))
        .property(Property::string("ip"))
        .property(Property::integer("flag"))
        .property(Property::string("notes"))
        .property(Property::date_time("created_at"))
        .property(Property::date_time("updated_at"))
        .property(Property::string("status"))
        .property(Property::integer("new").describe("Total number of unread submissions"))
        .property(Property::array("answers", object_items(answer)));

    StreamDefinition::new("submissions", "/user/submissions")
        .replication_key("updated_at")
        .paginated(PAGE_SIZE)
        .integer_fields(&["flag", "new"])
        .hook(PostProcess::fallback("updated_at", "created_at"))
        .hook(PostProcess::flatten_answers("answers"))
        .schema(schema.into_value())
}

/// `/user/reports`
pub fn reports() -> StreamDefinition {
    let schema = Schema::new()
        .property(Property::string("id").describe("The Report ID"))
        .property(Property::string("form_id"))
        .property(Property::string("title"))
        .property(Property::date_time("created_at"))
        .property(Property::date_time("updated_at"))
        .property(Property::array("fields", json!({"type": ["string"]})))
        .property(Property::string("list_type").allowed(&[
            "excel", "csv", "grid", "table", "calendar", "rss", "visual",
        ]))
        .property(Property::string("status").allowed(&["ENABLED", "DELETED"]))
        .property(Property::string("url"))
        .property(Property::boolean("isProtected"))
        .property(Property::string("type"))
        .property(Property::string("form_title"))
        .property(Property::integer("form_count"))
        .property(Property::string("form_url"))
        .property(Property::date_time("last_submission"));

    StreamDefinition::new("reports", "/user/reports")
        .integer_fields(&["form_count"])
        .hook(PostProcess::split_list("fields", ","))
        .schema(schema.into_value())
}

/// `/user/history`
pub fn user_history() -> StreamDefinition {
    let schema = Schema::new()
        .property(Property::string("type").allowed(&[
            "userCreation",
            "userLogin",
            "formCreation",
            "formUpdate",
            "formDelete",
            "formPurge",
        ]))
        .property(Property::string("username"))
        .property(Property::string("ip"))
        .property(Property::string("server"))
        .property(Property::integer("timestamp"))
        .property(Property::email("email"))
        .property(Property::string("parent"))
        .property(Property::string("subuser"));

    StreamDefinition::new("user_history", "/user/history")
        .primary_keys(&[])
        .integer_fields(&["timestamp"])
        .param("action", "all")
        .param("date", "all")
        .param("sortBy", "ASC")
        .schema(schema.into_value())
}

fn object_items(members: Schema) -> serde_json::Value {
    let mut items = members.into_value();
    if let Some(obj) = items.as_object_mut() {
        obj.insert("type".to_string(), json!(["object", "null"]));
    }
    items
}
