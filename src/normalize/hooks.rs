//! Per-stream post-processing hooks

use super::python_json;
use crate::error::{Error, Result};
use crate::types::{is_blank, JsonObject, JsonValue};

/// Signature of a caller-supplied hook
pub type HookFn = fn(JsonObject) -> Result<JsonObject>;

/// One post-processing step, applied after integer coercion
#[derive(Debug, Clone)]
pub enum PostProcess {
    /// Default `field` to `fallback` when it is absent, null or empty
    FallbackField {
        /// Field to fill
        field: String,
        /// Field to copy from
        fallback: String,
    },

    /// Turn `{qid: entry}` into `[{qid, ...entry}]` with JSON-encoded answers
    FlattenAnswers {
        /// Field holding the answer map
        field: String,
    },

    /// Split a delimited string into a list of strings
    SplitList {
        /// Field holding the delimited string
        field: String,
        /// Separator
        delimiter: String,
    },

    /// Caller-defined transformation
    Custom {
        /// Name used in logs
        name: &'static str,
        /// The transformation
        apply: HookFn,
    },
}

impl PostProcess {
    /// `field` falls back to `fallback`
    pub fn fallback(field: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self::FallbackField {
            field: field.into(),
            fallback: fallback.into(),
        }
    }

    /// Flatten the answer map held in `field`
    pub fn flatten_answers(field: impl Into<String>) -> Self {
        Self::FlattenAnswers {
            field: field.into(),
        }
    }

    /// Split `field` on `delimiter`
    pub fn split_list(field: impl Into<String>, delimiter: impl Into<String>) -> Self {
        Self::SplitList {
            field: field.into(),
            delimiter: delimiter.into(),
        }
    }

    /// Wrap a plain function
    pub fn custom(name: &'static str, apply: HookFn) -> Self {
        Self::Custom { name, apply }
    }

    /// Short name for logs
    pub fn name(&self) -> &str {
        match self {
            Self::FallbackField { .. } => "fallback_field",
            Self::FlattenAnswers { .. } => "flatten_answers",
            Self::SplitList { .. } => "split_list",
            Self::Custom { name, .. } => name,
        }
    }

    /// Apply this hook to a record
    pub fn apply(&self, mut record: JsonObject) -> Result<JsonObject> {
        match self {
            Self::FallbackField { field, fallback } => {
                if is_blank(record.get(field)) {
                    let value = record.get(fallback).cloned().unwrap_or(JsonValue::Null);
                    record.insert(field.clone(), value);
                }
                Ok(record)
            }
            Self::FlattenAnswers { field } => {
                let answers = flatten_answers(field, record.get(field))?;
                record.insert(field.clone(), JsonValue::Array(answers));
                Ok(record)
            }
            Self::SplitList { field, delimiter } => {
                let items = split_list(field, record.get(field), delimiter)?;
                record.insert(field.clone(), items);
                Ok(record)
            }
            Self::Custom { apply, .. } => apply(record),
        }
    }
}

/// Apply hooks in declared order
pub fn apply_all(record: JsonObject, hooks: &[PostProcess]) -> Result<JsonObject> {
    hooks.iter().try_fold(record, |record, hook| hook.apply(record))
}

fn flatten_answers(field: &str, value: Option<&JsonValue>) -> Result<Vec<JsonValue>> {
    let entries = match value {
        None | Some(JsonValue::Null) => return Ok(Vec::new()),
        // An empty answer map arrives as `[]`
        Some(JsonValue::Array(items)) if items.is_empty() => return Ok(Vec::new()),
        Some(JsonValue::Object(entries)) => entries,
        Some(other) => {
            return Err(Error::coercion(
                field,
                other,
                "expected an object keyed by question id",
            ))
        }
    };

    let mut flattened = Vec::with_capacity(entries.len());
    for (qid, entry) in entries {
        let JsonValue::Object(entry) = entry else {
            return Err(Error::coercion(
                format!("{field}.{qid}"),
                entry,
                "expected an answer object",
            ));
        };

        let mut item = JsonObject::new();
        item.insert("qid".to_string(), JsonValue::String(qid.clone()));
        for (key, value) in entry {
            item.insert(key.clone(), value.clone());
        }

        let answer = match entry.get("answer") {
            None | Some(JsonValue::Null) => JsonValue::Null,
            Some(answer) => JsonValue::String(python_json::dumps(answer)?),
        };
        item.insert("answer".to_string(), answer);

        flattened.push(JsonValue::Object(item));
    }

    Ok(flattened)
}

fn split_list(field: &str, value: Option<&JsonValue>, delimiter: &str) -> Result<JsonValue> {
    match value {
        None | Some(JsonValue::Null) => Ok(JsonValue::Array(Vec::new())),
        Some(JsonValue::String(s)) if s.is_empty() => Ok(JsonValue::Array(Vec::new())),
        Some(JsonValue::String(s)) => Ok(JsonValue::Array(
            s.split(delimiter)
                .map(|part| JsonValue::String(part.to_string()))
                .collect(),
        )),
        Some(JsonValue::Array(items)) => Ok(JsonValue::Array(items.clone())),
        Some(other) => Err(Error::coercion(field, other, "expected a delimited string")),
    }
}
