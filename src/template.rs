//! Resource path templates
//!
//! Handles `{placeholder}` interpolation in stream paths such as
//! `/form/{form_id}/questions`. Values come from the [`RequestContext`] a
//! parent record produced.

use crate::error::{Error, Result};
use crate::stream::RequestContext;
use crate::types::scalar_to_string;
use regex::Regex;
use std::sync::LazyLock;

/// Regex for matching path placeholders: {name}
static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Render a path template against a request context
///
/// Every placeholder must resolve to a non-null scalar; all unresolved names
/// are reported together.
pub fn render(template: &str, ctx: &RequestContext) -> Result<String> {
    let mut result = String::with_capacity(template.len());
    let mut missing = Vec::new();
    let mut last = 0;

    for cap in PLACEHOLDER_REGEX.captures_iter(template) {
        let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        result.push_str(&template[last..whole.start()]);

        match ctx.get(name.as_str()).and_then(scalar_to_string) {
            Some(value) => result.push_str(&value),
            None => missing.push(name.as_str().to_string()),
        }
        last = whole.end();
    }
    result.push_str(&template[last..]);

    if missing.is_empty() {
        Ok(result)
    } else {
        Err(Error::undefined_var(missing.join(", ")))
    }
}

/// All placeholder names of a template, in order of appearance
pub fn extract_placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER_REGEX
        .captures_iter(template)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
