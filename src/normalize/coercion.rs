//! Integer field coercion

use crate::error::{Error, Result};
use crate::types::{is_blank, JsonObject, JsonValue};

/// Coerce the declared integer fields of a raw record
///
/// Numeric strings are trimmed and parsed, JSON integers are kept, and an
/// absent, null or empty value becomes `null`. Every declared field is present
/// in the output.
pub fn normalize(mut record: JsonObject, integer_fields: &[String]) -> Result<JsonObject> {
    for field in integer_fields {
        let coerced = coerce_integer(field, record.get(field))?;
        record.insert(field.clone(), coerced);
    }
    Ok(record)
}

/// Coerce a single value to a JSON integer or `null`
pub fn coerce_integer(field: &str, value: Option<&JsonValue>) -> Result<JsonValue> {
    if is_blank(value) {
        return Ok(JsonValue::Null);
    }

    match value {
        Some(JsonValue::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(JsonValue::Null);
            }
            trimmed
                .parse::<i64>()
                .map(JsonValue::from)
                .map_err(|e| Error::coercion(field, format!("{s:?}"), e.to_string()))
        }
        Some(JsonValue::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(JsonValue::from(i));
            }
            if let Some(u) = n.as_u64() {
                return Ok(JsonValue::from(u));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                    Ok(JsonValue::from(f as i64))
                }
                _ => Err(Error::coercion(field, n.to_string(), "not an integer")),
            }
        }
        Some(other) => Err(Error::coercion(
            field,
            other.to_string(),
            "expected an integer or numeric string",
        )),
        None => Ok(JsonValue::Null),
    }
}
