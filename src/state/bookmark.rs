//! Bookmark store and replication value ordering

use super::types::State;
use crate::error::Result;
use crate::stream::RequestContext;
use crate::types::JsonValue;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::cmp::Ordering;

/// Timestamp layout used by the Jotform API
pub const API_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Persistent home of replication bookmarks
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Stored bookmark of a stream or one of its partitions
    async fn get_bookmark(
        &self,
        stream: &str,
        partition: Option<&RequestContext>,
    ) -> Option<JsonValue>;

    /// Advance a bookmark; returns whether the stored value changed
    ///
    /// A value that does not sort after the stored one is ignored.
    async fn set_bookmark(
        &self,
        stream: &str,
        partition: Option<&RequestContext>,
        replication_key: &str,
        value: JsonValue,
    ) -> Result<bool>;

    /// Copy of the whole state
    async fn snapshot(&self) -> State;
}

/// Parse a replication value as a UTC timestamp
///
/// Accepts RFC 3339, the API's `YYYY-MM-DD HH:MM:SS` and bare dates.
pub fn parse_timestamp(value: &JsonValue) -> Option<DateTime<Utc>> {
    let text = value.as_str()?.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, API_DATETIME_FORMAT) {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Order two replication values
///
/// Timestamps compare chronologically and numbers numerically; anything else
/// falls back to comparing the JSON text.
pub fn compare_values(a: &JsonValue, b: &JsonValue) -> Ordering {
    if let (Some(x), Some(y)) = (parse_timestamp(a), parse_timestamp(b)) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    match (a, b) {
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Whether `candidate` should replace `current`
pub fn advances(current: Option<&JsonValue>, candidate: &JsonValue) -> bool {
    if candidate.is_null() {
        return false;
    }
    match current {
        None | Some(JsonValue::Null) => true,
        Some(current) => compare_values(candidate, current) == Ordering::Greater,
    }
}

/// Running maximum of the replication values seen by one invocation
#[derive(Debug, Clone, Default)]
pub struct BookmarkTracker {
    high_water: Option<JsonValue>,
}

impl BookmarkTracker {
    /// Start from a previously stored value
    pub fn starting_at(value: Option<JsonValue>) -> Self {
        Self { high_water: value }
    }

    /// Offer a value; returns whether it raised the high-water mark
    pub fn observe(&mut self, value: Option<&JsonValue>) -> bool {
        match value {
            Some(value) if advances(self.high_water.as_ref(), value) => {
                self.high_water = Some(value.clone());
                true
            }
            _ => false,
        }
    }

    /// Current high-water value
    pub fn value(&self) -> Option<&JsonValue> {
        self.high_water.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!("2024-01-02 00:00:00"), json!("2024-01-01 23:59:59"), Ordering::Greater ; "api format")]
    #[test_case(json!("2024-01-01T00:00:00Z"), json!("2024-01-01 00:00:00"), Ordering::Equal ; "mixed formats")]
    #[test_case(json!("2024-01-01T02:00:00+02:00"), json!("2024-01-01 00:30:00"), Ordering::Less ; "offsets")]
    #[test_case(json!("2024-03-01"), json!("2024-02-29 12:00:00"), Ordering::Greater ; "bare date")]
    #[test_case(json!(10), json!(9), Ordering::Greater ; "numbers")]
    #[test_case(json!("b"), json!("a"), Ordering::Greater ; "text fallback")]
    fn test_compare_values(a: JsonValue, b: JsonValue, expected: Ordering) {
        assert_eq!(compare_values(&a, &b), expected);
    }

    #[test]
    fn test_advances() {
        assert!(advances(None, &json!("2024-01-01")));
        assert!(advances(Some(&json!(null)), &json!("2024-01-01")));
        assert!(!advances(None, &json!(null)));
        assert!(!advances(Some(&json!("2024-01-02")), &json!("2024-01-01")));
        assert!(!advances(Some(&json!("2024-01-02")), &json!("2024-01-02")));
    }

    #[test]
    fn test_tracker_keeps_maximum() {
        let mut tracker = BookmarkTracker::starting_at(Some(json!("2024-01-05 00:00:00")));
        assert!(!tracker.observe(Some(&json!("2024-01-01 00:00:00"))));
        assert!(tracker.observe(Some(&json!("2024-01-09 00:00:00"))));
        assert!(!tracker.observe(Some(&json!("2024-01-07 00:00:00"))));
        assert!(!tracker.observe(None));
        assert_eq!(tracker.value(), Some(&json!("2024-01-09 00:00:00")));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp(&json!("yesterday")).is_none());
        assert!(parse_timestamp(&json!(12)).is_none());
    }
}
