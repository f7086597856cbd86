//! Pagination strategy implementations

use super::types::{lookup_path, PageToken, Paginator};
use crate::error::{Error, Result};
use serde_json::Value;

// ============================================================================
// Result-set Pagination
// ============================================================================

/// Offset pagination that trusts the server-reported page count
///
/// A full page (`resultSet.count == page_size`) means there may be more; the
/// next offset is the previous one plus the page size. When the last page is
/// exactly full this costs one extra request that comes back empty.
#[derive(Debug, Clone)]
pub struct ResultSetPaginator {
    /// Records requested per page
    pub page_size: u64,
    /// Dotted path of the count field
    pub count_path: String,
    /// Query parameter carrying the page size
    pub limit_param: String,
    /// Query parameter carrying the offset
    pub offset_param: String,
}

impl ResultSetPaginator {
    /// Create a paginator with Jotform's parameter names
    pub fn new(page_size: u64) -> Self {
        Self {
            page_size,
            count_path: "resultSet.count".to_string(),
            limit_param: "limit".to_string(),
            offset_param: "offset".to_string(),
        }
    }

    fn page_count(&self, body: &Value) -> Result<u64> {
        let value = lookup_path(body, &self.count_path)
            .ok_or_else(|| Error::parse(format!("response has no '{}'", self.count_path)))?;

        let count = match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };

        count.ok_or_else(|| {
            Error::parse(format!(
                "'{}' is not a non-negative integer: {value}",
                self.count_path
            ))
        })
    }
}

impl Paginator for ResultSetPaginator {
    fn request_params(&self, token: Option<PageToken>) -> Vec<(String, String)> {
        let mut params = vec![(self.limit_param.clone(), self.page_size.to_string())];
        // The first page carries no offset
        if let Some(token) = token.filter(|t| t.offset() > 0) {
            params.push((self.offset_param.clone(), token.to_string()));
        }
        params
    }

    fn next_token(&self, body: &Value, previous: Option<PageToken>) -> Result<Option<PageToken>> {
        let count = self.page_count(body)?;
        if count != self.page_size {
            return Ok(None);
        }

        let start = previous.map_or(0, PageToken::offset);
        Ok(Some(PageToken(start + self.page_size)))
    }
}

// ============================================================================
// No Pagination
// ============================================================================

/// Single request, no paging parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPaginator;

impl Paginator for NoPaginator {
    fn request_params(&self, _token: Option<PageToken>) -> Vec<(String, String)> {
        Vec::new()
    }

    fn next_token(&self, _body: &Value, _previous: Option<PageToken>) -> Result<Option<PageToken>> {
        Ok(None)
    }
}
