//! Pagination types and traits
//!
//! Defines the core pagination abstractions used by all strategies.

use crate::error::Result;
use serde_json::Value;

/// Offset of the next page to request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageToken(pub u64);

impl PageToken {
    /// Offset value carried by the token
    pub fn offset(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PageToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a stream pages through its resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaginationConfig {
    /// One request per invocation
    #[default]
    None,

    /// `limit`/`offset` paging driven by `resultSet.count`
    Offset {
        /// Records requested per page
        page_size: u64,
    },
}

impl PaginationConfig {
    /// Offset paging with the given page size
    pub fn offset(page_size: u64) -> Self {
        Self::Offset { page_size }
    }

    /// Whether more than one page may be requested
    pub fn is_paginated(&self) -> bool {
        matches!(self, Self::Offset { .. })
    }

    /// Page size, when paginated
    pub fn page_size(&self) -> Option<u64> {
        match self {
            Self::None => None,
            Self::Offset { page_size } => Some(*page_size),
        }
    }

    /// Build the paginator for this configuration
    pub fn paginator(&self) -> Box<dyn Paginator> {
        match self {
            Self::None => Box::new(super::NoPaginator),
            Self::Offset { page_size } => Box::new(super::ResultSetPaginator::new(*page_size)),
        }
    }
}

/// Trait for pagination strategies
///
/// A paginator is stateless; the executor threads the previous token through
/// each call.
pub trait Paginator: Send + Sync {
    /// Query parameters for the request identified by `token`
    fn request_params(&self, token: Option<PageToken>) -> Vec<(String, String)>;

    /// Decide the next page from the previous response
    ///
    /// Returns `Ok(None)` when the resource is exhausted.
    fn next_token(&self, body: &Value, previous: Option<PageToken>) -> Result<Option<PageToken>>;
}

/// Look up a dotted path such as `resultSet.count`
pub(crate) fn lookup_path<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(body, |value, segment| value.get(segment))
}
