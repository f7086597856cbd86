//! Transport abstraction
//!
//! The engine only ever talks to a [`Transport`]. The real implementation is
//! [`HttpClient`](super::HttpClient); decorators such as
//! [`CachedTransport`](super::CachedTransport) wrap any other transport.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A fully resolved GET request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiRequest {
    /// Absolute URL or path relative to the transport's base URL
    pub url: String,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// Query parameters, in the order they are sent
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    /// Create a request for a URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Replace all headers
    #[must_use]
    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Look up a query parameter
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Stable identity of this request: URL plus sorted query parameters
    ///
    /// Headers are excluded, so two requests differing only in credentials
    /// share a signature.
    pub fn signature(&self) -> String {
        let mut params: Vec<_> = self.query.iter().collect();
        params.sort();
        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("GET {}?{query}", self.url)
    }
}

/// A decoded API response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Parsed JSON body
    pub body: Value,
}

impl ApiResponse {
    /// Create a response
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

/// Issues GET requests and returns decoded JSON bodies
///
/// Implementations own retries and throttling; a returned error is final for
/// the request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a GET request
    async fn get(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn get(&self, request: &ApiRequest) -> Result<ApiResponse> {
        (**self).get(request).await
    }
}
