//! Tests for the HTTP transport module

use super::*;
use crate::error::{Error, ErrorKind};
use crate::types::BackoffType;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config(uri: String) -> HttpClientConfig {
    HttpClientConfig::builder()
        .base_url(uri)
        .max_retries(2)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(5),
            Duration::from_millis(10),
        )
        .build()
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(300));
    assert_eq!(config.max_retries, 5);
    assert!(config.base_url.is_none());
    assert!(config.rate_limit.is_none());
    assert!(config.max_in_flight.is_none());
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://api.jotform.com")
        .timeout(Duration::from_secs(60))
        .max_retries(3)
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(200),
            Duration::from_secs(30),
        )
        .rate_limit(RateLimiterConfig::new(5, 5))
        .max_in_flight(4)
        .header("APIKEY", "secret")
        .build();

    assert_eq!(config.base_url.as_deref(), Some("https://api.jotform.com"));
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.backoff_type, BackoffType::Linear);
    assert_eq!(config.initial_backoff, Duration::from_millis(200));
    assert_eq!(config.max_in_flight, Some(4));
    assert_eq!(
        config.default_headers.get("APIKEY").map(String::as_str),
        Some("secret")
    );
}

#[test]
fn test_calculate_backoff() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Exponential,
            Duration::from_millis(100),
            Duration::from_millis(500),
        )
        .build();
    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(1), Duration::from_millis(200));
    assert_eq!(client.calculate_backoff(2), Duration::from_millis(400));
    assert_eq!(client.calculate_backoff(3), Duration::from_millis(500));
}

#[test]
fn test_request_signature_ignores_param_order_and_headers() {
    let a = ApiRequest::new("https://api.jotform.com/user/forms")
        .query("offset", "0")
        .query("limit", "100")
        .header("APIKEY", "one");
    let b = ApiRequest::new("https://api.jotform.com/user/forms")
        .query("limit", "100")
        .query("offset", "0")
        .header("APIKEY", "two");

    assert_eq!(a.signature(), b.signature());
    assert_eq!(
        a.signature(),
        "GET https://api.jotform.com/user/forms?limit=100&offset=0"
    );
    assert_eq!(a.query_value("limit"), Some("100"));
    assert_eq!(a.query_value("filter"), None);
}

// ============================================================================
// Client against a mock server
// ============================================================================

#[tokio::test]
async fn test_get_sends_headers_and_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/forms"))
        .and(header("APIKEY", "secret"))
        .and(header("User-Agent", "tap-jotform/test"))
        .and(query_param("limit", "100"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"id": "1"}],
            "resultSet": {"count": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::with_config(fast_config(server.uri())).unwrap();
    let request = ApiRequest::new("/user/forms")
        .header("APIKEY", "secret")
        .header("User-Agent", "tap-jotform/test")
        .query("limit", "100")
        .query("offset", "0");

    let response = client.get(&request).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body["content"][0]["id"], "1");
}

#[tokio::test]
async fn test_retries_server_error_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": {}})))
        .mount(&server)
        .await;

    let client = HttpClient::with_config(fast_config(server.uri())).unwrap();
    let response = client.get(&ApiRequest::new("/user")).await.unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_retries_exhausted_returns_last_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = HttpClient::with_config(fast_config(server.uri())).unwrap();
    let err = client.get(&ApiRequest::new("/user")).await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
    assert_eq!(err.kind(), ErrorKind::TransientNetwork);
}

#[tokio::test]
async fn test_unauthorized_is_auth_error_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/forms"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::with_config(fast_config(server.uri())).unwrap();
    let err = client
        .get(&ApiRequest::new("/user/forms"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert!(err.aborts_run());
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/form/9/questions"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::with_config(fast_config(server.uri())).unwrap();
    let err = client
        .get(&ApiRequest::new("/form/9/questions"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_non_json_body_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = HttpClient::with_config(fast_config(server.uri())).unwrap();
    let err = client.get(&ApiRequest::new("/user")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[tokio::test]
async fn test_rate_limited_honours_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": {}})))
        .mount(&server)
        .await;

    let client = HttpClient::with_config(fast_config(server.uri())).unwrap();
    assert!(client.get(&ApiRequest::new("/user")).await.is_ok());
}

// ============================================================================
// Cache
// ============================================================================

#[derive(Default)]
struct CountingTransport {
    calls: AtomicUsize,
}

#[async_trait]
impl Transport for CountingTransport {
    async fn get(&self, request: &ApiRequest) -> crate::Result<ApiResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if request.url.ends_with("/fail") {
            return Err(Error::http_status(500, "boom"));
        }
        Ok(ApiResponse::new(200, json!({ "call": n })))
    }
}

#[tokio::test]
async fn test_cache_serves_repeated_requests() {
    let inner = Arc::new(CountingTransport::default());
    let cache = CachedTransport::new(Arc::clone(&inner), None);
    let request = ApiRequest::new("https://api.jotform.com/user").query("a", "1");

    let first = cache.get(&request).await.unwrap();
    let second = cache.get(&request).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_cache_distinguishes_query() {
    let inner = Arc::new(CountingTransport::default());
    let cache = CachedTransport::new(Arc::clone(&inner), None);

    cache
        .get(&ApiRequest::new("/user/forms").query("offset", "0"))
        .await
        .unwrap();
    cache
        .get(&ApiRequest::new("/user/forms").query("offset", "100"))
        .await
        .unwrap();

    assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cache_entries_expire() {
    let inner = Arc::new(CountingTransport::default());
    let cache = CachedTransport::new(Arc::clone(&inner), Some(Duration::from_millis(20)));
    let request = ApiRequest::new("/user");

    cache.get(&request).await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;
    cache.get(&request).await.unwrap();

    assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cache_does_not_store_errors() {
    let inner = Arc::new(CountingTransport::default());
    let cache = CachedTransport::new(Arc::clone(&inner), None);
    let request = ApiRequest::new("/fail");

    assert!(cache.get(&request).await.is_err());
    assert!(cache.get(&request).await.is_err());
    assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_persistent_cache_survives_new_instance() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("http_cache.json");
    let request = ApiRequest::new("/user/forms").query("limit", "100");

    let first_inner = Arc::new(CountingTransport::default());
    let first = CachedTransport::persistent(Arc::clone(&first_inner), None, &path).unwrap();
    let stored = first.get(&request).await.unwrap();
    assert!(path.exists());

    let second_inner = Arc::new(CountingTransport::default());
    let second = CachedTransport::persistent(Arc::clone(&second_inner), None, &path).unwrap();
    let served = second.get(&request).await.unwrap();

    assert_eq!(served, stored);
    assert_eq!(second_inner.calls.load(Ordering::SeqCst), 0);
    assert_eq!(second.stats(), CacheStats { hits: 1, misses: 0 });
}

#[tokio::test]
async fn test_persistent_cache_drops_expired_entries_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("http_cache.json");
    let request = ApiRequest::new("/user/forms");

    let first = CachedTransport::persistent(
        Arc::new(CountingTransport::default()),
        Some(Duration::from_millis(20)),
        &path,
    )
    .unwrap();
    first.get(&request).await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;

    let inner = Arc::new(CountingTransport::default());
    let second =
        CachedTransport::persistent(Arc::clone(&inner), Some(Duration::from_millis(20)), &path)
            .unwrap();
    assert!(second.is_empty());

    second.get(&request).await.unwrap();
    assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_persistent_cache_rejects_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("http_cache.json");
    std::fs::write(&path, "{ not json").unwrap();

    let result = CachedTransport::persistent(CountingTransport::default(), None, &path);
    assert!(result.is_err());
}

#[tokio::test]
async fn test_in_memory_cache_has_no_file() {
    let cache = CachedTransport::new(CountingTransport::default(), None);
    assert!(cache.path().is_none());
    assert!(cache.save().await.is_ok());
}
