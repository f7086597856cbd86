//! Error types for tap-jotform
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//! [`ErrorKind`] maps every variant onto the propagation taxonomy the engine
//! acts on: retry, abort the run, abort the stream, or abort one child
//! invocation.

use thiserror::Error;

/// The main error type for tap-jotform
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("Unexpected response shape: {message}")]
    Parse { message: String },

    #[error("Cannot coerce field '{field}' value {value}: {message}")]
    Coercion {
        field: String,
        value: String,
        message: String,
    },

    #[error("Child stream '{stream}' needs parent field '{field}'")]
    ChildContext { stream: String, field: String },

    // ============================================================================
    // Stream Definition Errors
    // ============================================================================
    #[error("Stream '{stream}' not found")]
    StreamNotFound { stream: String },

    #[error("Invalid stream definition '{stream}': {message}")]
    InvalidStream { stream: String, message: String },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    #[error("Output error: {message}")]
    Output { message: String },

    // ============================================================================
    // Template Errors
    // ============================================================================
    #[error("Undefined variable in path template: {variable}")]
    UndefinedVariable { variable: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

/// How an error propagates through a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Worth retrying; fatal for the stream once retries are exhausted
    TransientNetwork,
    /// Bad credentials; aborts the whole run
    Auth,
    /// Unexpected response shape; aborts the current stream
    Parse,
    /// Upstream schema drift; aborts the current stream
    Coercion,
    /// Missing parent-derived value; aborts one child invocation
    ChildContext,
    /// Anything else
    Fatal,
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a coercion error
    pub fn coercion(
        field: impl Into<String>,
        value: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        Self::Coercion {
            field: field.into(),
            value: value.to_string(),
            message: message.into(),
        }
    }

    /// Create a child context error
    pub fn child_context(stream: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ChildContext {
            stream: stream.into(),
            field: field.into(),
        }
    }

    /// Create an invalid stream definition error
    pub fn invalid_stream(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidStream {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Classify this error for propagation decisions
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Auth { .. } => ErrorKind::Auth,
            Error::HttpStatus { status, .. } if matches!(*status, 401 | 403) => ErrorKind::Auth,
            Error::Http(_) | Error::RateLimited { .. } | Error::Timeout { .. } => {
                ErrorKind::TransientNetwork
            }
            Error::HttpStatus { status, .. } if is_retryable_status(*status) => {
                ErrorKind::TransientNetwork
            }
            Error::Parse { .. } | Error::JsonParse(_) => ErrorKind::Parse,
            Error::Coercion { .. } => ErrorKind::Coercion,
            Error::ChildContext { .. } | Error::UndefinedVariable { .. } => {
                ErrorKind::ChildContext
            }
            _ => ErrorKind::Fatal,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::TransientNetwork
    }

    /// Check if this error must abort the whole run
    pub fn aborts_run(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }

    /// Message without the variant prefix, for re-wrapping
    pub fn detail(&self) -> String {
        match self {
            Error::Auth { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(
        status,
        429 | 500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524
    )
}

/// Result type alias for tap-jotform
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("api_key");
        assert_eq!(err.to_string(), "Missing required config field: api_key");

        let err = Error::http_status(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::coercion("height", "\"abc\"", "not an integer");
        assert_eq!(
            err.to_string(),
            "Cannot coerce field 'height' value \"abc\": not an integer"
        );
    }

    #[test_case(Error::auth("bad key"), ErrorKind::Auth ; "auth")]
    #[test_case(Error::http_status(401, ""), ErrorKind::Auth ; "unauthorized status")]
    #[test_case(Error::http_status(403, ""), ErrorKind::Auth ; "forbidden status")]
    #[test_case(Error::http_status(503, ""), ErrorKind::TransientNetwork ; "unavailable")]
    #[test_case(Error::http_status(429, ""), ErrorKind::TransientNetwork ; "too many requests")]
    #[test_case(Error::Timeout { timeout_ms: 10 }, ErrorKind::TransientNetwork ; "timeout")]
    #[test_case(Error::http_status(404, ""), ErrorKind::Fatal ; "not found")]
    #[test_case(Error::parse("no content"), ErrorKind::Parse ; "parse")]
    #[test_case(Error::coercion("new", "x", "bad"), ErrorKind::Coercion ; "coercion")]
    #[test_case(Error::child_context("questions", "id"), ErrorKind::ChildContext ; "child context")]
    #[test_case(Error::undefined_var("form_id"), ErrorKind::ChildContext ; "undefined placeholder")]
    #[test_case(Error::state("disk full"), ErrorKind::Fatal ; "state")]
    fn test_error_kind(err: Error, expected: ErrorKind) {
        assert_eq!(err.kind(), expected);
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::RateLimited {
            retry_after_seconds: 60
        }
        .is_retryable());
        assert!(Error::Timeout { timeout_ms: 1000 }.is_retryable());
        assert!(Error::http_status(500, "").is_retryable());

        assert!(!Error::http_status(400, "").is_retryable());
        assert!(!Error::http_status(401, "").is_retryable());
        assert!(!Error::config("test").is_retryable());
    }

    #[test]
    fn test_aborts_run() {
        assert!(Error::auth("bad key").aborts_run());
        assert!(!Error::parse("shape").aborts_run());
        assert!(!Error::child_context("questions", "id").aborts_run());
    }

    #[test]
    fn test_auth_detail_rewraps_once() {
        let original = Error::auth("HTTP 401: bad key");
        let rewrapped = Error::auth(original.detail());
        assert_eq!(rewrapped.to_string(), "Authentication failed: HTTP 401: bad key");
        assert_eq!(Error::http_status(403, "no").detail(), "HTTP 403: no");
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
