// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # tap-jotform
//!
//! Incremental, resumable extraction of Jotform forms, questions, submissions,
//! reports and account history, emitted as Singer JSON lines.
//!
//! ## Features
//!
//! - **Offset Pagination**: `resultSet.count` driven paging with a shared rate budget
//! - **Incremental Sync**: Bookmarks that only advance, per stream or per parent context
//! - **Normalization**: Integer coercion and per-stream post-processing hooks
//! - **Child Streams**: Parent records fan out into dependent stream invocations
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tap_jotform::engine::{Orchestrator, SyncEnv};
//! use tap_jotform::output::JsonLinesSink;
//! use tap_jotform::state::StateManager;
//! use tap_jotform::{cli, config::TapConfig, stream};
//!
//! #[tokio::main]
//! async fn main() -> tap_jotform::Result<()> {
//!     let config = TapConfig::from_json(r#"{"api_key": "..."}"#)?;
//!     let env = SyncEnv::new(
//!         cli::build_transport(&config)?,
//!         Arc::new(JsonLinesSink::stdout()),
//!         Arc::new(StateManager::in_memory()),
//!     )
//!     .with_headers(config.request_headers());
//!
//!     let summary = Orchestrator::new(stream::jotform_catalog()?, env)
//!         .run(None)
//!         .await?;
//!     println!("{} records", summary.total_records());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Orchestrator                            │
//! │   registry order · root JoinSet · schemas · run summary         │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┴──────────────────────────────────┐
//! │        StreamExecutor  ──records──▶  ChildFanOut (children)     │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │   HTTP   │ Paginate  │    Decode     │ Normalize │   Output    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Retry    │ resultSet │ content array │ Integers  │ SCHEMA      │
//! │ Throttle │ offset    │ keyed object  │ Hooks     │ RECORD      │
//! │ Cache    │           │               │           │ STATE       │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the tap
pub mod error;

/// Common types and type aliases
pub mod types;

/// Tap configuration
pub mod config;

/// HTTP transport with retry, throttling and caching
pub mod http;

/// Pagination strategies
pub mod pagination;

/// Record extraction from response bodies
pub mod decode;

/// Field coercion and post-processing hooks
pub mod normalize;

/// Path template rendering
pub mod template;

/// Stream definitions, registry and the Jotform catalog
pub mod stream;

/// Bookmarks and state persistence
pub mod state;

/// Singer messages and sinks
pub mod output;

/// Main execution engine
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, ErrorKind, Result};
pub use types::*;

// Re-export commonly used types
pub use engine::{Orchestrator, RunSummary, SyncConfig, SyncEnv};
pub use stream::{jotform_catalog, StreamDefinition, StreamRegistry};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
