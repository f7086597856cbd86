//! Shared collaborators of one sync run

use super::types::{StreamOutcome, SyncConfig};
use crate::http::Transport;
use crate::output::RecordSink;
use crate::state::BookmarkStore;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Everything executors share during a run
///
/// Cloning is cheap; all collaborators are reference counted.
#[derive(Clone)]
pub struct SyncEnv {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) sink: Arc<dyn RecordSink>,
    pub(crate) store: Arc<dyn BookmarkStore>,
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) start_date: Option<DateTime<Utc>>,
    pub(crate) config: SyncConfig,
    pub(crate) cancel: CancellationToken,
    outcomes: Arc<Mutex<BTreeMap<String, StreamOutcome>>>,
    aborted: Arc<Mutex<Option<String>>>,
}

impl SyncEnv {
    /// Create an environment from its three collaborators
    pub fn new(
        transport: Arc<dyn Transport>,
        sink: Arc<dyn RecordSink>,
        store: Arc<dyn BookmarkStore>,
    ) -> Self {
        Self {
            transport,
            sink,
            store,
            headers: BTreeMap::new(),
            start_date: None,
            config: SyncConfig::default(),
            cancel: CancellationToken::new(),
            outcomes: Arc::default(),
            aborted: Arc::default(),
        }
    }

    /// Headers sent with every request
    #[must_use]
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Floor for incremental starting values
    #[must_use]
    pub fn with_start_date(mut self, start_date: Option<DateTime<Utc>>) -> Self {
        self.start_date = start_date;
        self
    }

    /// Sync tuning
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the run when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the run has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop the whole run
    pub(crate) fn abort(&self, reason: impl Into<String>) {
        let reason = reason.into();
        error!(reason = %reason, "Aborting run");
        if let Ok(mut aborted) = self.aborted.lock() {
            aborted.get_or_insert(reason);
        }
        self.cancel.cancel();
    }

    /// Why the run was aborted, if it was
    pub fn abort_reason(&self) -> Option<String> {
        self.aborted.lock().ok().and_then(|reason| reason.clone())
    }

    /// Fold one invocation outcome into its stream's total
    pub(crate) fn record_outcome(&self, stream: &str, outcome: StreamOutcome) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.entry(stream.to_string()).or_default().merge(outcome);
        }
    }

    /// Per-stream outcomes so far
    pub fn outcomes(&self) -> BTreeMap<String, StreamOutcome> {
        self.outcomes
            .lock()
            .map(|outcomes| outcomes.clone())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for SyncEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEnv")
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("start_date", &self.start_date)
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
