//! Engine types
//!
//! Configuration, executor phases and outcome bookkeeping for a sync run.

use crate::error::{Error, Result};
use crate::state::State;
use std::collections::BTreeMap;
use std::time::Duration;

/// Configuration for sync operation
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Whether to persist bookmarks after each page
    pub state_per_page: bool,
    /// Maximum records per invocation (0 = unlimited)
    pub max_records: usize,
    /// Root streams running at once
    pub max_parallel_streams: usize,
    /// Child invocations in flight per parent invocation
    pub child_concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            state_per_page: false,
            max_records: 0,
            max_parallel_streams: 1,
            child_concurrency: 1,
        }
    }
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist bookmarks after each page
    #[must_use]
    pub fn with_state_per_page(mut self, enabled: bool) -> Self {
        self.state_per_page = enabled;
        self
    }

    /// Set max records
    #[must_use]
    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = max;
        self
    }

    /// Set root stream parallelism
    #[must_use]
    pub fn with_max_parallel_streams(mut self, limit: usize) -> Self {
        self.max_parallel_streams = limit.max(1);
        self
    }

    /// Set child fan-out parallelism
    #[must_use]
    pub fn with_child_concurrency(mut self, limit: usize) -> Self {
        self.child_concurrency = limit.max(1);
        self
    }
}

/// Where a stream executor is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorPhase {
    /// Constructed, nothing requested yet
    #[default]
    Init,
    /// A request is in flight
    Fetching,
    /// Between pages, holding a continuation token
    Paginating,
    /// Paginator exhausted, bookmark persisted
    Done,
    /// Aborted by an error
    Failed,
}

/// Result of one stream, merged over all its invocations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamStatus {
    /// Every invocation finished
    #[default]
    Succeeded,
    /// Some invocations failed, others finished
    Partial,
    /// Every invocation failed
    Failed,
    /// Stopped by run cancellation
    Cancelled,
}

impl StreamStatus {
    /// Combine the status of two invocation groups
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Cancelled, _) | (_, Self::Cancelled) => Self::Cancelled,
            (a, b) if a == b => a,
            _ => Self::Partial,
        }
    }
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Succeeded => "succeeded",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Statistics for one stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Merged status
    pub status: StreamStatus,
    /// Executor invocations (one per parent record for children)
    pub invocations: usize,
    /// Invocations that ended in an error
    pub failed_invocations: usize,
    /// Records accepted (emitted when the stream is selected)
    pub records: usize,
    /// Records skipped for a missing primary key
    pub skipped: usize,
    /// Pages fetched
    pub pages: usize,
    /// Error messages of failed invocations
    pub errors: Vec<String>,
}

impl StreamOutcome {
    /// Outcome of a single invocation
    pub fn invocation(status: StreamStatus) -> Self {
        Self {
            status,
            invocations: 1,
            failed_invocations: usize::from(status == StreamStatus::Failed),
            ..Default::default()
        }
    }

    /// Outcome of an invocation that failed before fetching anything
    pub fn failed(error: &Error) -> Self {
        let mut outcome = Self::invocation(StreamStatus::Failed);
        outcome.errors.push(error.to_string());
        outcome
    }

    /// Fold another invocation into this one
    pub fn merge(&mut self, other: StreamOutcome) {
        self.status = if self.invocations == 0 {
            other.status
        } else {
            self.status.merge(other.status)
        };
        self.invocations += other.invocations;
        self.failed_invocations += other.failed_invocations;
        self.records += other.records;
        self.skipped += other.skipped;
        self.pages += other.pages;
        self.errors.extend(other.errors);
    }
}

/// Everything a run produced besides the records themselves
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Per-stream outcomes
    pub outcomes: BTreeMap<String, StreamOutcome>,
    /// Final bookmarks
    pub state: State,
    /// Wall time
    pub duration: Duration,
    /// Why the whole run stopped early, if it did
    pub aborted: Option<String>,
}

impl RunSummary {
    /// Outcome of one stream
    pub fn outcome(&self, stream: &str) -> Option<&StreamOutcome> {
        self.outcomes.get(stream)
    }

    /// Total records accepted
    pub fn total_records(&self) -> usize {
        self.outcomes.values().map(|o| o.records).sum()
    }

    /// Whether any stream did not fully succeed
    pub fn has_failures(&self) -> bool {
        self.aborted.is_some() || !self.unsuccessful().is_empty()
    }

    /// Streams that did not fully succeed
    pub fn unsuccessful(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.status != StreamStatus::Succeeded)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Turn an aborted or incomplete run into an error
    pub fn into_result(self) -> Result<Self> {
        if let Some(reason) = &self.aborted {
            return Err(Error::auth(reason.clone()));
        }
        let unsuccessful = self.unsuccessful();
        if !unsuccessful.is_empty() {
            return Err(Error::Other(format!(
                "Streams did not complete: {}",
                unsuccessful.join(", ")
            )));
        }
        Ok(self)
    }
}
