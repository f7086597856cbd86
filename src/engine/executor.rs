//! Stream executor
//!
//! Runs one stream for one request context: fetch, decode, normalize, emit,
//! paginate, and finally persist the bookmark.
//!
//! ```text
//! Init -> Fetching -> (Paginating <-> Fetching) -> Done
//!              \-> Failed
//! ```

use super::env::SyncEnv;
use super::types::{ExecutorPhase, StreamOutcome, StreamStatus};
use crate::decode::RecordDecoder;
use crate::error::Result;
use crate::http::ApiRequest;
use crate::normalize::{apply_all, normalize, python_json};
use crate::output::Message;
use crate::pagination::{PageToken, Paginator};
use crate::state::{parse_timestamp, BookmarkTracker, API_DATETIME_FORMAT};
use crate::stream::{Capabilities, RequestContext, StreamDefinition};
use crate::template;
use crate::types::{scalar_to_string, JsonObject, JsonValue};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Receives every accepted record after it has been emitted
#[async_trait]
pub trait RecordHook: Send {
    /// Called once per record, in emission order
    async fn on_record(&mut self, record: &JsonObject) -> Result<()>;
}

/// Hook for streams without dependents
#[derive(Debug, Default, Clone, Copy)]
pub struct NoChildren;

#[async_trait]
impl RecordHook for NoChildren {
    async fn on_record(&mut self, _record: &JsonObject) -> Result<()> {
        Ok(())
    }
}

/// Executes one stream invocation
pub struct StreamExecutor {
    definition: Arc<StreamDefinition>,
    env: SyncEnv,
    context: RequestContext,
    emit: bool,
    capabilities: Capabilities,
    phase: ExecutorPhase,
    outcome: StreamOutcome,
    tracker: BookmarkTracker,
}

impl StreamExecutor {
    /// Create an executor that emits its records
    ///
    /// Capabilities default to those of a stream without dependents.
    pub fn new(definition: Arc<StreamDefinition>, env: SyncEnv, context: RequestContext) -> Self {
        let capabilities = definition.capabilities(false);
        Self {
            definition,
            env,
            context,
            emit: true,
            capabilities,
            phase: ExecutorPhase::Init,
            outcome: StreamOutcome::default(),
            tracker: BookmarkTracker::default(),
        }
    }

    /// Run without emitting records or touching bookmarks
    #[must_use]
    pub fn emitting(mut self, emit: bool) -> Self {
        self.emit = emit;
        self
    }

    /// Execute with the given capabilities
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> ExecutorPhase {
        self.phase
    }

    /// Highest replication value seen so far
    pub fn high_water(&self) -> Option<&JsonValue> {
        self.tracker.value()
    }

    /// Run to completion and report the outcome
    ///
    /// Errors never escape: they end the invocation as `Failed`, and errors
    /// that abort the run also cancel it.
    pub async fn run(&mut self, hook: &mut dyn RecordHook) -> StreamOutcome {
        info!(
            stream = %self.definition.name,
            context = %self.context.describe(),
            emit = self.emit,
            "Starting sync"
        );

        let status = match self.execute(hook).await {
            Ok(status) => status,
            Err(e) => {
                self.phase = ExecutorPhase::Failed;
                error!(
                    stream = %self.definition.name,
                    context = %self.context.describe(),
                    error = %e,
                    "Stream invocation failed"
                );
                if e.aborts_run() {
                    self.env.abort(e.detail());
                }
                self.outcome.errors.push(e.to_string());
                StreamStatus::Failed
            }
        };

        let mut outcome = std::mem::take(&mut self.outcome);
        outcome.status = status;
        outcome.invocations = 1;
        outcome.failed_invocations = usize::from(status == StreamStatus::Failed);

        info!(
            stream = %self.definition.name,
            context = %self.context.describe(),
            status = %status,
            records = outcome.records,
            pages = outcome.pages,
            "Completed sync"
        );
        outcome
    }

    async fn execute(&mut self, hook: &mut dyn RecordHook) -> Result<StreamStatus> {
        let definition = Arc::clone(&self.definition);
        let path = template::render(&definition.path, &self.context)?;

        let stored = if self.tracks_bookmark() {
            self.env
                .store
                .get_bookmark(&definition.name, self.partition())
                .await
        } else {
            None
        };
        let filter = match (&definition.replication_key, self.tracks_bookmark()) {
            (Some(key), true) => starting_value(stored.as_ref(), self.env.start_date)
                .map(|value| incremental_filter(key, &value))
                .transpose()?,
            _ => None,
        };
        self.tracker = BookmarkTracker::starting_at(stored);

        let paginator = definition.paginator();
        let decoder = definition.decoder();
        let mut token: Option<PageToken> = None;

        loop {
            if self.env.is_cancelled() {
                info!(stream = %definition.name, "Run cancelled, stopping");
                if self.checkpoint().await? {
                    self.emit_state().await?;
                }
                return Ok(StreamStatus::Cancelled);
            }

            self.phase = ExecutorPhase::Fetching;
            let request = self.build_request(&path, paginator.as_ref(), token, filter.as_deref());
            let response = self.env.transport.get(&request).await?;
            self.outcome.pages += 1;

            if let Some(left) = response.body.get("limit-left") {
                info!(stream = %definition.name, limit_left = %left, "API limit left");
            }

            let records = decoder.decode(&response.body)?;
            debug!(
                stream = %definition.name,
                context = %self.context.describe(),
                page = self.outcome.pages,
                offset = token.map_or(0, PageToken::offset),
                records = records.len(),
                "Fetched page"
            );

            let mut limit_reached = false;
            for record in records {
                self.accept(record, hook).await?;
                if self.limit_reached() {
                    limit_reached = true;
                    break;
                }
            }

            let next = if self.capabilities.paginated {
                paginator.next_token(&response.body, token)?
            } else {
                None
            };
            if limit_reached {
                info!(
                    stream = %definition.name,
                    max_records = self.env.config.max_records,
                    "Reached max records"
                );
                break;
            }

            match next {
                Some(next) => {
                    self.phase = ExecutorPhase::Paginating;
                    token = Some(next);
                    if self.env.config.state_per_page && self.checkpoint().await? {
                        self.emit_state().await?;
                    }
                }
                None => break,
            }
        }

        self.checkpoint().await?;
        if self.emit {
            self.emit_state().await?;
        }
        self.phase = ExecutorPhase::Done;
        Ok(StreamStatus::Succeeded)
    }

    /// Shape one raw record and hand it on
    async fn accept(&mut self, mut record: JsonObject, hook: &mut dyn RecordHook) -> Result<()> {
        let definition = Arc::clone(&self.definition);

        self.context.inject_into(&mut record);
        let record = if self.capabilities.needs_coercion {
            normalize(record, &definition.integer_fields)?
        } else {
            record
        };
        let record = apply_all(record, &definition.hooks)?;

        if let Some(key) = definition.missing_primary_key(&record) {
            self.outcome.skipped += 1;
            warn!(
                stream = %definition.name,
                context = %self.context.describe(),
                field = key,
                "Skipping record without primary key"
            );
            return Ok(());
        }

        if let Some(key) = &definition.replication_key {
            self.tracker.observe(record.get(key));
        }

        if self.emit {
            self.env.sink.emit(&definition.name, record.clone())?;
        }
        self.outcome.records += 1;

        if self.capabilities.has_children {
            hook.on_record(&record).await?;
        }
        Ok(())
    }

    fn build_request(
        &self,
        path: &str,
        paginator: &dyn Paginator,
        token: Option<PageToken>,
        filter: Option<&str>,
    ) -> ApiRequest {
        let mut request = ApiRequest::new(path).headers(self.env.headers.clone());
        for (key, value) in paginator.request_params(token) {
            request = request.query(key, value);
        }
        for (key, value) in &self.definition.extra_params {
            request = request.query(key.clone(), value.clone());
        }
        if let Some(filter) = filter {
            request = request.query("filter", filter);
        }
        request
    }

    /// Persist the high-water mark; returns whether the stored bookmark moved
    async fn checkpoint(&self) -> Result<bool> {
        if !self.tracks_bookmark() {
            return Ok(false);
        }
        let (Some(key), Some(value)) = (&self.definition.replication_key, self.tracker.value())
        else {
            return Ok(false);
        };

        let advanced = self
            .env
            .store
            .set_bookmark(&self.definition.name, self.partition(), key, value.clone())
            .await?;
        if advanced {
            debug!(stream = %self.definition.name, bookmark = %value, "Bookmark advanced");
        }
        Ok(advanced)
    }

    async fn emit_state(&self) -> Result<()> {
        let state = self.env.store.snapshot().await;
        self.env.sink.write(Message::state(state))
    }

    fn limit_reached(&self) -> bool {
        let max = self.env.config.max_records;
        max > 0 && self.outcome.records >= max
    }

    fn tracks_bookmark(&self) -> bool {
        self.emit && self.definition.replication_key.is_some()
    }

    fn partition(&self) -> Option<&RequestContext> {
        (!self.context.is_empty()).then_some(&self.context)
    }
}

impl std::fmt::Debug for StreamExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamExecutor")
            .field("stream", &self.definition.name)
            .field("context", &self.context)
            .field("emit", &self.emit)
            .field("capabilities", &self.capabilities)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

/// Lower bound for an incremental request
///
/// The later of the stored bookmark and `start_date`, in the API's datetime
/// layout. A stored value that is not a timestamp is sent as is.
pub fn starting_value(
    stored: Option<&JsonValue>,
    start_date: Option<DateTime<Utc>>,
) -> Option<String> {
    let format = |ts: DateTime<Utc>| ts.format(API_DATETIME_FORMAT).to_string();

    match stored.filter(|value| !value.is_null()) {
        Some(value) => match parse_timestamp(value) {
            Some(ts) => Some(format(start_date.map_or(ts, |floor| floor.max(ts)))),
            None => scalar_to_string(value),
        },
        None => start_date.map(format),
    }
}

/// `filter` query value selecting records after `value`
pub fn incremental_filter(replication_key: &str, value: &str) -> Result<String> {
    let mut filter = JsonObject::new();
    filter.insert(
        format!("{replication_key}:gt"),
        JsonValue::String(value.to_string()),
    );
    python_json::dumps(&JsonValue::Object(filter))
}
