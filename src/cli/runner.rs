//! CLI runner - executes commands

use crate::cli::commands::{parse_stream_list, Cli, Commands};
use crate::config::TapConfig;
use crate::engine::{Orchestrator, RunSummary, SyncConfig, SyncEnv};
use crate::error::{Error, Result, ResultExt};
use crate::http::{CachedTransport, HttpClient, Transport};
use crate::output::{JsonLinesSink, Message, RecordSink};
use crate::state::StateManager;
use crate::stream::jotform_catalog;
use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
    cancel: CancellationToken,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops a running `read`
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Discover => self.discover(),
            Commands::Read {
                streams,
                max_records,
                state_per_page,
            } => {
                let config = SyncConfig::new()
                    .with_max_records(max_records.unwrap_or(0))
                    .with_state_per_page(*state_per_page);
                let sink: Arc<dyn RecordSink> = Arc::new(JsonLinesSink::stdout());
                self.read(parse_stream_list(streams.as_deref()), config, sink)
                    .await?
                    .into_result()
                    .map(|_| ())
            }
            Commands::Streams => self.streams(),
        }
    }

    /// Load configuration
    pub fn load_config(&self) -> Result<TapConfig> {
        // Inline config takes precedence
        if let Some(json_str) = &self.cli.config_json {
            return TapConfig::from_json(json_str);
        }
        if let Some(path) = &self.cli.config {
            return TapConfig::from_file(path);
        }
        Err(Error::config(
            "Config not specified (use --config or --config-json)",
        ))
    }

    /// Load state
    ///
    /// Input state is never written back; `--state-out` names the file that
    /// receives updates.
    pub fn load_state(&self) -> Result<StateManager> {
        let manager = if let Some(state_json) = &self.cli.state_json {
            StateManager::from_json(state_json)?
        } else if let Some(path) = &self.cli.state {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read state file {}", path.display()))?;
            StateManager::from_json(&content)?
        } else {
            StateManager::in_memory()
        };

        Ok(match &self.cli.state_out {
            Some(path) => manager.with_output(path),
            None => manager,
        })
    }

    /// Discover streams
    fn discover(&self) -> Result<()> {
        let registry = jotform_catalog()?;
        let sink = JsonLinesSink::stdout();
        for definition in registry.ordered() {
            sink.write(Message::schema(definition))?;
        }
        Ok(())
    }

    /// Sync the selected streams into `sink`
    pub async fn read(
        &self,
        selected: Option<Vec<String>>,
        sync_config: SyncConfig,
        sink: Arc<dyn RecordSink>,
    ) -> Result<RunSummary> {
        let config = self.load_config()?;
        let state = self.load_state()?;
        let transport = build_transport(&config)?;

        let sync_config = sync_config
            .with_max_parallel_streams(config.max_parallel_streams)
            .with_child_concurrency(config.child_concurrency);
        let env = SyncEnv::new(transport, sink, Arc::new(state.clone()))
            .with_headers(config.request_headers())
            .with_start_date(config.start_date)
            .with_config(sync_config)
            .with_cancellation(self.cancel.clone());

        let orchestrator = Orchestrator::new(jotform_catalog()?, env);
        let summary = orchestrator.run(selected.as_deref()).await?;

        if !state.is_in_memory() {
            state
                .save()
                .await
                .context("Failed to persist final state")?;
        }

        for (stream, outcome) in &summary.outcomes {
            info!(
                stream = %stream,
                status = %outcome.status,
                records = outcome.records,
                skipped = outcome.skipped,
                invocations = outcome.invocations,
                failed_invocations = outcome.failed_invocations,
                "Stream summary"
            );
            for error in &outcome.errors {
                warn!(stream = %stream, error = %error, "Stream error");
            }
        }

        Ok(summary)
    }

    /// List available streams
    fn streams(&self) -> Result<()> {
        let registry = jotform_catalog()?;
        let streams: Vec<Value> = registry
            .ordered()
            .iter()
            .map(|def| {
                json!({
                    "name": def.name,
                    "parent": def.parent_name(),
                    "replication_method": def.sync_mode(),
                    "key_properties": def.primary_keys,
                })
            })
            .collect();

        self.output_message(&json!({
            "type": "STREAMS",
            "streams": streams,
            "tap": crate::NAME,
        }));
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        println!("{}", serde_json::to_string(msg).unwrap_or_default());
    }
}

/// HTTP client from config, behind the response cache when enabled
pub fn build_transport(config: &TapConfig) -> Result<Arc<dyn Transport>> {
    let client = HttpClient::with_config(config.http_client_config())?;
    Ok(match (config.cache_expiry(), config.cache_file()) {
        (Some(expire_after), Some(path)) => {
            info!(
                expire_after = ?expire_after,
                path = %path.display(),
                "Response cache enabled"
            );
            Arc::new(CachedTransport::persistent(client, expire_after, path)?)
        }
        _ => Arc::new(client),
    })
}
