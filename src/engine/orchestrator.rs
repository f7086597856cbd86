//! Run orchestration
//!
//! Resolves the selection, announces schemas, and runs root plans on a
//! bounded `JoinSet`.

use super::env::SyncEnv;
use super::propagator::{run_plan, ExecutionPlan};
use super::types::{RunSummary, StreamOutcome, StreamStatus};
use crate::error::Result;
use crate::output::Message;
use crate::stream::{RequestContext, Selection, StreamRegistry};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Drives a whole sync run
#[derive(Debug)]
pub struct Orchestrator {
    registry: StreamRegistry,
    env: SyncEnv,
}

impl Orchestrator {
    /// Create an orchestrator
    pub fn new(registry: StreamRegistry, env: SyncEnv) -> Self {
        Self { registry, env }
    }

    /// Stream registry
    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    /// Run environment
    pub fn env(&self) -> &SyncEnv {
        &self.env
    }

    /// SCHEMA messages of every registered stream
    pub fn discover(&self) -> Vec<Message> {
        self.registry.ordered().iter().map(Message::schema).collect()
    }

    /// Plan trees for a selection
    pub fn plan(&self, selection: &Selection) -> Vec<Arc<ExecutionPlan>> {
        ExecutionPlan::build(&self.registry, selection)
    }

    /// Sync the selected streams (`None` = all)
    pub async fn run(&self, selected: Option<&[String]>) -> Result<RunSummary> {
        let start = Instant::now();
        let selection = self.registry.select(selected)?;

        for definition in self.registry.ordered() {
            if selection.emits(&definition.name) {
                self.env.sink.write(Message::schema(definition))?;
            }
        }

        let plans = self.plan(&selection);
        let limit = self.env.config.max_parallel_streams.max(1);
        info!(roots = plans.len(), parallelism = limit, "Starting run");

        let mut roots = JoinSet::new();
        for plan in plans {
            if self.env.is_cancelled() {
                break;
            }
            while roots.len() >= limit {
                if let Some(Err(e)) = roots.join_next().await {
                    error!(error = %e, "Stream task panicked");
                }
            }
            roots.spawn(run_plan(plan, RequestContext::new(), self.env.clone()));
        }
        while let Some(joined) = roots.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Stream task panicked");
            }
        }

        let state = self.env.store.snapshot().await;
        self.env.sink.write(Message::state(state.clone()))?;

        let cancelled = self.env.is_cancelled();
        let mut outcomes = self.env.outcomes();
        for definition in self.registry.ordered() {
            if selection.runs(&definition.name) {
                outcomes
                    .entry(definition.name.clone())
                    .or_insert_with(|| StreamOutcome {
                        status: if cancelled {
                            StreamStatus::Cancelled
                        } else {
                            StreamStatus::Succeeded
                        },
                        ..Default::default()
                    });
            }
        }

        let summary = RunSummary {
            outcomes,
            state,
            duration: start.elapsed(),
            aborted: self.env.abort_reason(),
        };
        info!(
            records = summary.total_records(),
            duration_ms = u64::try_from(summary.duration.as_millis()).unwrap_or(u64::MAX),
            cancelled,
            "Run finished"
        );
        Ok(summary)
    }
}
