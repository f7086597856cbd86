//! Parent/child context propagation
//!
//! Every record a parent accepts becomes one invocation of each child plan,
//! with the child's request context derived through its parent link.

use super::env::SyncEnv;
use super::executor::{RecordHook, StreamExecutor};
use super::types::StreamOutcome;
use crate::error::{Error, Result};
use crate::stream::{Capabilities, RequestContext, Selection, StreamDefinition, StreamRegistry};
use crate::types::JsonObject;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// One stream and the dependents that run under it
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    /// Stream to execute
    pub definition: Arc<StreamDefinition>,
    /// Whether its records are emitted
    pub emit: bool,
    /// How the stream executes, given the children that run under it
    pub capabilities: Capabilities,
    /// Plans invoked once per accepted record
    pub children: Vec<Arc<ExecutionPlan>>,
}

impl ExecutionPlan {
    /// Plan trees for every root stream the selection runs
    pub fn build(registry: &StreamRegistry, selection: &Selection) -> Vec<Arc<ExecutionPlan>> {
        registry
            .roots()
            .filter(|def| selection.runs(&def.name))
            .map(|def| Self::node(registry, selection, def))
            .collect()
    }

    fn node(
        registry: &StreamRegistry,
        selection: &Selection,
        definition: &StreamDefinition,
    ) -> Arc<ExecutionPlan> {
        let children: Vec<_> = registry
            .children(&definition.name)
            .filter(|child| selection.runs(&child.name))
            .map(|child| Self::node(registry, selection, child))
            .collect();

        Arc::new(ExecutionPlan {
            definition: Arc::new(definition.clone()),
            emit: selection.emits(&definition.name),
            capabilities: definition.capabilities(!children.is_empty()),
            children,
        })
    }

    /// Stream name
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Names in this tree, parents first
    pub fn stream_names(&self) -> Vec<&str> {
        let mut names = vec![self.name()];
        for child in &self.children {
            names.extend(child.stream_names());
        }
        names
    }
}

/// Run one plan for one context, children included
///
/// The outcome is merged into the environment once every child invocation
/// spawned underneath has been joined. A panicking invocation is recorded as
/// failed for its own stream.
pub fn run_plan(
    plan: Arc<ExecutionPlan>,
    context: RequestContext,
    env: SyncEnv,
) -> BoxFuture<'static, ()> {
    async move {
        let mut fan_out = ChildFanOut::new(&plan, env.clone());
        let mut executor = StreamExecutor::new(Arc::clone(&plan.definition), env.clone(), context)
            .emitting(plan.emit)
            .with_capabilities(plan.capabilities);

        let outcome = match AssertUnwindSafe(executor.run(&mut fan_out))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!(stream = %plan.name(), reason = %reason, "Stream invocation panicked");
                StreamOutcome::failed(&Error::Other(format!("invocation panicked: {reason}")))
            }
        };
        fan_out.finish().await;
        env.record_outcome(plan.name(), outcome);
    }
    .boxed()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Invokes child plans for each parent record
pub struct ChildFanOut {
    parent: String,
    children: Vec<Arc<ExecutionPlan>>,
    env: SyncEnv,
    in_flight: JoinSet<()>,
}

impl ChildFanOut {
    /// Fan-out for the children of `plan`
    pub fn new(plan: &ExecutionPlan, env: SyncEnv) -> Self {
        Self {
            parent: plan.name().to_string(),
            children: plan.children.clone(),
            env,
            in_flight: JoinSet::new(),
        }
    }

    /// Wait for every pipelined child invocation
    pub async fn finish(&mut self) {
        while let Some(joined) = self.in_flight.join_next().await {
            if let Err(e) = joined {
                error!(parent = %self.parent, error = %e, "Child invocation panicked");
            }
        }
    }

    async fn dispatch(&mut self, invocation: BoxFuture<'static, ()>) {
        let limit = self.env.config.child_concurrency;
        if limit <= 1 {
            invocation.await;
            return;
        }

        while self.in_flight.len() >= limit {
            if let Some(Err(e)) = self.in_flight.join_next().await {
                error!(parent = %self.parent, error = %e, "Child invocation panicked");
            }
        }
        self.in_flight.spawn(invocation);
    }
}

#[async_trait]
impl RecordHook for ChildFanOut {
    async fn on_record(&mut self, record: &JsonObject) -> Result<()> {
        let children = self.children.clone();
        for child in children {
            if self.env.is_cancelled() {
                debug!(parent = %self.parent, "Run cancelled, not starting children");
                break;
            }
            let Some(link) = &child.definition.parent else {
                continue;
            };

            let context = match link.context_for(child.name(), record) {
                Ok(context) => context,
                Err(e) => {
                    warn!(
                        stream = %child.name(),
                        parent = %self.parent,
                        error = %e,
                        "Skipping child invocation"
                    );
                    self.env
                        .record_outcome(child.name(), StreamOutcome::failed(&e));
                    continue;
                }
            };

            let invocation = run_plan(Arc::clone(&child), context, self.env.clone());
            self.dispatch(invocation).await;
        }
        Ok(())
    }
}
