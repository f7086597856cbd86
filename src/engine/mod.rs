//! Execution engine module
//!
//! Drives streams from request to emitted record.
//!
//! # Overview
//!
//! The engine module provides:
//! - `StreamExecutor` - Fetch/paginate/emit state machine for one invocation
//! - `ChildFanOut` and `ExecutionPlan` - Parent to child context propagation
//! - `Orchestrator` - Runs every selected root with bounded parallelism
//! - `SyncEnv` and `SyncConfig` - Shared collaborators and tuning
//! - `StreamOutcome` and `RunSummary` - What a run did

mod env;
mod executor;
mod orchestrator;
mod propagator;
mod types;

pub use env::SyncEnv;
pub use executor::{
    incremental_filter, starting_value, NoChildren, RecordHook, StreamExecutor,
};
pub use orchestrator::Orchestrator;
pub use propagator::{run_plan, ChildFanOut, ExecutionPlan};
pub use types::{ExecutorPhase, RunSummary, StreamOutcome, StreamStatus, SyncConfig};
