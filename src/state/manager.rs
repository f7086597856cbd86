//! State manager implementation
//!
//! Provides file-based state persistence with atomic writes.

use super::bookmark::{advances, BookmarkStore};
use super::types::State;
use crate::error::{Error, Result};
use crate::stream::RequestContext;
use crate::types::JsonValue;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// State manager for persisting and loading state
#[derive(Debug)]
pub struct StateManager {
    /// Path to the state file
    path: PathBuf,
    /// Current state (cached)
    state: Arc<RwLock<State>>,
    /// Serializes writes to the state file
    save_lock: Arc<Mutex<()>>,
    /// Whether to auto-save on every update
    auto_save: bool,
}

impl StateManager {
    fn build(path: PathBuf, state: State, auto_save: bool) -> Self {
        Self {
            path,
            state: Arc::new(RwLock::new(state)),
            save_lock: Arc::new(Mutex::new(())),
            auto_save,
        }
    }

    /// Create an in-memory state manager (no file persistence)
    pub fn in_memory() -> Self {
        Self::build(PathBuf::new(), State::new(), false)
    }

    /// Create a state manager from inline JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::build(PathBuf::new(), parse_state(json)?, false))
    }

    /// Persist to `path` on every update from now on
    #[must_use]
    pub fn with_output(mut self, path: impl AsRef<Path>) -> Self {
        self.path = path.as_ref().to_path_buf();
        self.auto_save = true;
        self
    }

    /// Save current state to file
    pub async fn save(&self) -> Result<()> {
        if self.is_in_memory() {
            return Ok(());
        }

        let _guard = self.save_lock.lock().await;
        let contents = self.to_json_pretty().await?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::state(format!("Failed to write state file: {e}")))?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::state(format!("Failed to rename state file: {e}")))?;

        debug!(path = %self.path.display(), "State saved");
        Ok(())
    }

    /// Export state as pretty-printed JSON string
    pub async fn to_json_pretty(&self) -> Result<String> {
        let state = self.state.read().await;
        serde_json::to_string_pretty(&*state)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))
    }

    /// Check if using in-memory mode
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

#[async_trait]
impl BookmarkStore for StateManager {
    async fn get_bookmark(
        &self,
        stream: &str,
        partition: Option<&RequestContext>,
    ) -> Option<JsonValue> {
        let state = self.state.read().await;
        state.bookmark(stream, partition).cloned()
    }

    async fn set_bookmark(
        &self,
        stream: &str,
        partition: Option<&RequestContext>,
        replication_key: &str,
        value: JsonValue,
    ) -> Result<bool> {
        {
            let mut state = self.state.write().await;
            if !advances(state.bookmark(stream, partition), &value) {
                return Ok(false);
            }
            state.put_bookmark(stream, partition, replication_key, value);
        }

        if self.auto_save {
            self.save().await?;
        }

        Ok(true)
    }

    async fn snapshot(&self) -> State {
        self.state.read().await.clone()
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            state: Arc::clone(&self.state),
            save_lock: Arc::clone(&self.save_lock),
            auto_save: self.auto_save,
        }
    }
}

fn parse_state(contents: &str) -> Result<State> {
    if contents.trim().is_empty() {
        return Ok(State::new());
    }
    serde_json::from_str(contents).map_err(|e| Error::state(format!("Failed to parse state: {e}")))
}
