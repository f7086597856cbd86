//! State management module
//!
//! Handles bookmark tracking and checkpointing.
//! State is persisted between sync runs to enable incremental syncs.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - Singer-shaped bookmarks, per stream and per partition
//! - `BookmarkStore` - Advance-only bookmark persistence
//! - `StateManager` - File-based store with atomic writes

mod bookmark;
mod manager;
mod types;

pub use bookmark::{
    advances, compare_values, parse_timestamp, BookmarkStore, BookmarkTracker,
    API_DATETIME_FORMAT,
};
pub use manager::StateManager;
pub use types::{PartitionState, State, StreamState};
