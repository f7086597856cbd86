//! CLI module
//!
//! Command-line interface for running the tap.
//!
//! # Commands
//!
//! - `discover` - Print stream schemas
//! - `read` - Extract data from streams
//! - `streams` - List stream names (lightweight)

mod commands;
mod runner;

pub use commands::{parse_stream_list, Cli, Commands};
pub use runner::{build_transport, Runner};
