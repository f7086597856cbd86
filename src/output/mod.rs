//! Message output
//!
//! Provides:
//! - `Message` - Singer SCHEMA / RECORD / STATE messages
//! - `RecordSink` - where executors send messages
//! - `JsonLinesSink` and `MemorySink`

mod message;
mod sink;

pub use message::Message;
pub use sink::{JsonLinesSink, MemorySink, RecordSink};

#[cfg(test)]
mod tests;
