//! Record sinks
//!
//! Executors hand every message to a [`RecordSink`]. Writes are serialized
//! behind a mutex, so messages from concurrent streams never interleave within
//! a line.

use super::message::Message;
use crate::error::{Error, Result};
use crate::types::JsonObject;
use std::io::Write;
use std::sync::Mutex;

/// Destination of emitted messages
pub trait RecordSink: Send + Sync {
    /// Write one message
    fn write(&self, message: Message) -> Result<()>;

    /// Emit a record of `stream`
    fn emit(&self, stream: &str, record: JsonObject) -> Result<()> {
        self.write(Message::record(stream, record))
    }
}

/// Writes one JSON message per line
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|_| Error::output("sink writer lock poisoned"))
    }
}

impl JsonLinesSink<std::io::Stdout> {
    /// Sink writing to stdout
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn write(&self, message: Message) -> Result<()> {
        let line = serde_json::to_string(&message)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::output("sink writer lock poisoned"))?;
        writeln!(writer, "{line}")?;
        if !message.is_record() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl<W: Write + Send> std::fmt::Debug for JsonLinesSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink").finish_non_exhaustive()
    }
}

/// Collects messages in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<Message>>,
}

impl MemorySink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages so far
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Records of one stream, in emission order
    pub fn records(&self, stream: &str) -> Vec<JsonObject> {
        self.messages()
            .into_iter()
            .filter_map(|message| match message {
                Message::Record {
                    stream: s, record, ..
                } if s == stream => Some(record),
                _ => None,
            })
            .collect()
    }

    /// Number of state messages
    pub fn state_count(&self) -> usize {
        self.messages().iter().filter(|m| m.is_state()).count()
    }
}

impl RecordSink for MemorySink {
    fn write(&self, message: Message) -> Result<()> {
        self.messages
            .lock()
            .map_err(|_| Error::output("memory sink lock poisoned"))?
            .push(message);
        Ok(())
    }
}
