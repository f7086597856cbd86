//! Response decoder module
//!
//! Supports: array `content`, id-keyed object `content`
//!
//! # Overview
//!
//! Jotform wraps every payload as `{"responseCode", "content", "resultSet",
//! "limit-left"}`. The decoder pulls raw record objects out of `content`
//! according to the stream's [`RecordLayout`].

mod decoders;
mod types;

pub use decoders::{ContentDecoder, CONTENT_PATH};
pub use types::{RecordDecoder, RecordLayout};

#[cfg(test)]
mod tests;
