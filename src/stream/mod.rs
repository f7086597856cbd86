//! Stream definitions and registry
//!
//! # Overview
//!
//! - [`StreamDefinition`]: what to fetch and how to shape it
//! - [`StreamRegistry`]: validated, dependency-ordered set of definitions
//! - [`RequestContext`]: parent-derived placeholder values
//! - [`jotform_catalog`]: the Jotform streams

mod catalog;
mod context;
mod definition;
mod registry;
pub mod schema;

pub use catalog::{
    forms, jotform_catalog, questions, reports, submissions, user_history, PAGE_SIZE,
};
pub use context::RequestContext;
pub use definition::{
    Capabilities, ContextFn, ContextMapping, ParentLink, StreamDefinition,
};
pub use registry::{Selection, StreamRegistry};

#[cfg(test)]
mod tests;
