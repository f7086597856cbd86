//! Record normalization
//!
//! Raw records go through two stages before emission:
//!
//! 1. [`normalize`]: integer coercion of the stream's declared fields
//! 2. [`apply_all`]: the stream's [`PostProcess`] hooks, in order
//!
//! Both stages fail with a coercion error when upstream data no longer
//! matches the declared shape.

mod coercion;
mod hooks;
pub mod python_json;

pub use coercion::{coerce_integer, normalize};
pub use hooks::{apply_all, HookFn, PostProcess};
