//! Pagination module
//!
//! Supports: result-set offset paging, single page
//!
//! # Overview
//!
//! A [`Paginator`] turns the previous response and token into the next
//! [`PageToken`], and renders a token into query parameters. Tokens only ever
//! grow, so every paginated invocation terminates once the server returns a
//! short page.

mod strategies;
mod types;

pub use strategies::{NoPaginator, ResultSetPaginator};
pub use types::{PageToken, PaginationConfig, Paginator};
pub(crate) use types::lookup_path;
