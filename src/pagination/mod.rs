//! Pagination module
//!
//! Cursor-paged result sets: continuation metadata, per-run options and
//! the reducers that pull a page's records out of a raw response.
//!
//! # Overview
//!
//! Every paged response carries its records under a resource-specific
//! key, an optional `next` cursor and an optional `last` flag. The
//! engine reads the latter two through [`Continuation`]; resources supply
//! the former through a reducer.

mod reduce;
mod types;

pub use reduce::{field, identity};
pub use types::{Continuation, PagingOptions, DEFAULT_RETRY_LIMIT};

#[cfg(test)]
mod tests;
