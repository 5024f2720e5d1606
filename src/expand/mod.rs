//! Reference expansion module
//!
//! The server ships graph-shaped results as flat sibling arrays: posts
//! carry a `creator` id, while the full user objects live in `users`.
//! Expansion swaps those ids for the records they point at.
//!
//! # Overview
//!
//! - `ExpandConfig` - which foreign-key fields to resolve, fixed at construction
//! - `ExpansionRule` - one (targets, references, fields) triple
//! - `ReferenceExpander` - applies rules to a response payload

mod expander;
mod types;

pub use expander::{ReferenceExpander, ReferenceSet};
pub use types::{ExpandConfig, ExpansionRule, COMMENT_LINK_RULES, FEED_RULES};
