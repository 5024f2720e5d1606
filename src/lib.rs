// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # feedwalk
//!
//! A resilient, cursor-paginated ingestion engine for social-feed APIs.
//!
//! ## Features
//!
//! - **Paged exports**: walks time-ordered result sets page by page
//! - **Governed retries**: exponential backoff with jitter, bounded per page
//! - **Rate limits**: pacing driven by server headers, plus a hard ceiling
//! - **Monotonic cursors**: stops when the server's cursor stops moving forward
//! - **Reference expansion**: links ids to records from sibling arrays
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use feedwalk::{ClientConfig, Credentials, FeedClient, JsonSink, Profile, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     feedwalk::logging::init_tracing(tracing::Level::INFO);
//!
//!     let config = feedwalk::load_config("feedwalk.yaml")?;
//!     let client = FeedClient::new(config, Credentials::new("mst...", "jst..."))?;
//!
//!     let mut sink = JsonSink::stdout();
//!     let outcome = client.posts(&Profile::with_id("a1b2c3"), &mut sink).await?;
//!     eprintln!("stopped: {:?}", outcome.termination);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ FeedClient: headers, query, resource catalogue, single calls │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ fetch(profile, cursor)
//! ┌──────────────────────────────┴───────────────────────────────┐
//! │ PagingEngine: fetch → expand → reduce → emit → advance       │
//! └──────────────────────────────────────────────────────────────┘
//!      │              │               │                │
//! ┌────┴─────┐ ┌──────┴───────┐ ┌─────┴────────┐ ┌─────┴──────┐
//! │ Cursor   │ │ RateGovernor │ │ RefExpander  │ │ ResultSink │
//! │ parse    │ │ pace         │ │ link ids     │ │ JSON       │
//! │ compare  │ │ backoff      │ │              │ │ memory     │
//! └──────────┘ └──────┬───────┘ └──────────────┘ └────────────┘
//!                     │ response headers
//!              ┌──────┴────────┐
//!              │ SessionBridge │── Session (token rotation)
//!              └───────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Extended-timestamp cursors
pub mod cursor;

/// Feed API client and rate governor
pub mod http;

/// Paging options, continuation metadata and reducers
pub mod pagination;

/// The paged fetch loop
pub mod engine;

/// Reference graph expansion
pub mod expand;

/// Result sinks
pub mod sink;

/// Session tokens and response feedback
pub mod session;

/// Paged resource catalogue
pub mod resource;

/// Client configuration
pub mod config;

/// Tracing subscriber setup
pub mod logging;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{load_config, load_config_from_str, ClientConfig};
pub use cursor::Cursor;
pub use engine::{PagingEngine, PagingOutcome, Termination};
pub use expand::{ExpandConfig, ReferenceExpander};
pub use http::{FeedClient, RateGovernor, RateGovernorConfig};
pub use pagination::PagingOptions;
pub use resource::Resource;
pub use session::{Credentials, Session, SessionBridge};
pub use sink::{CollectingSink, JsonSink, ResultSink};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
