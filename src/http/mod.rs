//! HTTP module
//!
//! The feed API client and the rate governor that paces it.
//!
//! # Features
//!
//! - **Single-shot requests**: retries are left to the paging engine
//! - **Header feedback**: every response updates session tokens and limits
//! - **Rate governance**: header-driven pacing, exponential backoff with
//!   jitter, and a token-bucket ceiling using governor

mod client;
mod rate_limit;

pub use client::FeedClient;
pub use rate_limit::{RateGovernor, RateGovernorConfig, RateState};
