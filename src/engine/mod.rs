//! Execution engine module
//!
//! The paged fetch loop and its retry/termination policy.
//!
//! # Overview
//!
//! One run of [`PagingEngine`] walks a cursor-paged result set:
//!
//! ```text
//! start ─▶ fetch ─▶ expand ─▶ reduce ─▶ emit ─▶ advance ─┬─▶ fetch ...
//!            │ (retry with backoff)                       └─▶ finish
//!            └─▶ retry limit exceeded (fatal)
//! ```
//!
//! Fetch failures are retried with governed backoff up to the retry limit,
//! unless they are configuration mistakes that would fail again. Failures
//! after the fetch abort the run immediately and `finish` is never called.
//! Graceful stops (empty page, last-page flag, cursor regression, end
//! cursor) emit the current page first and then finish.
//!
//! Cursors are not checkpointed: an aborted run cannot be resumed except by
//! starting a new run from a caller-supplied start cursor.

mod types;

pub use types::{PagingOutcome, Termination};

use crate::cursor::Cursor;
use crate::error::{DispatchStage, Error, Result};
use crate::expand::{ExpansionRule, ReferenceExpander};
use crate::http::RateGovernor;
use crate::pagination::{identity, Continuation, PagingOptions};
use crate::sink::ResultSink;
use crate::types::{JsonValue, Profile, Record};
use std::future::Future;
use tracing::{debug, info, warn};

/// Default reducer type: the response is the record sequence
pub type Reducer = fn(&mut JsonValue) -> Vec<Record>;

/// Drives fetch → expand → reduce → emit → advance cycles for one resource.
///
/// The fetch and reduce strategies are plain function values, so an engine
/// knows nothing about URLs or response shapes beyond the `next`/`last`
/// continuation fields.
pub struct PagingEngine<F, R = Reducer> {
    fetch: F,
    reduce: R,
    options: PagingOptions,
    governor: RateGovernor,
    expansion: Option<(ReferenceExpander, &'static [ExpansionRule])>,
}

impl<F> PagingEngine<F> {
    /// Create an engine around a fetch callback `(profile, cursor) -> response`
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            reduce: identity,
            options: PagingOptions::default(),
            governor: RateGovernor::default(),
            expansion: None,
        }
    }
}

impl<F, R> PagingEngine<F, R> {
    /// Replace the reducer that extracts records from a response
    pub fn with_reduce<R2>(self, reduce: R2) -> PagingEngine<F, R2>
    where
        R2: FnMut(&mut JsonValue) -> Vec<Record>,
    {
        PagingEngine {
            fetch: self.fetch,
            reduce,
            options: self.options,
            governor: self.governor,
            expansion: self.expansion,
        }
    }

    /// Set paging options
    #[must_use]
    pub fn with_options(mut self, options: PagingOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a (possibly shared) rate governor for retry backoff
    #[must_use]
    pub fn with_governor(mut self, governor: RateGovernor) -> Self {
        self.governor = governor;
        self
    }

    /// Link references in every response before reducing it
    #[must_use]
    pub fn with_expansion(
        mut self,
        expander: ReferenceExpander,
        rules: &'static [ExpansionRule],
    ) -> Self {
        self.expansion = Some((expander, rules));
        self
    }

    /// Paging options in use
    pub fn options(&self) -> &PagingOptions {
        &self.options
    }

    /// Run the export to completion.
    ///
    /// Returns why the export stopped on graceful completion; any fatal
    /// condition is returned as an error after which the sink has not seen
    /// `finish`.
    pub async fn run<S, Fut>(&mut self, profile: &Profile, sink: &mut S) -> Result<PagingOutcome>
    where
        S: ResultSink + ?Sized,
        F: FnMut(Profile, Option<String>) -> Fut,
        Fut: Future<Output = Result<JsonValue>>,
        R: FnMut(&mut JsonValue) -> Vec<Record>,
    {
        let mut outcome = PagingOutcome::new();
        let mut cursor = self.options.start.as_ref().map(|start| start.format(true));
        let mut error_count: u32 = 0;
        let mut is_first_page = true;

        if !sink.start() {
            return Err(Error::dispatch(DispatchStage::Start));
        }

        loop {
            // Fetch, retrying failures on the same cursor
            let mut raw = match (self.fetch)(profile.clone(), cursor.clone()).await {
                Ok(raw) => raw,
                Err(e) if e.is_retryable() => {
                    if error_count >= self.options.retry_limit {
                        return Err(Error::RetryLimitExceeded {
                            retry_limit: self.options.retry_limit,
                            last_error: e.to_string(),
                        });
                    }
                    error_count += 1;
                    outcome.add_retry();
                    warn!("Fetch failed: {e}");
                    info!("Retrying request (attempt {error_count})");
                    self.governor.wait(true, true).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            error_count = 0;
            self.governor.reset_errors();

            if let Some((expander, rules)) = &self.expansion {
                raw = expander.expand_payload(raw, rules)?;
            }

            let records = (self.reduce)(&mut raw);
            if records.is_empty() {
                info!("Received zero-length result; stopping");
                outcome.termination = Termination::EmptyPage;
                break;
            }

            let continuation = Continuation::from_response(&raw)?;
            let mut is_final_page = continuation.last && !self.options.ignore_last;
            let mut termination = is_final_page.then_some(Termination::LastPage);

            let count = records.len();
            if !sink.emit(records, is_first_page, is_final_page) {
                return Err(Error::dispatch(DispatchStage::Emit));
            }
            outcome.add_page(count);
            debug!("Emitted page {} with {count} records", outcome.pages);

            // Slide over
            let prev = cursor.take();
            cursor = continuation.next;

            match &cursor {
                Some(next_raw) => {
                    let next = Cursor::parse(next_raw)?;
                    debug!("Next cursor is {next_raw}");
                    outcome.last_cursor = Some(next_raw.clone());

                    if let Some(prev_raw) = &prev {
                        let prev = Cursor::parse(prev_raw)?;
                        if !next.is_after(&prev) {
                            warn!("Next cursor {next_raw} does not follow {prev_raw}");
                            warn!("Cursor sequence has gone non-monotonic; stopping now");
                            is_final_page = true;
                            termination.get_or_insert(Termination::NonMonotonic);
                        }
                    }

                    if let Some(end) = &self.options.end {
                        if next >= *end {
                            info!("End cursor {end} reached; stopping");
                            is_final_page = true;
                            termination.get_or_insert(Termination::EndCursorReached);
                        }
                    }
                }
                None if !is_final_page => {
                    warn!("Page carried no next cursor; stopping");
                    is_final_page = true;
                    termination = Some(Termination::NoContinuation);
                }
                None => {}
            }

            is_first_page = false;

            if is_final_page {
                outcome.termination = termination.unwrap_or(Termination::LastPage);
                break;
            }
        }

        if !sink.finish() {
            return Err(Error::dispatch(DispatchStage::Finish));
        }

        info!(
            "Finished fetching paged results: {} records in {} pages",
            outcome.records, outcome.pages
        );
        Ok(outcome)
    }
}

impl<F, R> std::fmt::Debug for PagingEngine<F, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagingEngine")
            .field("options", &self.options)
            .field("governor", &self.governor)
            .field("expands", &self.expansion.is_some())
            .finish_non_exhaustive()
    }
}
