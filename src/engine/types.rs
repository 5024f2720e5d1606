//! Engine types
//!
//! Terminal outcomes and run statistics for the paging engine.

/// Why a paged export stopped gracefully
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// A page came back with no records; nothing was emitted for it
    EmptyPage,
    /// The server flagged the page as the last one
    LastPage,
    /// The next cursor did not move past the previous one
    NonMonotonic,
    /// The next cursor reached the configured end cursor
    EndCursorReached,
    /// A non-final page carried no next cursor
    NoContinuation,
}

impl Termination {
    /// Stops that mean the stream itself misbehaved
    pub fn is_anomaly(&self) -> bool {
        matches!(self, Self::NonMonotonic | Self::NoContinuation)
    }
}

/// Graceful result of a paged export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingOutcome {
    /// Why the export stopped
    pub termination: Termination,
    /// Pages emitted to the sink
    pub pages: usize,
    /// Records emitted to the sink
    pub records: usize,
    /// Failed fetch attempts that were retried
    pub retries: usize,
    /// Last cursor the server handed out
    pub last_cursor: Option<String>,
}

impl PagingOutcome {
    pub(crate) fn new() -> Self {
        Self {
            termination: Termination::EmptyPage,
            pages: 0,
            records: 0,
            retries: 0,
            last_cursor: None,
        }
    }

    pub(crate) fn add_page(&mut self, records: usize) {
        self.pages += 1;
        self.records += records;
    }

    pub(crate) fn add_retry(&mut self) {
        self.retries += 1;
    }
}
