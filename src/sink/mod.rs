//! Result sink module
//!
//! The start/emit/finish interface that receives paginated output.
//!
//! # Contract
//!
//! - `start` precedes any `emit`; returning false aborts before any fetch
//! - `emit` is called once per non-empty page, zero or more times
//! - `finish` is called exactly once, and only on graceful completion
//!
//! A false return from any call is fatal to the export.

mod collect;
mod json;

pub use collect::{CollectingSink, Emitted};
pub use json::JsonSink;

use crate::types::Record;

/// Receives the batches produced by an export
pub trait ResultSink: Send {
    /// Prepare for a new export
    fn start(&mut self) -> bool;

    /// Deliver one page of records
    fn emit(&mut self, batch: Vec<Record>, is_first: bool, is_last: bool) -> bool;

    /// Signal normal completion
    fn finish(&mut self) -> bool;
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn start(&mut self) -> bool {
        (**self).start()
    }

    fn emit(&mut self, batch: Vec<Record>, is_first: bool, is_last: bool) -> bool {
        (**self).emit(batch, is_first, is_last)
    }

    fn finish(&mut self) -> bool {
        (**self).finish()
    }
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn start(&mut self) -> bool {
        (**self).start()
    }

    fn emit(&mut self, batch: Vec<Record>, is_first: bool, is_last: bool) -> bool {
        (**self).emit(batch, is_first, is_last)
    }

    fn finish(&mut self) -> bool {
        (**self).finish()
    }
}
