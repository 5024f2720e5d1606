//! In-memory sink

use super::ResultSink;
use crate::error::DispatchStage;
use crate::types::Record;

/// One `emit` call as seen by a [`CollectingSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct Emitted {
    /// Records delivered
    pub batch: Vec<Record>,
    /// First-page flag
    pub is_first: bool,
    /// Last-page flag
    pub is_last: bool,
}

/// Keeps every batch in memory
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    /// Emit calls, in order
    pub emitted: Vec<Emitted>,
    /// Number of `start` calls
    pub starts: usize,
    /// Number of `finish` calls
    pub finishes: usize,
    fail_at: Option<DispatchStage>,
}

impl CollectingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that reports failure from the given call
    pub fn failing_at(stage: DispatchStage) -> Self {
        Self {
            fail_at: Some(stage),
            ..Self::default()
        }
    }

    /// All records across batches, in delivery order
    pub fn records(&self) -> Vec<&Record> {
        self.emitted.iter().flat_map(|e| e.batch.iter()).collect()
    }

    /// Number of emit calls
    pub fn emit_count(&self) -> usize {
        self.emitted.len()
    }

    fn ok(&self, stage: DispatchStage) -> bool {
        self.fail_at != Some(stage)
    }
}

impl ResultSink for CollectingSink {
    fn start(&mut self) -> bool {
        self.starts += 1;
        self.ok(DispatchStage::Start)
    }

    fn emit(&mut self, batch: Vec<Record>, is_first: bool, is_last: bool) -> bool {
        self.emitted.push(Emitted {
            batch,
            is_first,
            is_last,
        });
        self.ok(DispatchStage::Emit)
    }

    fn finish(&mut self) -> bool {
        self.finishes += 1;
        self.ok(DispatchStage::Finish)
    }
}
