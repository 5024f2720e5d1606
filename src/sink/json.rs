//! Streaming JSON array sink

use super::ResultSink;
use crate::types::Record;
use std::io::{self, Write};
use tracing::error;

/// Writes every record of an export into one pretty-printed JSON array.
///
/// The array is opened lazily on the first record and closed by `finish`,
/// so an export that yields nothing still produces `[]`.
#[derive(Debug)]
pub struct JsonSink<W: Write> {
    writer: W,
    written: usize,
}

impl JsonSink<io::Stdout> {
    /// Sink writing to standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Records written so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_batch(&mut self, batch: &[Record]) -> io::Result<()> {
        for record in batch {
            let lead = if self.written == 0 { "[\n" } else { ",\n" };
            self.writer.write_all(lead.as_bytes())?;
            serde_json::to_writer_pretty(&mut self.writer, record)?;
            self.written += 1;
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        let tail = if self.written == 0 { "[]\n" } else { "\n]\n" };
        self.writer.write_all(tail.as_bytes())?;
        self.writer.flush()
    }
}

impl<W: Write + Send> ResultSink for JsonSink<W> {
    fn start(&mut self) -> bool {
        self.written = 0;
        true
    }

    fn emit(&mut self, batch: Vec<Record>, _is_first: bool, _is_last: bool) -> bool {
        match self.write_batch(&batch) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to write batch: {e}");
                false
            }
        }
    }

    fn finish(&mut self) -> bool {
        match self.close() {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to close output: {e}");
                false
            }
        }
    }
}
