//! Log records and the line splitter that produces them.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use bytes::{Bytes, BytesMut};

/// Output pipe a chunk was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pipe {
    Stdout,
    Stderr,
}

/// Raw bytes read from one pipe of the workload.
///
/// Chunks of one pipe never carry the other pipe's bytes, so each pipe can be
/// split into lines on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub pipe: Pipe,
    pub data: Bytes,
}

impl OutputChunk {
    #[must_use]
    pub const fn new(pipe: Pipe, data: Bytes) -> Self {
        Self { pipe, data }
    }

    #[must_use]
    pub const fn stdout(data: Bytes) -> Self {
        Self::new(Pipe::Stdout, data)
    }

    #[must_use]
    pub const fn stderr(data: Bytes) -> Self {
        Self::new(Pipe::Stderr, data)
    }
}

/// Sequence numbers shared by every writer of one destination.
#[derive(Debug, Clone, Default)]
pub struct SequenceCounter(Arc<AtomicU64>);

impl SequenceCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next number, starting at 0.
    pub fn next_sequence(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

/// One line of workload output, tagged with its arrival position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub sequence: u64,
    pub payload: Bytes,
}

impl LogRecord {
    #[must_use]
    pub const fn new(sequence: u64, payload: Bytes) -> Self {
        Self { sequence, payload }
    }

    /// Payload decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Reassembles newline-delimited lines from arbitrarily sized chunks.
///
/// A partial line is held until its terminator arrives or `finish` is called.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: BytesMut,
}

impl LineSplitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the lines it completed, terminators stripped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line = self.pending.split_to(pos + 1);
            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(pos - 1);
            }
            lines.push(line.freeze());
        }
        lines
    }

    /// Flush the trailing unterminated line, if any.
    pub fn finish(&mut self) -> Option<Bytes> {
        if self.pending.is_empty() {
            return None;
        }
        let mut line = self.pending.split();
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        Some(line.freeze())
    }
}
