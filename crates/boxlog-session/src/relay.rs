//! Log capture relay: environment output in, ordered records out.

use boxlog_core::{
    LineSplitter, LogRecord, LogSink, OutputStream, Pipe, SequenceCounter,
    error::OutputReadError,
};
use bytes::Bytes;
use futures::StreamExt;
use serde::Serialize;

/// Target for relayed workload lines in local diagnostics.
pub const WORKLOAD_TARGET: &str = "boxlog::workload";

/// How the relay reached Done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The output stream ended: the workload exited.
    Exhausted,
    /// Reading the output failed.
    ReadFailed(OutputReadError),
}

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    /// Records accepted by the sink.
    pub forwarded: u64,
    /// Records the sink failed to accept.
    pub dropped: u64,
    /// Empty lines, never sent.
    pub skipped: u64,
}

/// Forwards each output line to a sink, in order, one record at a time.
///
/// Counters live on the relay so they survive an abandoned `run`.
pub struct LogRelay<'a, S: LogSink + ?Sized> {
    sink: &'a S,
    sequence: SequenceCounter,
    stats: RelayStats,
}

impl<'a, S: LogSink + ?Sized> LogRelay<'a, S> {
    #[must_use]
    pub fn new(sink: &'a S) -> Self {
        Self::with_sequence(sink, SequenceCounter::new())
    }

    /// Number records from a counter shared with other writers of `sink`.
    #[must_use]
    pub fn with_sequence(sink: &'a S, sequence: SequenceCounter) -> Self {
        Self {
            sink,
            sequence,
            stats: RelayStats::default(),
        }
    }

    #[must_use]
    pub const fn stats(&self) -> RelayStats {
        self.stats
    }

    /// Drain `output` until it ends or fails.
    ///
    /// Each pipe is split into lines separately, so a partial line on one
    /// pipe is never joined with bytes from the other. Sink failures are
    /// logged and counted; a read failure ends the run.
    pub async fn run(&mut self, mut output: OutputStream) -> RelayOutcome {
        let mut stdout = LineSplitter::new();
        let mut stderr = LineSplitter::new();

        while let Some(next) = output.next().await {
            match next {
                Ok(chunk) => {
                    let splitter = match chunk.pipe {
                        Pipe::Stdout => &mut stdout,
                        Pipe::Stderr => &mut stderr,
                    };
                    for line in splitter.push(&chunk.data) {
                        self.forward(line).await;
                    }
                }
                Err(e) => return RelayOutcome::ReadFailed(e),
            }
        }

        for tail in [stdout.finish(), stderr.finish()].into_iter().flatten() {
            self.forward(tail).await;
        }
        RelayOutcome::Exhausted
    }

    async fn forward(&mut self, line: Bytes) {
        if line.is_empty() {
            self.stats.skipped += 1;
            return;
        }

        let record = LogRecord::new(self.sequence.next_sequence(), line);
        tracing::info!(target: WORKLOAD_TARGET, "{}", record.text());

        match self.sink.append(&record).await {
            Ok(()) => self.stats.forwarded += 1,
            Err(e) => {
                self.stats.dropped += 1;
                tracing::warn!(
                    sequence = record.sequence,
                    error = %e,
                    "Workload output lost a record"
                );
            }
        }
    }
}
