//! Human-readable status lines for a session.

use std::sync::Arc;

use boxlog_core::{LogRecord, LogSink, SequenceCounter};
use bytes::Bytes;

/// Target for session status lines in local diagnostics.
pub const STATUS_TARGET: &str = "boxlog::session";

/// Logging context held by a session.
///
/// Every line goes to local diagnostics; with a mirror sink it is also
/// appended to the destination, where a failure is only logged.
pub struct StatusReporter {
    mirror: Option<(Arc<dyn LogSink>, SequenceCounter)>,
}

impl StatusReporter {
    /// Local diagnostics only.
    #[must_use]
    pub const fn local() -> Self {
        Self { mirror: None }
    }

    /// Local diagnostics plus the given sink.
    ///
    /// Mirrored lines take their sequence numbers from `sequence`, which
    /// should be the counter the workload records for `sink` use.
    #[must_use]
    pub fn mirrored(sink: Arc<dyn LogSink>, sequence: SequenceCounter) -> Self {
        Self {
            mirror: Some((sink, sequence)),
        }
    }

    pub async fn info(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!(target: STATUS_TARGET, "{line}");
        self.mirror(line).await;
    }

    pub async fn warn(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::warn!(target: STATUS_TARGET, "{line}");
        self.mirror(line).await;
    }

    pub async fn error(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::error!(target: STATUS_TARGET, "{line}");
        self.mirror(line).await;
    }

    async fn mirror(&self, line: String) {
        let Some((sink, sequence)) = &self.mirror else {
            return;
        };
        let record = LogRecord::new(sequence.next_sequence(), Bytes::from(line));
        if let Err(e) = sink.append(&record).await {
            tracing::warn!(error = %e, "Failed to mirror status line");
        }
    }
}
