//! In-memory log sink.

use std::sync::{
    RwLock,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use boxlog_core::{LogRecord, LogSink, error::SinkWriteError};

/// In-memory sink implementation.
///
/// Keeps every accepted record in submission order. Useful for
/// development and tests; records are lost when the sink is dropped.
#[derive(Default)]
pub struct MemorySink {
    records: RwLock<Vec<LogRecord>>,
    attempts: AtomicU64,
    fail_every: Option<u64>,
}

impl MemorySink {
    /// Create a sink that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink whose every `n`th append fails (1-based).
    #[must_use]
    pub fn failing_every(n: u64) -> Self {
        Self {
            fail_every: Some(n.max(1)),
            ..Self::default()
        }
    }

    /// Snapshot of accepted records.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .read()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Accepted payloads as text.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.records().iter().map(LogRecord::text).collect()
    }

    /// Number of `append` calls, including failed ones.
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn append(&self, record: &LogRecord) -> Result<(), SinkWriteError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_every.is_some_and(|n| attempt % n == 0) {
            return Err(SinkWriteError::Transport {
                sequence: record.sequence,
                reason: format!("injected failure on attempt {attempt}"),
            });
        }

        self.records
            .write()
            .map_err(|e| SinkWriteError::Rejected {
                sequence: record.sequence,
                reason: e.to_string(),
            })?
            .push(record.clone());
        Ok(())
    }
}
