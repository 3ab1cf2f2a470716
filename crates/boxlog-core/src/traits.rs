//! Capability traits for the container runtime and the log destination.

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{
    ExecutionRequest, LogRecord, OutputChunk,
    error::{EnvironmentCreateError, EnvironmentStopError, OutputReadError, SinkWriteError},
};

/// Opaque handle to a created environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvironmentHandle {
    id: String,
}

impl EnvironmentHandle {
    /// Wrap a runtime-assigned identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Runtime-assigned identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Abbreviated identifier for status lines.
    #[must_use]
    pub fn short_id(&self) -> &str {
        self.id.get(..12).unwrap_or(&self.id)
    }
}

impl fmt::Display for EnvironmentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_id())
    }
}

/// Pipe-tagged chunks of stdout/stderr in arrival order. Ends when the
/// workload exits.
pub type OutputStream = BoxStream<'static, Result<OutputChunk, OutputReadError>>;

/// Trait for container runtimes.
#[async_trait]
pub trait EnvironmentRuntime: Send + Sync {
    /// Start a fresh environment running the request's command.
    ///
    /// Output must stay retrievable after the workload exits until `stop`.
    async fn create(
        &self,
        request: &ExecutionRequest,
    ) -> Result<EnvironmentHandle, EnvironmentCreateError>;

    /// Live output of the environment. Single pass per handle.
    fn read_output(&self, handle: &EnvironmentHandle) -> OutputStream;

    /// Terminate the workload and release every resource of the environment.
    ///
    /// Succeeds if the environment is already gone.
    async fn stop(&self, handle: &EnvironmentHandle) -> Result<(), EnvironmentStopError>;
}

/// Trait for append-only log destinations.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Forward one record. Records are delivered in call order.
    async fn append(&self, record: &LogRecord) -> Result<(), SinkWriteError>;
}
