//! Scripted environment runtime for session tests.

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use boxlog_core::{
    EnvironmentHandle, EnvironmentRuntime, ExecutionRequest, OutputChunk, OutputStream, Pipe,
    error::{EnvironmentCreateError, EnvironmentStopError, OutputReadError},
};
use bytes::Bytes;
use futures::{StreamExt, stream};

/// Runtime whose output, failures and call counts are fixed up front.
pub struct ScriptedRuntime {
    create_error: Option<EnvironmentCreateError>,
    output: Mutex<Option<Vec<Result<OutputChunk, OutputReadError>>>>,
    hang_after_output: bool,
    stop_error: Option<String>,
    create_calls: AtomicUsize,
    stop_calls: AtomicUsize,
}

impl ScriptedRuntime {
    pub fn new() -> Self {
        Self {
            create_error: None,
            output: Mutex::new(Some(Vec::new())),
            hang_after_output: false,
            stop_error: None,
            create_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
        }
    }

    /// Emit these stdout chunks, then end the stream.
    pub fn with_output(self, chunks: &[&'static str]) -> Self {
        let tagged: Vec<_> = chunks.iter().map(|c| (Pipe::Stdout, *c)).collect();
        self.with_chunks(&tagged)
    }

    /// Emit these chunks on their pipes, then end the stream.
    pub fn with_chunks(self, chunks: &[(Pipe, &'static str)]) -> Self {
        let script = chunks
            .iter()
            .map(|(pipe, c)| Ok(OutputChunk::new(*pipe, Bytes::from_static(c.as_bytes()))))
            .collect();
        *self.output.lock().unwrap() = Some(script);
        self
    }

    /// Append a read failure after the scripted chunks.
    pub fn with_read_error(self, err: OutputReadError) -> Self {
        if let Some(script) = self.output.lock().unwrap().as_mut() {
            script.push(Err(err));
        }
        self
    }

    /// Keep the stream open forever after the scripted chunks.
    pub fn hanging(mut self) -> Self {
        self.hang_after_output = true;
        self
    }

    pub fn with_create_error(mut self, err: EnvironmentCreateError) -> Self {
        self.create_error = Some(err);
        self
    }

    pub fn with_stop_failure(mut self, detail: &str) -> Self {
        self.stop_error = Some(detail.to_string());
        self
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnvironmentRuntime for ScriptedRuntime {
    async fn create(
        &self,
        request: &ExecutionRequest,
    ) -> Result<EnvironmentHandle, EnvironmentCreateError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        request.argv()?;
        match &self.create_error {
            Some(err) => Err(err.clone()),
            None => Ok(EnvironmentHandle::new(uuid::Uuid::new_v4().simple().to_string())),
        }
    }

    fn read_output(&self, handle: &EnvironmentHandle) -> OutputStream {
        let Some(script) = self.output.lock().unwrap().take() else {
            let err = OutputReadError::AlreadyConsumed(handle.id().to_string());
            return stream::once(async move { Err(err) }).boxed();
        };
        let scripted = stream::iter(script);
        if self.hang_after_output {
            scripted.chain(stream::pending()).boxed()
        } else {
            scripted.boxed()
        }
    }

    async fn stop(&self, handle: &EnvironmentHandle) -> Result<(), EnvironmentStopError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        match &self.stop_error {
            Some(detail) => Err(EnvironmentStopError {
                id: handle.id().to_string(),
                detail: detail.clone(),
            }),
            None => Ok(()),
        }
    }
}
