//! Core abstractions for relaying a container's output to a remote log.
//!
//! This crate provides the fundamental building blocks:
//! - `ExecutionRequest` - What to run
//! - `OutputChunk` / `LineSplitter` / `LogRecord` - Output chunks and the lines cut from them
//! - `LogDestination` - Where the records go
//! - `SessionState` - Session lifecycle
//! - Runtime and sink traits, plus the error taxonomy

pub mod destination;
pub mod error;
pub mod record;
pub mod request;
pub mod state;
pub mod traits;

pub use destination::{Credentials, LogDestination};
pub use record::{LineSplitter, LogRecord, OutputChunk, Pipe, SequenceCounter};
pub use request::ExecutionRequest;
pub use state::SessionState;
pub use traits::{EnvironmentHandle, EnvironmentRuntime, LogSink, OutputStream};
