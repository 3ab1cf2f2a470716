//! Error taxonomy shared by the runtime and sink adapters.

use thiserror::Error;

/// The environment could not be created. Nothing was acquired.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvironmentCreateError {
    #[error("Invalid execution request: {0}")]
    InvalidRequest(String),
    #[error("Container runtime unavailable: {0}")]
    RuntimeUnavailable(String),
    #[error("Image not found: {image}: {detail}")]
    ImageNotFound { image: String, detail: String },
    #[error("Container runtime rejected the request: {0}")]
    Rejected(String),
}

/// Reading the environment's output failed. Fatal to the relay.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OutputReadError {
    #[error("Output of environment {0} was already consumed")]
    AlreadyConsumed(String),
    #[error("Failed to attach to output: {0}")]
    Attach(String),
    #[error("Output stream failed: {0}")]
    Stream(String),
}

/// Teardown failed. Reported, never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to stop environment {id}: {detail}")]
pub struct EnvironmentStopError {
    pub id: String,
    pub detail: String,
}

/// The log destination refused the connection at construction time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkAuthError {
    #[error("Log destination rejected credentials ({code}): {message}")]
    Rejected { code: String, message: String },
    #[error("Log destination setup failed ({code}): {message}")]
    Setup { code: String, message: String },
    #[error("Log destination unreachable: {0}")]
    Unreachable(String),
}

/// A single record could not be delivered. Recoverable per record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkWriteError {
    #[error("Log destination rejected record {sequence}: {reason}")]
    Rejected { sequence: u64, reason: String },
    #[error("Transport error delivering record {sequence}: {reason}")]
    Transport { sequence: u64, reason: String },
}
