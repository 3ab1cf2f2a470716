//! Execution request for a single workload.

use serde::{Deserialize, Serialize};

use crate::error::EnvironmentCreateError;

/// What to run: an image reference and a shell-style command line.
///
/// Immutable once built; the session receives it exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    image: String,
    command: String,
}

impl ExecutionRequest {
    /// Create a new execution request.
    #[must_use]
    pub fn new(image: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            command: command.into(),
        }
    }

    /// Image reference.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Command line as supplied.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Split the command line into argv using POSIX shell-word rules.
    ///
    /// # Errors
    /// Returns `InvalidRequest` if the image is blank or the command is empty
    /// or unbalanced.
    pub fn argv(&self) -> Result<Vec<String>, EnvironmentCreateError> {
        if self.image.trim().is_empty() {
            return Err(EnvironmentCreateError::InvalidRequest(
                "image reference is empty".into(),
            ));
        }
        let parts = shlex::split(&self.command).ok_or_else(|| {
            EnvironmentCreateError::InvalidRequest(format!(
                "command cannot be parsed: {}",
                self.command
            ))
        })?;
        if parts.is_empty() {
            return Err(EnvironmentCreateError::InvalidRequest(
                "command is empty after parsing".into(),
            ));
        }
        Ok(parts)
    }
}
