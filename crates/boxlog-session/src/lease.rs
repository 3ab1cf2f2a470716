//! Scoped ownership of a created environment.

use std::sync::Arc;

use boxlog_core::{EnvironmentHandle, EnvironmentRuntime, error::EnvironmentStopError};

/// Owns an environment handle and guarantees one teardown attempt.
///
/// `release` stops the environment and consumes the lease. A lease dropped
/// without being released (panic, abandoned future) schedules the stop on
/// the current tokio runtime instead.
pub struct EnvironmentLease<R: EnvironmentRuntime + 'static> {
    runtime: Arc<R>,
    handle: EnvironmentHandle,
    released: bool,
}

impl<R: EnvironmentRuntime + 'static> EnvironmentLease<R> {
    #[must_use]
    pub const fn new(runtime: Arc<R>, handle: EnvironmentHandle) -> Self {
        Self {
            runtime,
            handle,
            released: false,
        }
    }

    #[must_use]
    pub const fn handle(&self) -> &EnvironmentHandle {
        &self.handle
    }

    /// Stop and release the environment.
    ///
    /// # Errors
    /// Returns the runtime's stop error. The attempt is not repeated.
    pub async fn release(mut self) -> Result<(), EnvironmentStopError> {
        self.released = true;
        self.runtime.stop(&self.handle).await
    }
}

impl<R: EnvironmentRuntime + 'static> Drop for EnvironmentLease<R> {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let handle = self.handle.clone();
        let Ok(rt) = tokio::runtime::Handle::try_current() else {
            tracing::error!(environment = %handle, "Environment leaked: no runtime to stop it");
            return;
        };

        tracing::warn!(environment = %handle, "Lease dropped unreleased, stopping in background");
        let runtime = Arc::clone(&self.runtime);
        rt.spawn(async move {
            if let Err(e) = runtime.stop(&handle).await {
                tracing::error!(error = %e, "Background teardown failed");
            }
        });
    }
}
