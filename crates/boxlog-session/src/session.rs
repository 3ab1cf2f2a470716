//! Execution session: one workload from creation to teardown.

use std::{future::Future, sync::Arc};

use boxlog_core::{
    EnvironmentRuntime, ExecutionRequest, LogSink, SequenceCounter, SessionState,
    error::{EnvironmentCreateError, EnvironmentStopError, OutputReadError},
};
use serde::Serialize;

use crate::{
    lease::EnvironmentLease,
    relay::{LogRelay, RelayOutcome, RelayStats},
    reporter::StatusReporter,
};

/// Session error.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Environment creation failed: {0}")]
    Create(#[from] EnvironmentCreateError),
    #[error("Reading workload output failed: {0}")]
    OutputRead(#[from] OutputReadError),
    #[error("Interrupted by operator")]
    Interrupted,
    #[error("Invalid session transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
}

/// Result of the teardown step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Teardown {
    /// No environment was acquired.
    NotRequired,
    /// The environment was stopped and released.
    Released,
    /// Stop failed; the environment may still exist.
    Degraded(EnvironmentStopError),
}

/// Everything a caller needs to report on a finished session.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub environment_id: Option<String>,
    pub state: SessionState,
    pub failure: Option<SessionError>,
    pub teardown: Teardown,
    pub relay: RelayStats,
}

impl SessionOutcome {
    /// Whether the workload ran to completion.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        matches!(self.state, SessionState::Stopped)
    }

    /// Serializable summary.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            environment_id: self.environment_id.clone(),
            state: self.state,
            failure: self.failure.as_ref().map(ToString::to_string),
            teardown: match &self.teardown {
                Teardown::NotRequired => "not_required".to_string(),
                Teardown::Released => "released".to_string(),
                Teardown::Degraded(e) => format!("degraded: {e}"),
            },
            relay: self.relay,
        }
    }
}

/// JSON-friendly view of a `SessionOutcome`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub environment_id: Option<String>,
    pub state: SessionState,
    pub failure: Option<String>,
    pub teardown: String,
    pub relay: RelayStats,
}

/// Session configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionConfig {
    /// Also append status lines to the log destination.
    pub mirror_status: bool,
}

/// Supervises exactly one workload.
///
/// Only the session decides the terminal state and only the session
/// triggers teardown.
pub struct ExecutionSession<R, S>
where
    R: EnvironmentRuntime + 'static,
    S: LogSink + 'static,
{
    runtime: Arc<R>,
    sink: Arc<S>,
    sequence: SequenceCounter,
    reporter: StatusReporter,
    state: SessionState,
}

impl<R, S> ExecutionSession<R, S>
where
    R: EnvironmentRuntime + 'static,
    S: LogSink + 'static,
{
    /// Create a new session.
    #[must_use]
    pub fn new(runtime: Arc<R>, sink: Arc<S>, config: SessionConfig) -> Self {
        let sequence = SequenceCounter::new();
        let reporter = if config.mirror_status {
            StatusReporter::mirrored(Arc::clone(&sink) as Arc<dyn LogSink>, sequence.clone())
        } else {
            StatusReporter::local()
        };
        Self {
            runtime,
            sink,
            sequence,
            reporter,
            state: SessionState::Created,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Run the workload to completion.
    ///
    /// # Errors
    /// Only an internal state-machine violation is returned as an error;
    /// workload failures are reported in the outcome.
    pub async fn run(self, request: &ExecutionRequest) -> Result<SessionOutcome, SessionError> {
        self.run_until(request, std::future::pending()).await
    }

    /// Run the workload, abandoning it if `interrupt` resolves first.
    ///
    /// An interrupt while running still tears the environment down and
    /// ends the session as Failed.
    ///
    /// # Errors
    /// Only an internal state-machine violation is returned as an error.
    pub async fn run_until<I>(
        mut self,
        request: &ExecutionRequest,
        interrupt: I,
    ) -> Result<SessionOutcome, SessionError>
    where
        I: Future<Output = ()> + Send,
    {
        self.reporter
            .info(format!("Command: {}", request.command()))
            .await;

        let handle = match self.runtime.create(request).await {
            Ok(handle) => handle,
            Err(e) => {
                self.transition(SessionState::Failed)?;
                let failure = SessionError::Create(e);
                self.reporter
                    .error(format!("Workload execution failed: {failure}"))
                    .await;
                return Ok(SessionOutcome {
                    environment_id: None,
                    state: self.state,
                    failure: Some(failure),
                    teardown: Teardown::NotRequired,
                    relay: RelayStats::default(),
                });
            }
        };

        // From here on the lease owns teardown, including on early return.
        let lease = EnvironmentLease::new(Arc::clone(&self.runtime), handle.clone());
        self.transition(SessionState::Running)?;
        self.reporter
            .info(format!(
                "Environment {handle} running image {}",
                request.image()
            ))
            .await;

        let sink = Arc::clone(&self.sink);
        let mut relay = LogRelay::with_sequence(sink.as_ref(), self.sequence.clone());
        let output = self.runtime.read_output(&handle);

        let failure = tokio::select! {
            outcome = relay.run(output) => match outcome {
                RelayOutcome::Exhausted => None,
                RelayOutcome::ReadFailed(e) => Some(SessionError::OutputRead(e)),
            },
            () = interrupt => Some(SessionError::Interrupted),
        };
        let stats = relay.stats();

        if let Some(failure) = &failure {
            self.reporter
                .error(format!("Workload execution failed: {failure}"))
                .await;
        }
        if stats.dropped > 0 {
            self.reporter
                .warn(format!(
                    "Workload output lost {} of {} records",
                    stats.dropped,
                    stats.dropped + stats.forwarded
                ))
                .await;
        }

        let teardown = match lease.release().await {
            Ok(()) => {
                self.reporter
                    .info(format!("Environment {handle} stopped and released."))
                    .await;
                Teardown::Released
            }
            Err(e) => {
                self.reporter
                    .error(format!("Teardown degraded: {e}"))
                    .await;
                Teardown::Degraded(e)
            }
        };

        let terminal = if failure.is_some() {
            SessionState::Failed
        } else {
            SessionState::Stopped
        };
        self.transition(terminal)?;

        Ok(SessionOutcome {
            environment_id: Some(handle.id().to_string()),
            state: self.state,
            failure,
            teardown,
            relay: stats,
        })
    }

    fn transition(&mut self, next: SessionState) -> Result<(), SessionError> {
        if !self.state.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(from = ?self.state, to = ?next, "Session transition");
        self.state = next;
        Ok(())
    }
}
