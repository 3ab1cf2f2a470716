//! Execution session and log capture relay.
//!
//! Provides:
//! - `ExecutionSession` - Create, relay, and tear down one workload
//! - `LogRelay` - Ordered line-by-line forwarding to a `LogSink`
//! - `EnvironmentLease` - Scoped teardown of a created environment
//! - Sink implementations (memory)

pub mod lease;
pub mod relay;
pub mod reporter;
pub mod session;
pub mod sink;

#[cfg(test)]
mod testing;

pub use lease::EnvironmentLease;
pub use relay::{LogRelay, RelayOutcome, RelayStats};
pub use reporter::StatusReporter;
pub use session::{
    ExecutionSession, SessionConfig, SessionError, SessionOutcome, SessionSummary, Teardown,
};
