//! Session lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle state of an execution session.
///
/// Transitions only move forward: Created → Running → {Stopped, Failed},
/// or Created → Failed when the environment could not be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Request accepted, environment not yet created.
    Created,
    /// Environment exists and its output is being relayed.
    Running,
    /// Output exhausted normally and teardown attempted.
    Stopped,
    /// Creation, output reading, or the run itself failed.
    Failed,
}

impl SessionState {
    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Running | Self::Failed)
                | (Self::Running, Self::Stopped | Self::Failed)
        )
    }
}
