// crates/core/src/status.rs
//! Session status state machine.
//!
//! A session moves PENDING → IN_PROGRESS → (PAUSED ↔ IN_PROGRESS) →
//! COMPLETED | ABANDONED. COMPLETED and ABANDONED are terminal. All status
//! writes in the system go through [`SessionStatus::validate_transition`],
//! so transition legality is enforced in exactly one place.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of an interview session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Pending,
    InProgress,
    Paused,
    Completed,
    Abandoned,
}

/// Hire recommendation attached to a session's evaluation summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Reject,
    Weak,
    Maybe,
    Strong,
    Hire,
}

/// Outcome of a legal transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Target equals current status; accepted without any write.
    Noop,
    /// Apply the new status. `sets_completed_at` is true exactly when the
    /// target is COMPLETED, the only transition with a timestamp side effect.
    Apply { sets_completed_at: bool },
}

/// Rejected status change.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot transition from {from} to {to}")]
    Invalid {
        from: SessionStatus,
        to: SessionStatus,
    },

    /// Strict precondition for pause/resume not met.
    #[error("session is {actual}, expected {expected}")]
    Precondition {
        expected: SessionStatus,
        actual: SessionStatus,
    },
}

impl SessionStatus {
    /// Terminal states admit no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Abandoned)
    }

    /// Validate a requested status change from `self` to `target`.
    ///
    /// Same-state requests are accepted as no-ops, including on terminal
    /// states. Any non-terminal state may complete (stamping `completed_at`)
    /// or be abandoned; everything else follows the adjacency below.
    pub fn validate_transition(self, target: SessionStatus) -> Result<Transition, TransitionError> {
        use SessionStatus::*;

        if self == target {
            return Ok(Transition::Noop);
        }
        if self.is_terminal() {
            return Err(TransitionError::Invalid {
                from: self,
                to: target,
            });
        }

        let legal = match (self, target) {
            // Any non-terminal state may be completed or abandoned.
            (_, Completed) | (_, Abandoned) => true,
            (Pending, InProgress) => true,
            (InProgress, Paused) => true,
            (Paused, InProgress) => true,
            _ => false,
        };

        if legal {
            Ok(Transition::Apply {
                sets_completed_at: target == Completed,
            })
        } else {
            Err(TransitionError::Invalid {
                from: self,
                to: target,
            })
        }
    }

    /// Strict guard used by the explicit pause request: only IN_PROGRESS
    /// sessions can be paused.
    pub fn validate_pause(self) -> Result<(), TransitionError> {
        if self == SessionStatus::InProgress {
            Ok(())
        } else {
            Err(TransitionError::Precondition {
                expected: SessionStatus::InProgress,
                actual: self,
            })
        }
    }

    /// Strict guard used by the explicit resume request: only PAUSED
    /// sessions can be resumed.
    pub fn validate_resume(self) -> Result<(), TransitionError> {
        if self == SessionStatus::Paused {
            Ok(())
        } else {
            Err(TransitionError::Precondition {
                expected: SessionStatus::Paused,
                actual: self,
            })
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Pending => "PENDING",
            SessionStatus::InProgress => "IN_PROGRESS",
            SessionStatus::Paused => "PAUSED",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Abandoned => "ABANDONED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(SessionStatus::Pending),
            "IN_PROGRESS" => Some(SessionStatus::InProgress),
            "PAUSED" => Some(SessionStatus::Paused),
            "COMPLETED" => Some(SessionStatus::Completed),
            "ABANDONED" => Some(SessionStatus::Abandoned),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Recommendation {
    pub fn as_str(self) -> &'static str {
        match self {
            Recommendation::Reject => "REJECT",
            Recommendation::Weak => "WEAK",
            Recommendation::Maybe => "MAYBE",
            Recommendation::Strong => "STRONG",
            Recommendation::Hire => "HIRE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "REJECT" => Some(Recommendation::Reject),
            "WEAK" => Some(Recommendation::Weak),
            "MAYBE" => Some(Recommendation::Maybe),
            "STRONG" => Some(Recommendation::Strong),
            "HIRE" => Some(Recommendation::Hire),
            _ => None,
        }
    }
}
