//! Run lifecycle state machine.
//!
//! A run moves `initializing → running → {paused ⇄ running}* → terminal`,
//! with two suspension states (`awaiting_user`, `awaiting_credential`) that
//! return to `running` once the caller supplies what was asked for.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// State built, no step dispatched yet.
    Initializing,
    /// Driver is iterating.
    Running,
    /// Parked at a step boundary until continued or cancelled.
    Paused,
    /// Suspended until the user answers an information request.
    AwaitingUser,
    /// Suspended until a missing credential is supplied externally.
    AwaitingCredential,
    /// Finished normally (completion directive or budget exhausted).
    Completed,
    /// Stopped by a cancel request.
    Cancelled,
    /// Stopped by an unrecoverable failure.
    Error,
}

impl RunStatus {
    /// Checks if the run can transition to the given status.
    ///
    /// # Arguments
    /// * `to` - The target status
    ///
    /// # Returns
    /// Returns `true` if the transition is valid, `false` otherwise.
    #[must_use]
    #[allow(clippy::match_same_arms)] // Each arm represents a distinct transition rule
    pub fn can_transition_to(&self, to: Self) -> bool {
        match (self, to) {
            // Same status is always valid
            (a, b) if *a == b => true,
            (Self::Initializing, Self::Running | Self::Cancelled | Self::Error) => true,
            (
                Self::Running,
                Self::Paused
                | Self::AwaitingUser
                | Self::AwaitingCredential
                | Self::Completed
                | Self::Cancelled
                | Self::Error,
            ) => true,
            (Self::Paused, Self::Running | Self::Cancelled | Self::Error) => true,
            (Self::AwaitingUser | Self::AwaitingCredential, Self::Running | Self::Cancelled) => {
                true
            }
            // Terminal statuses never change
            _ => false,
        }
    }

    /// Returns `true` for completed, cancelled and error.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Error)
    }

    /// Returns `true` for statuses a run can be resumed from.
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::Paused | Self::AwaitingUser | Self::AwaitingCredential)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::AwaitingUser => "awaiting_user",
            Self::AwaitingCredential => "awaiting_credential",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}
