// Error types for orchestration

use thiserror::Error;

use crate::lifecycle::RunStatus;

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

/// Orchestration errors
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// The run configuration cannot produce a valid run
    #[error("Invalid run configuration: {0}")]
    InvalidConfig(String),

    /// A status change the run state machine does not allow
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Status before the attempted change
        from: RunStatus,
        /// Requested status
        to: RunStatus,
    },

    /// The reasoning call returned something that is not a decision
    #[error("Malformed decision: {0}")]
    MalformedDecision(String),

    /// A decision broke the contract it was asked to honour
    #[error("Decision contract violated: {0}")]
    ContractViolation(String),

    /// A turn or routing target names an agent outside the team
    #[error("Unknown agent '{0}'")]
    UnknownAgent(String),

    /// The run cannot be resumed from its current status
    #[error("Run cannot be resumed from status {0}")]
    NotResumable(RunStatus),

    /// The resume input does not answer what the run is waiting for
    #[error("Run in status {status} cannot be resumed with {input}")]
    ResumeMismatch {
        /// Status of the suspended run
        status: RunStatus,
        /// Kind of input supplied
        input: String,
    },

    /// Model error
    #[error("Model error: {0}")]
    Model(#[from] ensemble_abstraction::ModelError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Snapshot not found in the store
    #[error("Snapshot '{name}' not found for owner '{owner}'")]
    SnapshotNotFound {
        /// Owner identifier
        owner: String,
        /// Snapshot name
        name: String,
    },

    /// Other error
    #[error("Orchestration error: {0}")]
    Other(String),
}
