// Agent turns
//
// One turn is one agent reasoning over the run so far and returning a
// decision. The builder assembles what the agent sees, the executor runs the
// reasoning call and classifies the result into a closed outcome.

pub mod briefing;
pub mod builder;
pub mod decision;
pub mod executor;

use serde::{Deserialize, Serialize};

use crate::config::AgentDescriptor;
use crate::context::{ContextSet, ContextUpdate};
use crate::state::{Message, RunSnapshot};

pub use briefing::{BriefingBuilder, DefaultBriefing};
pub use builder::build_turn_input;
pub use decision::{DecisionContract, Recipient, RoutingMode, TurnDecision, USER_RECIPIENT, parse_decision};
pub use executor::TurnExecutor;

/// Everything one agent sees on its turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnInput {
    /// Acting agent
    pub agent: AgentDescriptor,
    /// Task message for this turn
    pub message: String,
    /// Conversation history
    pub history: Vec<Message>,
    /// Context sets visible to the agent
    pub context_sets: Vec<ContextSet>,
    /// Agents taking part in the run
    pub team: Vec<AgentDescriptor>,
    /// Progress figures of the run
    pub snapshot: RunSnapshot,
    /// Owner of the run
    pub owner_id: String,
    /// Criteria the response is validated against
    pub acceptance_criteria: Option<String>,
    /// Whether the caller prefers streamed output
    pub stream: bool,
}

impl TurnInput {
    /// Peers the acting agent may hand control to
    pub fn peers(&self) -> Vec<String> {
        self.team
            .iter()
            .filter(|peer| peer.name != self.agent.name && self.agent.may_address(&peer.name))
            .map(|peer| peer.name.clone())
            .collect()
    }
}

/// Classified result of one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The agent answered without routing
    Completed {
        /// Response text
        response: String,
        /// The agent declared the objective met
        workflow_complete: bool,
    },
    /// The agent answered and handed control to a peer
    Routed {
        /// Response text
        response: String,
        /// Peer named by the decision
        recipient: String,
    },
    /// The agent needs an answer from the user
    AwaitingUser {
        /// Question for the user
        response: String,
    },
    /// A tool needs a credential the owner has not stored
    AwaitingCredential {
        /// Credential name
        credential: String,
        /// Prompt shown to the user
        message: String,
    },
    /// The response did not meet the acceptance criteria
    ValidationFailed {
        /// Rejected response
        response: String,
        /// Why it was rejected
        feedback: String,
    },
    /// The turn could not produce a decision
    Failed {
        /// Human-readable error naming the agent
        error: String,
    },
}

/// Status taxonomy reported for a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// Response produced
    Completed,
    /// Response produced and accepted by the validator
    CompletedValidated,
    /// Response rejected by the validator
    ValidationFailed,
    /// Waiting for a credential
    RequiresCredentialInput,
    /// Waiting for the user
    AwaitingUser,
    /// The turn failed
    Error,
}

/// What one turn produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    /// Agent that took the turn
    pub agent: String,
    /// Classified outcome
    pub outcome: TurnOutcome,
    /// Context mutations to merge
    #[serde(default)]
    pub context_update: ContextUpdate,
    /// Whether a validator accepted the response
    #[serde(default)]
    pub validated: bool,
}

impl TurnResult {
    /// Result without context mutations
    pub fn new(agent: impl Into<String>, outcome: TurnOutcome) -> Self {
        Self { agent: agent.into(), outcome, context_update: ContextUpdate::default(), validated: false }
    }

    /// Failed turn
    pub fn failed(agent: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(agent, TurnOutcome::Failed { error: error.into() })
    }

    /// Status in the reported taxonomy
    pub fn status(&self) -> TurnStatus {
        match &self.outcome {
            TurnOutcome::Completed { .. } | TurnOutcome::Routed { .. } if self.validated => {
                TurnStatus::CompletedValidated
            }
            TurnOutcome::Completed { .. } | TurnOutcome::Routed { .. } => TurnStatus::Completed,
            TurnOutcome::AwaitingUser { .. } => TurnStatus::AwaitingUser,
            TurnOutcome::AwaitingCredential { .. } => TurnStatus::RequiresCredentialInput,
            TurnOutcome::ValidationFailed { .. } => TurnStatus::ValidationFailed,
            TurnOutcome::Failed { .. } => TurnStatus::Error,
        }
    }

    /// Whether the turn asked for context changes
    pub fn context_modified(&self) -> bool {
        !self.context_update.is_empty()
    }

    /// Text the turn contributes to the history, if any
    pub fn response(&self) -> Option<&str> {
        match &self.outcome {
            TurnOutcome::Completed { response, .. }
            | TurnOutcome::Routed { response, .. }
            | TurnOutcome::AwaitingUser { response }
            | TurnOutcome::ValidationFailed { response, .. } => Some(response),
            TurnOutcome::AwaitingCredential { .. } | TurnOutcome::Failed { .. } => None,
        }
    }
}
