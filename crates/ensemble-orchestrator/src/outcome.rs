//! Caller-facing summary of a finished or suspended run.

use ensemble_abstraction::ChatRole;
use serde::{Deserialize, Serialize};

use crate::config::WorkflowStrategy;
use crate::context::ContextSet;
use crate::lifecycle::RunStatus;
use crate::state::{PendingRequest, RunState};

/// One agent response, in history order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Agent that answered.
    pub agent: String,
    /// Response text.
    pub content: String,
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Run identifier.
    pub run_id: String,
    /// Final (or suspended) status.
    pub status: RunStatus,
    /// Strategy the run used.
    pub strategy: WorkflowStrategy,
    /// Rounds fully or partly executed.
    pub rounds: u32,
    /// Turns executed.
    pub turns: u32,
    /// Last agent response, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_response: Option<String>,
    /// Every agent response.
    pub responses: Vec<AgentResponse>,
    /// Context sets at the end of the run.
    pub context_sets: Vec<ContextSet>,
    /// Rolling summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Error that stopped the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// What a suspended run is waiting for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingRequest>,
}

impl RunOutcome {
    /// Build the outcome from the state a driver returned.
    pub fn from_state(state: &RunState) -> Self {
        let responses: Vec<AgentResponse> = state
            .history
            .iter()
            .filter(|message| message.role == ChatRole::Assistant)
            .map(|message| AgentResponse {
                agent: message.agent.clone().unwrap_or_default(),
                content: message.content.clone(),
            })
            .collect();
        // A non-empty order means the current round was entered.
        let rounds = if state.round_order.is_empty() { state.round } else { state.round + 1 };

        Self {
            run_id: state.run_id.clone(),
            status: state.status,
            strategy: state.strategy,
            rounds: rounds.min(state.config.effective_rounds()),
            turns: state.turns,
            final_response: state.last_agent_response().map(|message| message.content.clone()),
            responses,
            context_sets: state.context_sets.clone(),
            summary: state.summary.clone(),
            error: state.error.clone(),
            pending: state.pending.clone(),
        }
    }

    /// Whether the run completed normally.
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Whether the run is waiting on the user or a credential.
    pub fn is_suspended(&self) -> bool {
        matches!(self.status, RunStatus::AwaitingUser | RunStatus::AwaitingCredential)
    }
}
