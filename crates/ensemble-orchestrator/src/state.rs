//! Mutable per-run state.
//!
//! A [`RunState`] is derived from a [`RunConfig`] at run start and is owned
//! by the driver executing the run. It holds only plain data so a snapshot
//! collaborator can persist it and resume the run later.

use chrono::{DateTime, Utc};
use ensemble_abstraction::ChatRole;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::{RunConfig, WorkflowStrategy};
use crate::context::{ContextSet, ContextUpdate, MergeReport, merge_context_sets};
use crate::error::{OrchestrationError, Result};
use crate::lifecycle::RunStatus;

/// Structured directives attached to a message by the dynamic drivers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Directives {
    /// Agent name, or `user`, the turn handed control to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    /// Whether the turn declared the workflow complete.
    #[serde(default)]
    pub workflow_complete: bool,
    /// Context mutations the turn requested.
    #[serde(default)]
    pub context: ContextUpdate,
}

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Sender role.
    pub role: ChatRole,
    /// Text content.
    pub content: String,
    /// Agent that produced the message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// Routing and context directives, for dynamic drivers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directives: Option<Directives>,
    /// When the message was recorded.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Message from the user.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            agent: None,
            directives: None,
            timestamp: Utc::now(),
        }
    }

    /// Response produced by an agent.
    pub fn agent(agent: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            agent: Some(agent.into()),
            directives: None,
            timestamp: Utc::now(),
        }
    }

    /// Engine notice, optionally about an agent.
    pub fn system(content: impl Into<String>, agent: Option<String>) -> Self {
        Self { role: ChatRole::System, content: content.into(), agent, directives: None, timestamp: Utc::now() }
    }

    /// Attach directives.
    #[must_use]
    pub fn with_directives(mut self, directives: Directives) -> Self {
        self.directives = Some(directives);
        self
    }
}

/// What a suspended run is waiting for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingKind {
    /// An answer from the user.
    UserInput {
        /// Form the answer should fill, taken from a context set.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        form_schema: Option<Value>,
    },
    /// A credential supplied out of band.
    Credential {
        /// Credential name.
        name: String,
    },
}

/// Request that suspended the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRequest {
    /// Agent whose turn raised the request.
    pub agent: String,
    /// Message shown to the user (question or credential prompt).
    pub message: String,
    /// What is awaited.
    #[serde(flatten)]
    pub kind: PendingKind,
}

/// Read-only progress figures of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Run identifier
    pub run_id: String,
    /// Status when the snapshot was taken
    pub status: RunStatus,
    /// Current round
    pub round: u32,
    /// Current step
    pub step: u32,
    /// Turns executed so far
    pub turns: u32,
    /// Round budget
    pub max_rounds: u32,
    /// Rolling summary
    pub summary: Option<String>,
    /// Team name
    pub team_name: String,
    /// Team objective
    pub objective: String,
    /// Resolved strategy
    pub strategy: WorkflowStrategy,
}

/// Mutable state of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Run identifier.
    pub run_id: String,
    /// Configuration the run was started with.
    pub config: RunConfig,
    /// Strategy the adapter resolved from the configuration.
    pub strategy: WorkflowStrategy,
    /// Current status.
    pub status: RunStatus,
    /// Current round (zero-based).
    pub round: u32,
    /// Current step within the round (zero-based).
    pub step: u32,
    /// Turns executed so far.
    pub turns: u32,
    /// Agent whose turn is in progress or last ran.
    pub active_agent: Option<String>,
    /// Append-only conversation history, seeded with the initial message.
    pub history: Vec<Message>,
    /// Current context sets.
    pub context_sets: Vec<ContextSet>,
    /// Rolling summary of the history.
    pub summary: Option<String>,
    /// Error that stopped the run.
    pub error: Option<String>,
    /// Request a suspended run is waiting on.
    pub pending: Option<PendingRequest>,
    /// Message for the next step.
    pub next_input: String,
    /// Routing target for the next step of a dynamic run.
    pub next_agent: Option<String>,
    /// Agent order of the current round.
    #[serde(default)]
    pub round_order: Vec<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Last time the state changed.
    pub updated_at: DateTime<Utc>,
}

impl RunState {
    /// Build the initial state for `config`.
    pub fn new(config: RunConfig, strategy: WorkflowStrategy) -> Self {
        let now = Utc::now();
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            strategy,
            status: RunStatus::Initializing,
            round: 0,
            step: 0,
            turns: 0,
            active_agent: None,
            history: vec![Message::user(config.initial_message.clone())],
            context_sets: config.context_sets.clone(),
            summary: None,
            error: None,
            pending: None,
            next_input: config.initial_message.clone(),
            next_agent: None,
            round_order: Vec::new(),
            started_at: now,
            updated_at: now,
            config,
        }
    }

    /// Move to `to`, enforcing the run state machine.
    ///
    /// # Errors
    /// Returns `InvalidTransition` if the state machine forbids the change.
    pub fn transition(&mut self, to: RunStatus) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(OrchestrationError::InvalidTransition { from: self.status, to });
        }
        if self.status != to {
            debug!(run_id = %self.run_id, from = %self.status, to = %to, "Run status transition");
        }
        self.status = to;
        self.touch();
        Ok(())
    }

    /// Stop the run with `error`, keeping history and context intact.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        // Terminal statuses cannot move; an already-terminal run keeps its status.
        if self.status.can_transition_to(RunStatus::Error) {
            self.status = RunStatus::Error;
        }
        self.touch();
    }

    /// Append to the history.
    pub fn record(&mut self, message: Message) {
        self.history.push(message);
        self.touch();
    }

    /// Merge a turn's context update into the collection.
    pub fn apply_context_update(&mut self, update: &ContextUpdate) -> MergeReport {
        let report = merge_context_sets(&mut self.context_sets, update);
        if report.changed() {
            self.touch();
        }
        report
    }

    /// Move the round counter forward; it never goes back.
    pub fn enter_round(&mut self, round: u32) {
        if round > self.round {
            self.round = round;
            self.step = 0;
        }
        self.touch();
    }

    /// Move the step counter forward; it never goes back within a round.
    pub fn enter_step(&mut self, step: u32) {
        self.step = self.step.max(step);
        self.touch();
    }

    /// Read-only view of the run handed to turns.
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            run_id: self.run_id.clone(),
            status: self.status,
            round: self.round,
            step: self.step,
            turns: self.turns,
            max_rounds: self.config.effective_rounds(),
            summary: self.summary.clone(),
            team_name: self.config.team_name.clone(),
            objective: self.config.objective.clone(),
            strategy: self.strategy,
        }
    }

    /// Latest response recorded by an agent.
    pub fn last_agent_response(&self) -> Option<&Message> {
        self.history.iter().rev().find(|message| message.role == ChatRole::Assistant)
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    /// Returns a JSON error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    /// Returns a JSON error if the payload is not a run state.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentDescriptor, AgentRole};
    use crate::context::ContextEdit;

    fn state() -> RunState {
        let config = RunConfig::new(
            "sequential",
            "Write the brief",
            vec![AgentDescriptor::new("writer", AgentRole::Generalist)],
        )
        .with_context_set(ContextSet::new("brief", "v1"));
        RunState::new(config, WorkflowStrategy::Sequential)
    }

    #[test]
    fn test_new_state_seeds_history() {
        let state = state();
        assert_eq!(state.status, RunStatus::Initializing);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].role, ChatRole::User);
        assert_eq!(state.history[0].content, "Write the brief");
        assert_eq!(state.next_input, "Write the brief");
        assert_eq!(state.context_sets.len(), 1);
    }

    #[test]
    fn test_transition_enforces_state_machine() {
        let mut state = state();
        state.transition(RunStatus::Running).unwrap();
        state.transition(RunStatus::Completed).unwrap();
        let err = state.transition(RunStatus::Running).unwrap_err();
        assert!(matches!(
            err,
            OrchestrationError::InvalidTransition { from: RunStatus::Completed, to: RunStatus::Running }
        ));
    }

    #[test]
    fn test_fail_keeps_partial_state() {
        let mut state = state();
        state.transition(RunStatus::Running).unwrap();
        state.record(Message::agent("writer", "draft"));
        state.fail("model unavailable");
        assert_eq!(state.status, RunStatus::Error);
        assert_eq!(state.error.as_deref(), Some("model unavailable"));
        assert_eq!(state.history.len(), 2);
    }

    #[test]
    fn test_counters_never_go_back() {
        let mut state = state();
        state.enter_round(2);
        state.enter_step(3);
        state.enter_step(1);
        assert_eq!(state.step, 3);
        state.enter_round(1);
        assert_eq!(state.round, 2);
        state.enter_round(3);
        assert_eq!((state.round, state.step), (3, 0));
    }

    #[test]
    fn test_apply_context_update() {
        let mut state = state();
        let update = ContextUpdate { new_sets: vec![], edits: vec![ContextEdit::new("brief", "v2")] };
        assert!(state.apply_context_update(&update).changed());
        assert_eq!(state.context_sets[0].text, "v2");
    }

    #[test]
    fn test_json_round_trip_preserves_pending_request() {
        let mut state = state();
        state.pending = Some(PendingRequest {
            agent: "writer".to_string(),
            message: "Need the search key".to_string(),
            kind: PendingKind::Credential { name: "search_api_key".to_string() },
        });
        state.record(Message::agent("writer", "draft").with_directives(Directives {
            recipient: Some("user".to_string()),
            ..Directives::default()
        }));

        let json = state.to_json().unwrap();
        assert!(json.contains("\"kind\": \"credential\""));
        let restored = RunState::from_json(&json).unwrap();
        assert_eq!(restored.run_id, state.run_id);
        assert_eq!(restored.pending, state.pending);
        assert_eq!(restored.history, state.history);
    }

    #[test]
    fn test_last_agent_response() {
        let mut state = state();
        assert!(state.last_agent_response().is_none());
        state.record(Message::agent("writer", "first"));
        state.record(Message::system("note", None));
        assert_eq!(state.last_agent_response().map(|m| m.content.as_str()), Some("first"));
    }
}
