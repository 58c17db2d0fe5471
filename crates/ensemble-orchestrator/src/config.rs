// Run configuration
//
// The immutable description of a run: who is on the team, what they are
// asked to do, how they take turns, and the engine knobs that apply to every
// run. Both load from TOML with an optional [team] / [engine] section.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::context::ContextSet;
use crate::error::{OrchestrationError, Result};

/// Canonical workflow strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStrategy {
    /// Agents in configured order every round.
    Sequential,
    /// Agents in reverse configured order every round.
    Reverse,
    /// Agents reshuffled at the start of every round.
    Random,
    /// Each decision names the next agent.
    LlmRouted,
    /// A manager agent opens the run; every decision must name the next agent.
    ManagerDirected,
}

impl WorkflowStrategy {
    /// All strategies, in the order they are documented.
    pub const ALL: [Self; 5] =
        [Self::Sequential, Self::Reverse, Self::Random, Self::LlmRouted, Self::ManagerDirected];

    /// Returns `true` for strategies where decisions choose the next agent.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::LlmRouted | Self::ManagerDirected)
    }
}

impl fmt::Display for WorkflowStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Reverse => write!(f, "reverse"),
            Self::Random => write!(f, "random"),
            Self::LlmRouted => write!(f, "llm_routed"),
            Self::ManagerDirected => write!(f, "manager_directed"),
        }
    }
}

/// Ordering hint that refines a fixed-order strategy identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentOrdering {
    /// Configured order.
    Forward,
    /// Reverse configured order.
    Reverse,
    /// Shuffled order.
    Random,
}

/// Role category of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Directs other agents and triages failures.
    Manager,
    /// General purpose agent.
    Generalist,
    /// Research-focused agent.
    Researcher,
    /// Agent that mainly works through tools.
    ToolUser,
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manager => write!(f, "manager"),
            Self::Generalist => write!(f, "generalist"),
            Self::Researcher => write!(f, "researcher"),
            Self::ToolUser => write!(f, "tool_user"),
        }
    }
}

/// Model an agent reasons with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelBinding {
    /// Provider name (e.g., "openai", "gemini")
    pub provider: String,
    /// Provider-specific model ID
    pub model: String,
}

impl Default for ModelBinding {
    fn default() -> Self {
        Self { provider: "default".to_string(), model: "default".to_string() }
    }
}

/// One member of the team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Unique name, used for attribution, routing and visibility lists
    pub name: String,
    /// Role category
    pub role: AgentRole,
    /// Model binding
    #[serde(default)]
    pub model: ModelBinding,
    /// Tool names resolved for this agent on every turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    /// Peers this agent may address; `None` means any peer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_peers: Option<Vec<String>>,
    /// Free-form instructions folded into the briefing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl AgentDescriptor {
    /// Create a descriptor with the default model binding
    pub fn new(name: impl Into<String>, role: AgentRole) -> Self {
        Self {
            name: name.into(),
            role,
            model: ModelBinding::default(),
            tools: Vec::new(),
            allowed_peers: None,
            instructions: None,
        }
    }

    /// Set the model binding
    #[must_use]
    pub fn with_model(mut self, provider: impl Into<String>, model: impl Into<String>) -> Self {
        self.model = ModelBinding { provider: provider.into(), model: model.into() };
        self
    }

    /// Add a tool name
    #[must_use]
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tools.push(tool.into());
        self
    }

    /// Restrict the peers this agent may route to
    #[must_use]
    pub fn with_allowed_peers<I, S>(mut self, peers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_peers = Some(peers.into_iter().map(Into::into).collect());
        self
    }

    /// Set briefing instructions
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Whether this agent may address `peer`
    pub fn may_address(&self, peer: &str) -> bool {
        self.allowed_peers.as_ref().is_none_or(|peers| peers.iter().any(|p| p == peer))
    }
}

fn default_max_rounds() -> u32 {
    3
}

/// Immutable run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Strategy identifier, canonical or legacy
    pub strategy: String,
    /// Message handed to the first agent
    pub initial_message: String,
    /// Team members in configured order
    pub agents: Vec<AgentDescriptor>,
    /// Team name
    #[serde(default)]
    pub team_name: String,
    /// Objective shared by the team
    #[serde(default)]
    pub objective: String,
    /// Owner of the run (used for credentials and snapshots)
    #[serde(default)]
    pub owner_id: String,
    /// Context sets available when the run starts
    #[serde(default)]
    pub context_sets: Vec<ContextSet>,
    /// Maximum number of rounds
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    /// Round count that replaces `max_rounds` when greater than zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounds_override: Option<u32>,
    /// Subset of agent names taking part; configured order is kept
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_agents: Option<Vec<String>>,
    /// Whether the caller prefers streamed model output
    #[serde(default)]
    pub stream: bool,
    /// Ordering hint combined with the strategy identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_ordering: Option<AgentOrdering>,
    /// Hand failed turns to a manager instead of aborting
    #[serde(default)]
    pub escalate_errors_to_manager: bool,
    /// Criteria every response is validated against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<String>,
    /// Seed for the random-order driver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
}

impl RunConfig {
    /// Create a configuration with defaults for everything but the essentials
    pub fn new(
        strategy: impl Into<String>,
        initial_message: impl Into<String>,
        agents: Vec<AgentDescriptor>,
    ) -> Self {
        Self {
            strategy: strategy.into(),
            initial_message: initial_message.into(),
            agents,
            team_name: String::new(),
            objective: String::new(),
            owner_id: String::new(),
            context_sets: Vec::new(),
            max_rounds: default_max_rounds(),
            rounds_override: None,
            custom_agents: None,
            stream: false,
            agent_ordering: None,
            escalate_errors_to_manager: false,
            acceptance_criteria: None,
            random_seed: None,
        }
    }

    /// Set team name and objective
    #[must_use]
    pub fn with_team(mut self, team_name: impl Into<String>, objective: impl Into<String>) -> Self {
        self.team_name = team_name.into();
        self.objective = objective.into();
        self
    }

    /// Set the owner identifier
    #[must_use]
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = owner_id.into();
        self
    }

    /// Set maximum rounds
    #[must_use]
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Set the round override
    #[must_use]
    pub fn with_rounds_override(mut self, rounds: u32) -> Self {
        self.rounds_override = Some(rounds);
        self
    }

    /// Add an initial context set
    #[must_use]
    pub fn with_context_set(mut self, set: ContextSet) -> Self {
        self.context_sets.push(set);
        self
    }

    /// Restrict the run to a subset of agents
    #[must_use]
    pub fn with_custom_agents<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_agents = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set the ordering hint
    #[must_use]
    pub fn with_ordering(mut self, ordering: AgentOrdering) -> Self {
        self.agent_ordering = Some(ordering);
        self
    }

    /// Escalate turn errors to the manager
    #[must_use]
    pub fn with_escalation(mut self, escalate: bool) -> Self {
        self.escalate_errors_to_manager = escalate;
        self
    }

    /// Validate every response against `criteria`
    #[must_use]
    pub fn with_acceptance_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.acceptance_criteria = Some(criteria.into());
        self
    }

    /// Seed the random-order driver
    #[must_use]
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Set the streaming preference
    #[must_use]
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Round budget: the override when positive, otherwise `max_rounds`
    pub fn effective_rounds(&self) -> u32 {
        match self.rounds_override {
            Some(rounds) if rounds > 0 => rounds,
            _ => self.max_rounds,
        }
    }

    /// Agents taking part in the run, in configured order
    pub fn effective_agents(&self) -> Vec<AgentDescriptor> {
        match &self.custom_agents {
            Some(names) if !names.is_empty() => self
                .agents
                .iter()
                .filter(|agent| names.iter().any(|name| name == &agent.name))
                .cloned()
                .collect(),
            _ => self.agents.clone(),
        }
    }

    /// First manager-role agent taking part in the run
    pub fn manager(&self) -> Option<AgentDescriptor> {
        self.effective_agents().into_iter().find(|agent| agent.role == AgentRole::Manager)
    }

    /// Check the configuration can produce a valid run
    ///
    /// # Errors
    /// Returns `InvalidConfig` describing the first problem found
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for agent in &self.agents {
            if agent.name.trim().is_empty() {
                return Err(OrchestrationError::InvalidConfig(
                    "agent names must not be empty".to_string(),
                ));
            }
            if !names.insert(agent.name.as_str()) {
                return Err(OrchestrationError::InvalidConfig(format!(
                    "duplicate agent name '{}'",
                    agent.name
                )));
            }
        }

        if let Some(custom) = &self.custom_agents {
            if let Some(missing) = custom.iter().find(|name| !names.contains(name.as_str())) {
                return Err(OrchestrationError::InvalidConfig(format!(
                    "custom agent '{}' is not on the team",
                    missing
                )));
            }
        }

        if self.effective_agents().is_empty() {
            return Err(OrchestrationError::InvalidConfig("the team has no agents".to_string()));
        }

        let mut set_names = HashSet::new();
        for set in &self.context_sets {
            if !set_names.insert(set.name.as_str()) {
                return Err(OrchestrationError::InvalidConfig(format!(
                    "duplicate context set '{}'",
                    set.name
                )));
            }
        }

        if self.effective_rounds() == 0 {
            return Err(OrchestrationError::InvalidConfig(
                "max_rounds must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from TOML string
    ///
    /// Accepts either a document with a `[team]` section or a bare config.
    ///
    /// # Errors
    /// Returns error if TOML cannot be parsed
    pub fn from_toml_str(toml_content: &str) -> Result<Self> {
        let value: toml::Value = toml::from_str(toml_content)?;
        let section = value.get("team").cloned().unwrap_or(value);
        Ok(section.try_into()?)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load_from_toml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }
}

fn default_turn_timeout() -> u64 {
    120
}

fn default_validation_retries() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

/// Engine settings shared by every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Upper bound for one reasoning call, in seconds
    #[serde(default = "default_turn_timeout")]
    pub turn_timeout_seconds: u64,
    /// How many times a rejected response is retried with feedback
    #[serde(default = "default_validation_retries")]
    pub max_validation_retries: u32,
    /// Refresh the rolling summary at the start of every round after the first
    #[serde(default = "default_true")]
    pub summarize_between_rounds: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            turn_timeout_seconds: default_turn_timeout(),
            max_validation_retries: default_validation_retries(),
            summarize_between_rounds: true,
        }
    }
}

impl EngineSettings {
    /// Load settings from a TOML string, reading the `[engine]` section when present
    ///
    /// # Errors
    /// Returns error if TOML cannot be parsed
    pub fn from_toml_str(toml_content: &str) -> Result<Self> {
        let value: toml::Value = toml::from_str(toml_content)?;
        match value.get("engine") {
            Some(section) => Ok(section.clone().try_into()?),
            None => Ok(Self::default()),
        }
    }
}
