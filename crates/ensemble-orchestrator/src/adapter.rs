// Orchestrator entrypoint
//
// Resolves the configured strategy identifier (canonical or legacy) to a
// WorkflowStrategy, picks its driver from the registry, and runs or resumes
// the run with the shared collaborators.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::config::{AgentOrdering, EngineSettings, RunConfig, WorkflowStrategy};
use crate::control::RunControl;
use crate::drivers::{
    DriverContext, RandomDriver, ReverseDriver, RoutedDriver, SequentialDriver, WorkflowDriver, run_workflow,
};
use crate::error::{OrchestrationError, Result};
use crate::events::{EventSink, RunEvent};
use crate::lifecycle::RunStatus;
use crate::reasoning::ReasoningProvider;
use crate::state::{Message, RunState};
use crate::summary::Summarizer;
use crate::tool::ToolResolver;
use crate::turn::{BriefingBuilder, TurnExecutor};
use crate::validation::TurnValidator;

impl WorkflowStrategy {
    /// Resolve a strategy identifier, combined with an ordering hint
    ///
    /// Legacy identifiers map onto their canonical strategy. A `sequential`
    /// identifier with a reverse or random hint selects that ordering.
    /// Unknown identifiers fall back to sequential with a warning.
    pub fn resolve(identifier: &str, ordering: Option<AgentOrdering>) -> Self {
        let normalized = identifier.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "sequential" | "" => match ordering {
                Some(AgentOrdering::Reverse) => Self::Reverse,
                Some(AgentOrdering::Random) => Self::Random,
                Some(AgentOrdering::Forward) | None => Self::Sequential,
            },
            "reverse" | "sequential_reverse" => Self::Reverse,
            "random" => Self::Random,
            "llm_routed" | "dynamic" | "llm" => Self::LlmRouted,
            "manager_directed" | "managed" | "hierarchical" => Self::ManagerDirected,
            other => {
                warn!(strategy = %other, "Unknown workflow strategy, falling back to sequential");
                Self::Sequential
            }
        }
    }
}

/// Maps each strategy to the driver that runs it
#[derive(Clone)]
pub struct DriverRegistry {
    drivers: HashMap<WorkflowStrategy, Arc<dyn WorkflowDriver>>,
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::empty()
            .with_driver(Arc::new(SequentialDriver))
            .with_driver(Arc::new(ReverseDriver))
            .with_driver(Arc::new(RandomDriver))
            .with_driver(Arc::new(RoutedDriver::llm_routed()))
            .with_driver(Arc::new(RoutedDriver::manager_directed()))
    }
}

impl DriverRegistry {
    /// Registry with no drivers; every lookup falls back to sequential
    pub fn empty() -> Self {
        Self { drivers: HashMap::new() }
    }

    /// Register a driver under its strategy
    #[must_use]
    pub fn with_driver(mut self, driver: Arc<dyn WorkflowDriver>) -> Self {
        self.drivers.insert(driver.strategy(), driver);
        self
    }

    /// Driver for `strategy`, falling back to sequential
    pub fn get(&self, strategy: WorkflowStrategy) -> Arc<dyn WorkflowDriver> {
        if let Some(driver) = self.drivers.get(&strategy) {
            return Arc::clone(driver);
        }
        warn!(strategy = %strategy, "No driver registered, falling back to sequential");
        self.drivers
            .get(&WorkflowStrategy::Sequential)
            .map_or_else(|| Arc::new(SequentialDriver) as Arc<dyn WorkflowDriver>, Arc::clone)
    }

    /// Registered strategies
    pub fn strategies(&self) -> Vec<WorkflowStrategy> {
        WorkflowStrategy::ALL.into_iter().filter(|strategy| self.drivers.contains_key(strategy)).collect()
    }
}

/// What a suspended or paused run is resumed with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeInput {
    /// The user's answer to an information request
    Answer(String),
    /// The missing credential has been stored
    CredentialSupplied,
    /// Continue a paused run
    Continue,
}

impl ResumeInput {
    fn label(&self) -> &'static str {
        match self {
            Self::Answer(_) => "an answer",
            Self::CredentialSupplied => "a credential",
            Self::Continue => "a continue",
        }
    }
}

/// Runs and resumes multi-agent workflows
#[derive(Clone)]
pub struct Orchestrator {
    executor: TurnExecutor,
    registry: DriverRegistry,
    summarizer: Option<Arc<dyn Summarizer>>,
    settings: EngineSettings,
    events: EventSink,
}

impl Orchestrator {
    /// Create an orchestrator over `reasoner` with default settings and drivers
    pub fn new(reasoner: Arc<dyn ReasoningProvider>) -> Self {
        let settings = EngineSettings::default();
        Self {
            executor: TurnExecutor::new(reasoner)
                .with_turn_timeout(Duration::from_secs(settings.turn_timeout_seconds)),
            registry: DriverRegistry::default(),
            summarizer: None,
            settings,
            events: EventSink::disabled(),
        }
    }

    /// Apply engine settings
    #[must_use]
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.executor = self.executor.with_turn_timeout(Duration::from_secs(settings.turn_timeout_seconds));
        self.settings = settings;
        self
    }

    /// Set the tool resolver
    #[must_use]
    pub fn with_tools(mut self, tools: Arc<dyn ToolResolver>) -> Self {
        self.executor = self.executor.with_tools(tools);
        self
    }

    /// Set the briefing builder
    #[must_use]
    pub fn with_briefing(mut self, briefing: Arc<dyn BriefingBuilder>) -> Self {
        self.executor = self.executor.with_briefing(briefing);
        self
    }

    /// Set the validator used for runs with acceptance criteria
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn TurnValidator>) -> Self {
        self.executor = self.executor.with_validator(validator);
        self
    }

    /// Set the summarizer refreshed between rounds
    #[must_use]
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Replace the driver registry
    #[must_use]
    pub fn with_registry(mut self, registry: DriverRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Emit progress events on `tx`
    #[must_use]
    pub fn with_events(mut self, tx: broadcast::Sender<RunEvent>) -> Self {
        self.events = EventSink::new(tx);
        self
    }

    /// Engine settings in use
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Start a run
    ///
    /// Configuration problems are returned as errors and never start a run.
    /// Everything that goes wrong after the run starts is reported in the
    /// returned state (status `error` with the error string).
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the configuration does not validate
    pub async fn run(&self, config: RunConfig, control: RunControl) -> Result<RunState> {
        config.validate()?;
        let strategy = WorkflowStrategy::resolve(&config.strategy, config.agent_ordering);
        let mut state = RunState::new(config, strategy);
        info!(run_id = %state.run_id, strategy = %strategy, "Starting run");

        let driver = self.registry.get(strategy);
        run_workflow(driver.as_ref(), &mut state, &self.context(control)).await;
        Ok(state)
    }

    /// Resume a suspended or paused run
    ///
    /// An answer is appended to the history as a user message and becomes
    /// the next input; dynamic runs hand it back to the agent that asked. A
    /// supplied credential retries the same agent's turn.
    ///
    /// # Errors
    /// Returns `NotResumable` for runs that are not suspended or paused, and
    /// `ResumeMismatch` when the input does not answer what the run awaits
    pub async fn resume(&self, mut state: RunState, input: ResumeInput, control: RunControl) -> Result<RunState> {
        if !state.status.is_resumable() {
            return Err(OrchestrationError::NotResumable(state.status));
        }
        match (state.status, &input) {
            (RunStatus::AwaitingUser, ResumeInput::Answer(answer)) => {
                state.record(Message::user(answer.clone()));
                state.next_input.clone_from(answer);
            }
            (RunStatus::AwaitingCredential, ResumeInput::CredentialSupplied) | (RunStatus::Paused, ResumeInput::Continue) => {}
            (status, input) => {
                return Err(OrchestrationError::ResumeMismatch { status, input: input.label().to_string() });
            }
        }
        state.pending = None;
        state.transition(RunStatus::Running)?;
        info!(run_id = %state.run_id, input = input.label(), "Resuming run");

        let driver = self.registry.get(state.strategy);
        run_workflow(driver.as_ref(), &mut state, &self.context(control)).await;
        Ok(state)
    }

    fn context(&self, control: RunControl) -> DriverContext {
        DriverContext {
            executor: self.executor.clone(),
            summarizer: self.summarizer.clone(),
            settings: self.settings.clone(),
            control,
            events: self.events.clone(),
        }
    }
}
