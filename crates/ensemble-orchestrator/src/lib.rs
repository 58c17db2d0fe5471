//! Multi-agent workflow orchestration for Ensemble.
//!
//! A run hands a team of agents a shared conversation and drives them turn
//! by turn under a workflow strategy: fixed orders (sequential, reverse,
//! random) or dynamic routing where each decision names the next agent.
//! Runs can pause, be cancelled, and suspend while waiting for the user or a
//! missing credential; suspended state is plain serde data that can be
//! snapshotted and resumed later.

pub mod adapter;
pub mod config;
pub mod context;
pub mod control;
pub mod drivers;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod outcome;
pub mod reasoning;
pub mod snapshot;
pub mod state;
pub mod summary;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod tool;
pub mod turn;
pub mod validation;

pub use adapter::{DriverRegistry, Orchestrator, ResumeInput};
pub use config::{AgentDescriptor, AgentOrdering, AgentRole, EngineSettings, ModelBinding, RunConfig, WorkflowStrategy};
pub use context::{ContextEdit, ContextSet, ContextUpdate, MergeReport, merge_context_sets};
pub use control::{PauseExit, RunControl};
pub use drivers::{
    DriverContext, RandomDriver, ReverseDriver, RoutedDriver, SequentialDriver, WorkflowDriver, run_workflow,
};
pub use error::{OrchestrationError, Result};
pub use events::{EventSink, RunEvent};
pub use lifecycle::RunStatus;
pub use outcome::{AgentResponse, RunOutcome};
pub use reasoning::{PromptedReasoner, ProviderHints, ReasoningProvider, ReasoningRequest};
pub use snapshot::{FileSnapshotStore, SnapshotStore, read_snapshot_file, write_snapshot_file};
pub use state::{Directives, Message, PendingKind, PendingRequest, RunSnapshot, RunState};
pub use summary::{ModelSummarizer, Summarizer};
pub use tool::{
    CredentialLookup, NoTools, RegistryToolResolver, StaticCredentials, Tool, ToolArguments, ToolHandler,
    ToolRequest, ToolResolutionError, ToolResolver, ToolResult, ToolSet,
};
pub use turn::{
    BriefingBuilder, DecisionContract, DefaultBriefing, Recipient, RoutingMode, TurnDecision, TurnExecutor,
    TurnInput, TurnOutcome, TurnResult, TurnStatus, build_turn_input, parse_decision,
};
pub use validation::{ModelValidator, TurnValidator, Verdict};
