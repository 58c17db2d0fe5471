// Turn executor
//
// Runs one agent turn end to end: resolve tools, brief the agent, shape the
// history into chat turns, call the reasoning provider under a timeout,
// enforce the decision contract, validate, and classify the outcome.
// The executor never returns an error; every failure becomes a TurnOutcome.

use ensemble_abstraction::{ChatMessage, ChatRole};
use std::sync::Arc;
use tokio::time::{Duration, timeout};
use tracing::{debug, warn};

use crate::reasoning::{ProviderHints, ReasoningProvider, ReasoningRequest};
use crate::state::Message;
use crate::tool::{NoTools, ToolRequest, ToolResolutionError, ToolResolver};
use crate::turn::{
    BriefingBuilder, DecisionContract, DefaultBriefing, Recipient, RoutingMode, TurnDecision, TurnInput,
    TurnOutcome, TurnResult,
};
use crate::validation::TurnValidator;

/// Executes single agent turns
#[derive(Clone)]
pub struct TurnExecutor {
    reasoner: Arc<dyn ReasoningProvider>,
    tools: Arc<dyn ToolResolver>,
    briefing: Arc<dyn BriefingBuilder>,
    validator: Option<Arc<dyn TurnValidator>>,
    turn_timeout: Duration,
}

impl TurnExecutor {
    /// Create an executor with no tools, the default briefing and a 120s timeout
    pub fn new(reasoner: Arc<dyn ReasoningProvider>) -> Self {
        Self {
            reasoner,
            tools: Arc::new(NoTools),
            briefing: Arc::new(DefaultBriefing),
            validator: None,
            turn_timeout: Duration::from_secs(120),
        }
    }

    /// Set the tool resolver
    #[must_use]
    pub fn with_tools(mut self, tools: Arc<dyn ToolResolver>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the briefing builder
    #[must_use]
    pub fn with_briefing(mut self, briefing: Arc<dyn BriefingBuilder>) -> Self {
        self.briefing = briefing;
        self
    }

    /// Set the validator used when a run has acceptance criteria
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn TurnValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Set the per-turn timeout
    #[must_use]
    pub fn with_turn_timeout(mut self, turn_timeout: Duration) -> Self {
        self.turn_timeout = turn_timeout;
        self
    }

    /// Run one turn for `input.agent`
    pub async fn run(&self, input: &TurnInput, routing: RoutingMode) -> TurnResult {
        let agent = input.agent.name.clone();

        let tool_request = ToolRequest {
            agent: &input.agent,
            owner_id: &input.owner_id,
            context_sets: &input.context_sets,
            history: &input.history,
            objective: &input.snapshot.objective,
        };
        let tools = match self.tools.resolve(&tool_request).await {
            Ok(tools) => tools,
            Err(ToolResolutionError::MissingCredential(credential)) => {
                warn!(agent = %agent, credential = %credential, "Turn needs a missing credential");
                let message = format!("Agent '{}' needs the credential '{}' to continue", agent, credential);
                return TurnResult::new(agent, TurnOutcome::AwaitingCredential { credential, message });
            }
            Err(e) => {
                return TurnResult::failed(&agent, format!("Agent '{}' could not load its tools: {}", agent, e));
            }
        };

        let contract = match routing {
            RoutingMode::None => DecisionContract::unrouted(),
            mode => DecisionContract::routed(mode, input.peers()),
        };

        let request = ReasoningRequest {
            agent: agent.clone(),
            task: input.message.clone(),
            briefing: self.briefing.build(input, &contract),
            turns: conversation_turns(&input.history, &agent, &input.message),
            contract,
            tools,
            hints: ProviderHints { model: input.agent.model.clone(), stream: input.stream },
        };

        debug!(
            agent = %agent,
            provider = self.reasoner.provider_name(),
            turns = request.turns.len(),
            "Executing turn"
        );
        let decision = match timeout(self.turn_timeout, self.reasoner.decide(&request)).await {
            Ok(Ok(decision)) => decision,
            Ok(Err(e)) => {
                warn!(agent = %agent, error = %e, "Reasoning call failed");
                return TurnResult::failed(&agent, format!("Agent '{}' failed: {}", agent, e));
            }
            Err(_) => {
                warn!(agent = %agent, timeout_secs = self.turn_timeout.as_secs(), "Reasoning call timed out");
                return TurnResult::failed(
                    &agent,
                    format!("Agent '{}' timed out after {} seconds", agent, self.turn_timeout.as_secs()),
                );
            }
        };

        if let Err(e) = request.contract.enforce(&decision) {
            return TurnResult::failed(&agent, format!("Agent '{}' returned an invalid decision: {}", agent, e));
        }

        let context_update = decision.context_update();

        let mut validated = false;
        if let (Some(criteria), Some(validator)) = (&input.acceptance_criteria, &self.validator) {
            match validator.validate(criteria, &input.message, &decision.response).await {
                Ok(verdict) if verdict.passed => validated = true,
                Ok(verdict) => {
                    debug!(agent = %agent, feedback = %verdict.feedback, "Response rejected by validator");
                    return TurnResult::new(
                        agent,
                        TurnOutcome::ValidationFailed { response: decision.response, feedback: verdict.feedback },
                    );
                }
                Err(e) => warn!(agent = %agent, error = %e, "Validator failed, response left unvalidated"),
            }
        }

        TurnResult { agent, outcome: classify(decision, routing), context_update, validated }
    }
}

/// Map a decision that passed the contract onto an outcome
fn classify(decision: TurnDecision, routing: RoutingMode) -> TurnOutcome {
    if decision.is_user_input_request {
        return TurnOutcome::AwaitingUser { response: decision.response };
    }
    if decision.workflow_complete {
        return TurnOutcome::Completed { response: decision.response, workflow_complete: true };
    }
    if routing != RoutingMode::None {
        match decision.recipient() {
            Some(Recipient::User) => return TurnOutcome::AwaitingUser { response: decision.response },
            Some(Recipient::Agent(recipient)) => {
                return TurnOutcome::Routed { response: decision.response, recipient };
            }
            None => {}
        }
    }
    TurnOutcome::Completed { response: decision.response, workflow_complete: false }
}

/// Shape the history into alternating chat turns for `agent`
///
/// System notices and empty messages are dropped. The agent's own responses
/// become assistant turns; everything else becomes a user turn prefixed with
/// its speaker. Consecutive turns with the same role are merged, and the task
/// message closes the list unless it is already the last user turn.
pub(crate) fn conversation_turns(history: &[Message], agent: &str, task: &str) -> Vec<ChatMessage> {
    let mut turns: Vec<ChatMessage> = Vec::new();
    let mut last_content: Option<&str> = None;

    for message in history {
        let content = message.content.trim();
        if message.role == ChatRole::System || content.is_empty() {
            continue;
        }
        let own = message.role == ChatRole::Assistant && message.agent.as_deref() == Some(agent);
        let turn = if own {
            ChatMessage::assistant(content)
        } else {
            let speaker = message.agent.as_deref().unwrap_or("user");
            ChatMessage::user(format!("[{}]: {}", speaker, content))
        };
        push_coalesced(&mut turns, turn);
        last_content = Some(content);
    }

    let task = task.trim();
    let task_already_last =
        last_content == Some(task) && turns.last().is_some_and(|turn| turn.role == ChatRole::User);
    if !task.is_empty() && !task_already_last {
        push_coalesced(&mut turns, ChatMessage::user(task));
    }
    turns
}

fn push_coalesced(turns: &mut Vec<ChatMessage>, turn: ChatMessage) {
    match turns.last_mut() {
        Some(last) if last.role == turn.role => {
            last.content.push_str("\n\n");
            last.content.push_str(&turn.content);
        }
        _ => turns.push(turn),
    }
}
