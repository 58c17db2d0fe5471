// Reasoning providers
//
// A reasoning provider turns one prepared turn (briefing, chat turns,
// decision contract, tools) into a structured decision. PromptedReasoner is
// the reference implementation over any chat model: it renders the contract
// into the system prompt and parses the reply.

use async_trait::async_trait;
use ensemble_abstraction::{ChatMessage, Model, ModelParameters};
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use tracing::debug;

use crate::config::ModelBinding;
use crate::error::{OrchestrationError, Result};
use crate::tool::ToolSet;
use crate::turn::{DecisionContract, TurnDecision, parse_decision};

/// Provider-facing hints for one call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderHints {
    /// Model the agent is bound to
    pub model: ModelBinding,
    /// Whether the caller prefers streamed output
    pub stream: bool,
}

/// One prepared reasoning call
#[derive(Debug, Clone)]
pub struct ReasoningRequest {
    /// Acting agent
    pub agent: String,
    /// Task message the agent acts on
    pub task: String,
    /// System briefing
    pub briefing: String,
    /// Well-formed chat turns, ending with the task message
    pub turns: Vec<ChatMessage>,
    /// Shape the decision must take
    pub contract: DecisionContract,
    /// Tools resolved for the agent
    pub tools: ToolSet,
    /// Provider hints
    pub hints: ProviderHints,
}

/// Produces a structured decision for one agent turn
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Decide the agent's turn
    ///
    /// # Errors
    /// Returns an error if the call fails or its reply is not a decision
    async fn decide(&self, request: &ReasoningRequest) -> Result<TurnDecision>;

    /// Provider name for logs
    fn provider_name(&self) -> &'static str {
        "custom"
    }
}

/// Prompt-based provider over chat models
pub struct PromptedReasoner {
    default_model: Arc<dyn Model>,
    models: HashMap<String, Arc<dyn Model>>,
    temperature: f32,
}

impl PromptedReasoner {
    /// Create a provider that sends every agent to `model`
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { default_model: model, models: HashMap::new(), temperature: 0.7 }
    }

    /// Send agents bound to `provider` to `model`
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>, model: Arc<dyn Model>) -> Self {
        self.models.insert(provider.into(), model);
        self
    }

    /// Set the sampling temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn model_for(&self, binding: &ModelBinding) -> &Arc<dyn Model> {
        self.models.get(&binding.provider).unwrap_or(&self.default_model)
    }

    /// System prompt: briefing, tool list, output schema
    fn build_system_prompt(request: &ReasoningRequest) -> String {
        let mut prompt = request.briefing.trim_end().to_string();

        if !request.tools.is_empty() {
            prompt.push_str("\n\nAvailable tools:\n");
            for tool in request.tools.iter() {
                let _ = writeln!(prompt, "- {}: {}", tool.name, tool.description);
            }
        }

        let _ = write!(
            prompt,
            "\n\nRespond ONLY with a JSON object matching this schema:\n{}",
            serde_json::to_string_pretty(&request.contract.json_schema()).unwrap_or_default()
        );
        prompt
    }
}

#[async_trait]
impl ReasoningProvider for PromptedReasoner {
    async fn decide(&self, request: &ReasoningRequest) -> Result<TurnDecision> {
        let mut messages = Vec::with_capacity(request.turns.len() + 1);
        messages.push(ChatMessage::system(Self::build_system_prompt(request)));
        messages.extend(request.turns.iter().cloned());

        let parameters = ModelParameters {
            temperature: Some(self.temperature),
            response_schema: Some(request.contract.json_schema()),
            stream: request.hints.stream,
            ..Default::default()
        };

        let model = self.model_for(&request.hints.model);
        debug!(agent = %request.agent, model = %model.model_id(), turns = messages.len(), "Calling model");
        let response = model.generate_chat_completion(&messages, Some(parameters)).await?;
        parse_decision(&response.content).map_err(|e| match e {
            OrchestrationError::MalformedDecision(reason) => OrchestrationError::MalformedDecision(format!(
                "{} (model {})",
                reason,
                model.model_id()
            )),
            other => other,
        })
    }

    fn provider_name(&self) -> &'static str {
        "prompted"
    }
}
