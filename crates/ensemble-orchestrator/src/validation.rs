// Response validation
//
// When a run carries acceptance criteria, every response is checked by a
// TurnValidator. A rejection comes back with feedback the agent is retried
// with.

use async_trait::async_trait;
use ensemble_abstraction::{ChatMessage, Model, ModelParameters};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{OrchestrationError, Result};

/// Validator verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the response meets the criteria
    pub passed: bool,
    /// What to fix when it does not
    #[serde(default)]
    pub feedback: String,
}

impl Verdict {
    /// Accepting verdict
    pub fn pass() -> Self {
        Self { passed: true, feedback: String::new() }
    }

    /// Rejecting verdict with feedback
    pub fn fail(feedback: impl Into<String>) -> Self {
        Self { passed: false, feedback: feedback.into() }
    }
}

/// Checks responses against acceptance criteria
#[async_trait]
pub trait TurnValidator: Send + Sync {
    /// Judge `response`, produced for `task`, against `criteria`
    ///
    /// # Errors
    /// Returns an error if the validator itself fails
    async fn validate(&self, criteria: &str, task: &str, response: &str) -> Result<Verdict>;
}

/// Validator that asks a model for a JSON verdict
pub struct ModelValidator {
    model: Arc<dyn Model>,
}

impl ModelValidator {
    /// Create a validator backed by `model`
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl TurnValidator for ModelValidator {
    async fn validate(&self, criteria: &str, task: &str, response: &str) -> Result<Verdict> {
        let messages = vec![
            ChatMessage::system(
                "You review responses against acceptance criteria. Reply ONLY with \
                 {\"passed\": true|false, \"feedback\": \"what to fix\"}.",
            ),
            ChatMessage::user(format!(
                "Criteria:\n{}\n\nTask:\n{}\n\nResponse:\n{}",
                criteria, task, response
            )),
        ];
        let parameters = ModelParameters { temperature: Some(0.0), ..Default::default() };
        let reply = self.model.generate_chat_completion(&messages, Some(parameters)).await?;

        let content = reply.content.trim();
        let json = match (content.find('{'), content.rfind('}')) {
            (Some(start), Some(end)) if start < end => &content[start..=end],
            _ => content,
        };
        serde_json::from_str(json)
            .map_err(|e| OrchestrationError::Other(format!("validator reply is not a verdict: {}", e)))
    }
}
