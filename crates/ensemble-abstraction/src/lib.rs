//! Model abstraction layer for Ensemble.
//!
//! This crate defines the types and the trait the orchestration core uses to
//! reach a reasoning model. Concrete provider clients live outside the
//! workspace; the core only ever sees `dyn Model`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Represents an error that can occur when interacting with an AI model.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelError {
    /// The request could not be delivered (network issues, invalid request).
    #[error("Request Error: {0}")]
    RequestError(String),

    /// The model answered with an error (invalid input, refusal).
    #[error("Model Response Error: {0}")]
    ModelResponseError(String),

    /// The model output could not be serialized or deserialized.
    #[error("Serialization Error: {0}")]
    SerializationError(String),

    /// The binding names a provider nobody configured.
    #[error("Unsupported Model Provider: {0}")]
    UnsupportedModelProvider(String),

    /// The provider needs a credential that is not available.
    #[error("Missing credential '{0}'")]
    MissingCredential(String),

    /// Provider quota exceeded or rate limit hit.
    #[error("Provider '{provider}' quota exceeded{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
    QuotaExceeded {
        /// The provider name (e.g., "openai", "gemini").
        provider: String,
        /// Optional error message from the provider.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Other unexpected errors.
    #[error("Other Model Error: {0}")]
    Other(String),
}

impl ModelError {
    /// Returns `true` when retrying the same request cannot succeed.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedModelProvider(_) | Self::MissingCredential(_) | Self::QuotaExceeded { .. }
        )
    }
}

/// Role of a chat message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions framing the conversation.
    System,
    /// Input addressed to the model.
    User,
    /// Output previously produced by the model.
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Represents a message in a conversation with a chat model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender.
    pub role: ChatRole,
    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// Parameters for controlling the model's generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Sampling temperature, between 0 and 2.
    pub temperature: Option<f32>,

    /// The maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// JSON schema the response must conform to, for providers with
    /// structured output support.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,

    /// Whether the caller prefers a streamed response.
    #[serde(default)]
    pub stream: bool,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self { temperature: Some(0.7), max_tokens: Some(2048), response_schema: None, stream: false }
    }
}

/// The response from a chat completion model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The generated content.
    pub content: String,

    /// Optional: The ID of the model used to generate the response.
    pub model_id: Option<String>,

    /// Optional: Usage statistics for the request.
    pub usage: Option<ModelUsage>,
}

impl ModelResponse {
    /// Creates a response carrying only text.
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), model_id: None, usage: None }
    }
}

/// Usage statistics for a model request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelUsage {
    /// Number of tokens in the prompt.
    pub prompt_tokens: u32,

    /// Number of tokens in the completion.
    pub completion_tokens: u32,

    /// Total number of tokens used.
    pub total_tokens: u32,
}

/// A trait for interacting with different AI models.
///
/// All models must be `Send + Sync` so a single instance can serve every
/// agent of a run.
#[async_trait]
pub trait Model: Send + Sync {
    /// Generates a chat completion based on the given conversation.
    ///
    /// # Arguments
    /// * `messages` - The conversation, system message first
    /// * `parameters` - Optional parameters to control generation
    ///
    /// # Errors
    /// Returns a `ModelError` if generation fails.
    async fn generate_chat_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError>;

    /// Returns the ID of the model.
    fn model_id(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModel;

    #[async_trait]
    impl Model for FixedModel {
        async fn generate_chat_completion(
            &self,
            messages: &[ChatMessage],
            _parameters: Option<ModelParameters>,
        ) -> Result<ModelResponse, ModelError> {
            Ok(ModelResponse::text(format!("{} messages", messages.len())))
        }

        fn model_id(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_quota_exceeded_display() {
        let with_message = ModelError::QuotaExceeded {
            provider: "openai".to_string(),
            message: Some("try later".to_string()),
        };
        assert_eq!(with_message.to_string(), "Provider 'openai' quota exceeded: try later");

        let bare = ModelError::QuotaExceeded { provider: "gemini".to_string(), message: None };
        assert_eq!(bare.to_string(), "Provider 'gemini' quota exceeded");
    }

    #[test]
    fn test_permanent_errors() {
        assert!(ModelError::MissingCredential("openai_key".to_string()).is_permanent());
        assert!(!ModelError::RequestError("timeout".to_string()).is_permanent());
    }

    #[test]
    fn test_chat_role_serialization() {
        let message = ChatMessage::assistant("hi");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(ChatRole::System.to_string(), "system");
    }

    #[tokio::test]
    async fn test_model_trait_object() {
        let model: Box<dyn Model> = Box::new(FixedModel);
        let response = model
            .generate_chat_completion(&[ChatMessage::system("s"), ChatMessage::user("u")], None)
            .await
            .unwrap();
        assert_eq!(response.content, "2 messages");
        assert_eq!(model.model_id(), "fixed");
    }
}
