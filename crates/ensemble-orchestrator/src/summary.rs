//! Rolling history summaries.
//!
//! Between rounds the driver may condense the conversation so far into a
//! short summary that later briefings carry. Failures here never stop a run.

use async_trait::async_trait;
use ensemble_abstraction::{ChatMessage, ChatRole, Model, ModelParameters};
use std::fmt::Write;
use std::sync::Arc;

use crate::context::ContextSet;
use crate::error::{OrchestrationError, Result};
use crate::state::Message;

/// Condenses a run's history into a summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `history` for a run that started from `initial_message`.
    ///
    /// # Errors
    /// Returns an error if the summary cannot be produced.
    async fn summarize(
        &self,
        history: &[Message],
        initial_message: &str,
        context_sets: &[ContextSet],
    ) -> Result<String>;
}

/// Summarizer backed by a chat model.
pub struct ModelSummarizer {
    model: Arc<dyn Model>,
    max_tokens: u32,
}

impl ModelSummarizer {
    /// Creates a summarizer backed by `model`.
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { model, max_tokens: 512 }
    }

    /// Caps the summary length.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn transcript(history: &[Message]) -> String {
        let mut transcript = String::new();
        for message in history.iter().filter(|m| m.role != ChatRole::System) {
            let speaker = message.agent.as_deref().unwrap_or("user");
            let _ = writeln!(transcript, "{}: {}", speaker, message.content.trim());
        }
        transcript
    }
}

#[async_trait]
impl Summarizer for ModelSummarizer {
    async fn summarize(
        &self,
        history: &[Message],
        initial_message: &str,
        context_sets: &[ContextSet],
    ) -> Result<String> {
        let mut prompt = format!("Original request:\n{}\n\nConversation:\n{}", initial_message, Self::transcript(history));
        if !context_sets.is_empty() {
            let names: Vec<_> = context_sets.iter().map(|set| set.name.as_str()).collect();
            let _ = write!(prompt, "\nShared context sets: {}", names.join(", "));
        }

        let messages = vec![
            ChatMessage::system(
                "Summarize the conversation so far in a few sentences. Keep decisions, open \
                 questions and who is responsible for what.",
            ),
            ChatMessage::user(prompt),
        ];
        let parameters =
            ModelParameters { temperature: Some(0.2), max_tokens: Some(self.max_tokens), ..Default::default() };
        let response = self.model.generate_chat_completion(&messages, Some(parameters)).await?;

        let summary = response.content.trim();
        if summary.is_empty() {
            return Err(OrchestrationError::Other("summarizer returned an empty summary".to_string()));
        }
        Ok(summary.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_abstraction::{ModelError, ModelResponse};
    use std::sync::Mutex;

    struct Capture {
        reply: &'static str,
        prompt: Mutex<String>,
    }

    #[async_trait]
    impl Model for Capture {
        async fn generate_chat_completion(
            &self,
            messages: &[ChatMessage],
            _parameters: Option<ModelParameters>,
        ) -> std::result::Result<ModelResponse, ModelError> {
            *self.prompt.lock().unwrap() = messages[1].content.clone();
            Ok(ModelResponse::text(self.reply))
        }

        fn model_id(&self) -> &str {
            "capture"
        }
    }

    #[tokio::test]
    async fn test_summary_includes_transcript() {
        let model = Arc::new(Capture { reply: " Writer drafted. ", prompt: Mutex::new(String::new()) });
        let summarizer = ModelSummarizer::new(model.clone());
        let history = vec![
            Message::user("Plan it"),
            Message::agent("writer", "Draft v1"),
            Message::system("ignored", None),
        ];

        let summary = summarizer.summarize(&history, "Plan it", &[ContextSet::new("brief", "x")]).await.unwrap();
        assert_eq!(summary, "Writer drafted.");

        let prompt = model.prompt.lock().unwrap();
        assert!(prompt.contains("user: Plan it"));
        assert!(prompt.contains("writer: Draft v1"));
        assert!(!prompt.contains("ignored"));
        assert!(prompt.contains("Shared context sets: brief"));
    }

    #[tokio::test]
    async fn test_empty_summary_is_an_error() {
        let model = Arc::new(Capture { reply: "  ", prompt: Mutex::new(String::new()) });
        assert!(ModelSummarizer::new(model).summarize(&[], "x", &[]).await.is_err());
    }
}
