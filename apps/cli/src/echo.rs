//! Offline echo model.
//!
//! Replies with a decision that acknowledges the latest message. When the
//! response schema requires a recipient, the first peer it allows is named,
//! so manager-directed teams keep handing over without a real model.

use async_trait::async_trait;
use ensemble_abstraction::{ChatMessage, ChatRole, Model, ModelError, ModelParameters, ModelResponse};
use serde_json::{Value, json};

const SNIPPET_CHARS: usize = 80;

/// Model that echoes the conversation back as a decision.
#[derive(Debug, Default)]
pub struct EchoModel;

impl EchoModel {
    /// Agent name from a briefing that opens with "You are <name>, ..."
    fn agent_name(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .find(|message| message.role == ChatRole::System)
            .and_then(|message| message.content.strip_prefix("You are "))
            .and_then(|rest| rest.split(',').next())
            .map_or_else(|| "agent".to_string(), str::to_string)
    }

    fn required_recipient(parameters: Option<&ModelParameters>) -> Option<String> {
        let schema = parameters?.response_schema.as_ref()?;
        let required = schema.get("required")?.as_array()?;
        if !required.iter().any(|field| field == "recipient") {
            return None;
        }
        schema["properties"]["recipient"]["enum"]
            .as_array()?
            .iter()
            .filter_map(Value::as_str)
            .find(|name| *name != "user")
            .map(str::to_string)
    }
}

/// Latest line of a turn, without its "[speaker]: " prefix.
fn snippet(text: &str) -> String {
    let line = text.lines().map(str::trim).rev().find(|line| !line.is_empty()).unwrap_or_default();
    let line = line
        .strip_prefix('[')
        .and_then(|rest| rest.split_once("]: "))
        .map_or(line, |(_, content)| content);
    if line.chars().count() <= SNIPPET_CHARS {
        line.to_string()
    } else {
        let cut: String = line.chars().take(SNIPPET_CHARS).collect();
        format!("{}...", cut)
    }
}

#[async_trait]
impl Model for EchoModel {
    async fn generate_chat_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        let name = Self::agent_name(messages);
        let last = messages
            .iter()
            .rev()
            .find(|message| message.role == ChatRole::User)
            .map(|message| snippet(&message.content))
            .unwrap_or_default();

        let mut decision = json!({ "response": format!("{} considered: {}", name, last) });
        if let Some(recipient) = Self::required_recipient(parameters.as_ref()) {
            decision["recipient"] = json!(recipient);
        }
        Ok(ModelResponse::text(decision.to_string()))
    }

    fn model_id(&self) -> &str {
        "echo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_names_agent_and_message() {
        let messages = vec![ChatMessage::system("You are writer, a generalist agent."), ChatMessage::user("Draft a plan")];
        let reply = EchoModel.generate_chat_completion(&messages, None).await.unwrap();
        let value: Value = serde_json::from_str(&reply.content).unwrap();
        assert_eq!(value["response"], "writer considered: Draft a plan");
        assert!(value.get("recipient").is_none());
    }

    #[tokio::test]
    async fn test_echo_fills_required_recipient() {
        let parameters = ModelParameters {
            response_schema: Some(json!({
                "type": "object",
                "properties": { "recipient": { "type": "string", "enum": ["writer", "user"] } },
                "required": ["response", "recipient"]
            })),
            ..Default::default()
        };
        let messages = vec![ChatMessage::system("You are lead, a manager agent."), ChatMessage::user("Go")];
        let reply = EchoModel.generate_chat_completion(&messages, Some(parameters)).await.unwrap();
        let value: Value = serde_json::from_str(&reply.content).unwrap();
        assert_eq!(value["recipient"], "writer");
    }

    #[test]
    fn test_snippet_takes_latest_line() {
        assert_eq!(snippet("first\n\n[lead]: hello  \n"), "hello");
        assert_eq!(snippet("[not a speaker"), "[not a speaker");
        let long = "x".repeat(100);
        assert_eq!(snippet(&long).chars().count(), SNIPPET_CHARS + 3);
    }
}
