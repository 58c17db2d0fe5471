// Structured turn decisions
//
// A decision is what a reasoning call returns for one agent turn: the
// response text plus optional routing, context mutations and control flags.
// The contract tells the provider which of those fields it must fill.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::context::{ContextEdit, ContextSet, ContextUpdate};
use crate::error::{OrchestrationError, Result};

/// Recipient name that hands control back to the user.
pub const USER_RECIPIENT: &str = "user";

/// Structured decision produced by one reasoning call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnDecision {
    /// Response text
    #[serde(default)]
    pub response: String,
    /// Next agent, or `user`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    /// Context sets to create
    #[serde(default, alias = "new_context_sets", skip_serializing_if = "Vec::is_empty")]
    pub new_context_sets: Vec<ContextSet>,
    /// Context sets to edit
    #[serde(default, alias = "edited_context_sets", skip_serializing_if = "Vec::is_empty")]
    pub edited_context_sets: Vec<ContextEdit>,
    /// The agent needs information from the user before going on
    #[serde(default, alias = "is_user_input_request")]
    pub is_user_input_request: bool,
    /// The agent considers the objective met
    #[serde(default, alias = "workflow_complete")]
    pub workflow_complete: bool,
}

impl TurnDecision {
    /// Decision that only carries response text
    pub fn text(response: impl Into<String>) -> Self {
        Self { response: response.into(), ..Self::default() }
    }

    /// Name the next recipient
    #[must_use]
    pub fn routed_to(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    /// Declare the workflow complete
    #[must_use]
    pub fn complete(mut self) -> Self {
        self.workflow_complete = true;
        self
    }

    /// Ask the user for input
    #[must_use]
    pub fn asking_user(mut self) -> Self {
        self.is_user_input_request = true;
        self
    }

    /// Create a context set
    #[must_use]
    pub fn with_new_set(mut self, set: ContextSet) -> Self {
        self.new_context_sets.push(set);
        self
    }

    /// Edit a context set
    #[must_use]
    pub fn with_edit(mut self, edit: ContextEdit) -> Self {
        self.edited_context_sets.push(edit);
        self
    }

    /// Parsed recipient; blank names count as absent
    pub fn recipient(&self) -> Option<Recipient> {
        self.recipient.as_deref().and_then(Recipient::parse)
    }

    /// Context mutations carried by the decision
    pub fn context_update(&self) -> ContextUpdate {
        ContextUpdate { new_sets: self.new_context_sets.clone(), edits: self.edited_context_sets.clone() }
    }
}

/// Who a decision hands control to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Suspend and wait for the user
    User,
    /// Another agent, by name
    Agent(String),
}

impl Recipient {
    /// Parse a recipient name; `user` is matched case-insensitively
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            None
        } else if name.eq_ignore_ascii_case(USER_RECIPIENT) {
            Some(Self::User)
        } else {
            Some(Self::Agent(name.to_string()))
        }
    }
}

/// How a turn must treat routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// Fixed-order strategies; no recipient is asked for
    None,
    /// The decision may name the next recipient
    Optional,
    /// The decision must name the next recipient
    Required,
}

/// Shape a decision has to take for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionContract {
    /// Routing mode
    pub routing: RoutingMode,
    /// Peers the agent may hand control to
    pub recipients: Vec<String>,
}

impl DecisionContract {
    /// Contract without routing
    pub fn unrouted() -> Self {
        Self { routing: RoutingMode::None, recipients: Vec::new() }
    }

    /// Contract with the given routing mode and peers
    pub fn routed(routing: RoutingMode, recipients: Vec<String>) -> Self {
        Self { routing, recipients }
    }

    /// JSON schema describing a valid decision
    pub fn json_schema(&self) -> Value {
        let context_set = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "text": { "type": "string" },
                "hiddenFrom": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["name", "text"]
        });
        let context_edit = json!({
            "type": "object",
            "properties": {
                "originalSetName": { "type": "string" },
                "newName": { "type": "string" },
                "text": { "type": "string" },
                "hiddenFrom": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["originalSetName", "text"]
        });

        let mut properties = json!({
            "response": { "type": "string" },
            "newContextSets": { "type": "array", "items": context_set },
            "editedContextSets": { "type": "array", "items": context_edit },
            "isUserInputRequest": { "type": "boolean" },
            "workflowComplete": { "type": "boolean" }
        });
        let mut required = vec![json!("response")];

        if self.routing != RoutingMode::None {
            let mut names: Vec<Value> = self.recipients.iter().map(|name| json!(name)).collect();
            names.push(json!(USER_RECIPIENT));
            properties["recipient"] = json!({ "type": "string", "enum": names });
            if self.routing == RoutingMode::Required {
                required.push(json!("recipient"));
            }
        }

        json!({ "type": "object", "properties": properties, "required": required })
    }

    /// Check a decision against the contract
    ///
    /// # Errors
    /// Returns `ContractViolation` when a required recipient is missing
    pub fn enforce(&self, decision: &TurnDecision) -> Result<()> {
        if self.routing == RoutingMode::Required && decision.recipient().is_none() {
            return Err(OrchestrationError::ContractViolation(
                "the decision must name the next recipient".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a model reply into a decision
///
/// Accepts a bare JSON object, a fenced ```json block, or an object embedded
/// in prose. A reply with no JSON at all is taken as plain response text.
///
/// # Errors
/// Returns `MalformedDecision` for an empty reply, or when the reply clearly
/// carries JSON that does not describe a decision
pub fn parse_decision(raw: &str) -> Result<TurnDecision> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(OrchestrationError::MalformedDecision("empty reply".to_string()));
    }

    if let Ok(decision) = serde_json::from_str::<TurnDecision>(trimmed) {
        return Ok(decision);
    }

    if let Some(captures) = Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```")
        .ok()
        .and_then(|re| re.captures(trimmed))
    {
        let block = captures.get(1).map_or("", |m| m.as_str());
        return serde_json::from_str(block)
            .map_err(|e| OrchestrationError::MalformedDecision(format!("fenced decision: {}", e)));
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(decision) = serde_json::from_str::<TurnDecision>(&trimmed[start..=end]) {
                return Ok(decision);
            }
        }
    }

    if trimmed.starts_with('{') {
        return Err(OrchestrationError::MalformedDecision(format!(
            "reply is not a decision object: {}",
            truncate(trimmed, 120)
        )));
    }

    Ok(TurnDecision::text(trimmed))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}
