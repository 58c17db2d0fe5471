// Tool abstractions for agent turns
//
// Tools are resolved per agent before every turn and handed to the reasoning
// provider as an opaque set. Resolution is where credentials are checked: a
// tool whose credential is missing suspends the run instead of failing it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::AgentDescriptor;
use crate::context::ContextSet;
use crate::error::Result;
use crate::state::Message;

/// Arguments passed to a tool handler
#[derive(Debug, Clone)]
pub struct ToolArguments {
    /// Parsed arguments as JSON value
    pub args: Value,
}

impl ToolArguments {
    /// Create new tool arguments
    pub fn new(args: Value) -> Self {
        Self { args }
    }

    /// Get argument as string
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.args.get(key)?.as_str().map(str::to_string)
    }

    /// Get argument as bool
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.args.get(key)?.as_bool()
    }
}

/// Result from tool execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether execution succeeded
    pub success: bool,
    /// Output from the tool
    pub output: String,
    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(output: impl Into<String>) -> Self {
        Self { success: true, output: output.into(), metadata: HashMap::new() }
    }

    /// Create an error result
    pub fn error(output: impl Into<String>) -> Self {
        Self { success: false, output: output.into(), metadata: HashMap::new() }
    }

    /// Add metadata to the result
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Handler for tool execution
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute the tool with given arguments
    ///
    /// # Arguments
    /// * `args` - Tool arguments
    ///
    /// # Returns
    /// Result of tool execution
    async fn execute(&self, args: &ToolArguments) -> Result<ToolResult>;
}

/// A named tool an agent can be given
#[derive(Clone)]
pub struct Tool {
    /// Tool name, matched against `AgentDescriptor::tools`
    pub name: String,
    /// What the tool does, shown to the model
    pub description: String,
    /// Credential the tool needs, looked up per owner
    pub required_credential: Option<String>,
    /// Handler invoked by the reasoning provider
    pub handler: Arc<dyn ToolHandler>,
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("required_credential", &self.required_credential)
            .finish_non_exhaustive()
    }
}

impl Tool {
    /// Create a tool that needs no credential
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self { name: name.into(), description: description.into(), required_credential: None, handler }
    }

    /// Require a credential before the tool can be resolved
    #[must_use]
    pub fn requires_credential(mut self, credential: impl Into<String>) -> Self {
        self.required_credential = Some(credential.into());
        self
    }
}

/// Tools resolved for one turn, keyed by name
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    tools: BTreeMap<String, Tool>,
}

impl ToolSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any tool with the same name
    pub fn insert(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Tool names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Iterate over the tools in name order
    pub fn iter(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }

    /// Number of tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Why tools could not be resolved for a turn
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolResolutionError {
    /// A tool needs a credential the owner has not stored
    #[error("Missing credential '{0}'")]
    MissingCredential(String),

    /// The agent lists a tool nobody registered
    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    /// Any other resolver failure
    #[error("Tool resolution failed: {0}")]
    Other(String),
}

/// Everything a resolver may look at when choosing tools
#[derive(Debug, Clone, Copy)]
pub struct ToolRequest<'a> {
    /// Acting agent
    pub agent: &'a AgentDescriptor,
    /// Owner of the run
    pub owner_id: &'a str,
    /// Context sets visible to the agent
    pub context_sets: &'a [ContextSet],
    /// Conversation history
    pub history: &'a [Message],
    /// Team objective
    pub objective: &'a str,
}

/// Resolves the tool set of an agent before each turn
#[async_trait]
pub trait ToolResolver: Send + Sync {
    /// Resolve tools for the acting agent
    async fn resolve(&self, request: &ToolRequest<'_>) -> std::result::Result<ToolSet, ToolResolutionError>;
}

/// Resolver for teams that use no tools
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTools;

#[async_trait]
impl ToolResolver for NoTools {
    async fn resolve(&self, _request: &ToolRequest<'_>) -> std::result::Result<ToolSet, ToolResolutionError> {
        Ok(ToolSet::new())
    }
}

/// Looks up stored credentials by owner and name
pub trait CredentialLookup: Send + Sync {
    /// Credential value, if the owner has stored one
    fn lookup(&self, owner_id: &str, name: &str) -> Option<String>;
}

/// In-memory credential store
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    values: HashMap<(String, String), String>,
}

impl StaticCredentials {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a credential for an owner
    #[must_use]
    pub fn with_credential(
        mut self,
        owner_id: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.values.insert((owner_id.into(), name.into()), value.into());
        self
    }
}

impl CredentialLookup for StaticCredentials {
    fn lookup(&self, owner_id: &str, name: &str) -> Option<String> {
        self.values.get(&(owner_id.to_string(), name.to_string())).cloned()
    }
}

/// Resolver that maps agent tool names onto registered tools
pub struct RegistryToolResolver {
    tools: HashMap<String, Tool>,
    credentials: Arc<dyn CredentialLookup>,
}

impl RegistryToolResolver {
    /// Create a resolver backed by `credentials`
    pub fn new(credentials: Arc<dyn CredentialLookup>) -> Self {
        Self { tools: HashMap::new(), credentials }
    }

    /// Register a tool
    #[must_use]
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.insert(tool.name.clone(), tool);
        self
    }
}

#[async_trait]
impl ToolResolver for RegistryToolResolver {
    async fn resolve(&self, request: &ToolRequest<'_>) -> std::result::Result<ToolSet, ToolResolutionError> {
        let mut set = ToolSet::new();
        for name in &request.agent.tools {
            let tool =
                self.tools.get(name).ok_or_else(|| ToolResolutionError::UnknownTool(name.clone()))?;
            if let Some(credential) = &tool.required_credential {
                if self.credentials.lookup(request.owner_id, credential).is_none() {
                    return Err(ToolResolutionError::MissingCredential(credential.clone()));
                }
            }
            set.insert(tool.clone());
        }
        debug!(agent = %request.agent.name, tools = set.len(), "Resolved tools");
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentRole;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn execute(&self, args: &ToolArguments) -> Result<ToolResult> {
            Ok(ToolResult::success(args.get_string("text").unwrap_or_default()))
        }
    }

    fn request(agent: &AgentDescriptor) -> ToolRequest<'_> {
        ToolRequest { agent, owner_id: "owner-1", context_sets: &[], history: &[], objective: "" }
    }

    #[tokio::test]
    async fn test_no_tools_resolves_empty() {
        let agent = AgentDescriptor::new("a", AgentRole::Generalist).with_tool("search");
        let set = NoTools.resolve(&request(&agent)).await.unwrap();
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_registry_resolves_listed_tools() {
        let resolver = RegistryToolResolver::new(Arc::new(StaticCredentials::new()))
            .with_tool(Tool::new("echo", "Repeats text", Arc::new(Echo)))
            .with_tool(Tool::new("unused", "Not listed", Arc::new(Echo)));
        let agent = AgentDescriptor::new("a", AgentRole::ToolUser).with_tool("echo");

        let set = resolver.resolve(&request(&agent)).await.unwrap();
        assert_eq!(set.names(), vec!["echo"]);

        let tool = set.get("echo").unwrap();
        let result = tool.handler.execute(&ToolArguments::new(serde_json::json!({"text": "hi"}))).await.unwrap();
        assert_eq!(result, ToolResult::success("hi"));
    }

    #[tokio::test]
    async fn test_registry_reports_missing_credential() {
        let tool = Tool::new("search", "Web search", Arc::new(Echo)).requires_credential("search_key");
        let agent = AgentDescriptor::new("a", AgentRole::ToolUser).with_tool("search");

        let without = RegistryToolResolver::new(Arc::new(StaticCredentials::new())).with_tool(tool.clone());
        assert_eq!(
            without.resolve(&request(&agent)).await.unwrap_err(),
            ToolResolutionError::MissingCredential("search_key".to_string())
        );

        let credentials = StaticCredentials::new().with_credential("owner-1", "search_key", "secret");
        let with = RegistryToolResolver::new(Arc::new(credentials)).with_tool(tool);
        assert_eq!(with.resolve(&request(&agent)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_registry_rejects_unknown_tool() {
        let resolver = RegistryToolResolver::new(Arc::new(StaticCredentials::new()));
        let agent = AgentDescriptor::new("a", AgentRole::ToolUser).with_tool("ghost");
        assert_eq!(
            resolver.resolve(&request(&agent)).await.unwrap_err(),
            ToolResolutionError::UnknownTool("ghost".to_string())
        );
    }
}
