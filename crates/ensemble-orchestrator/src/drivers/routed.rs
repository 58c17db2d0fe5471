// Dynamic routing
//
// One turn per round. Each decision names who acts next; recipients that are
// not on the team, or that the speaker may not address, fall back to the
// manager (or the first agent) with a warning. LLM-routed runs start with the
// first agent and treat the recipient as optional; manager-directed runs
// start with the first manager and require it on every decision.

use tracing::warn;

use crate::config::{AgentDescriptor, WorkflowStrategy};
use crate::drivers::{WorkflowDriver, default_agent};
use crate::state::RunState;
use crate::turn::RoutingMode;

/// Driver for the two dynamic strategies
#[derive(Debug, Clone, Copy)]
pub struct RoutedDriver {
    strategy: WorkflowStrategy,
    routing: RoutingMode,
}

impl RoutedDriver {
    /// Decisions may name the next agent
    pub fn llm_routed() -> Self {
        Self { strategy: WorkflowStrategy::LlmRouted, routing: RoutingMode::Optional }
    }

    /// A manager opens the run and every decision must name the next agent
    pub fn manager_directed() -> Self {
        Self { strategy: WorkflowStrategy::ManagerDirected, routing: RoutingMode::Required }
    }

    fn prefers_manager(&self) -> bool {
        self.strategy == WorkflowStrategy::ManagerDirected
    }
}

impl WorkflowDriver for RoutedDriver {
    fn strategy(&self) -> WorkflowStrategy {
        self.strategy
    }

    fn routing(&self) -> RoutingMode {
        self.routing
    }

    fn round_order(&self, _round: u32, team: &[AgentDescriptor], state: &RunState) -> Vec<String> {
        let routed = state
            .next_agent
            .as_ref()
            .filter(|name| team.iter().any(|agent| &agent.name == *name))
            .cloned();
        routed.or_else(|| default_agent(team, self.prefers_manager())).into_iter().collect()
    }

    fn route(&self, from: &AgentDescriptor, recipient: &str, team: &[AgentDescriptor]) -> Option<String> {
        let known = team.iter().any(|agent| agent.name == recipient);
        if known && from.may_address(recipient) {
            return Some(recipient.to_string());
        }
        let fallback = default_agent(team, true);
        warn!(
            from = %from.name,
            recipient = %recipient,
            fallback = ?fallback,
            "Recipient is unknown or not allowed, falling back"
        );
        fallback
    }
}
