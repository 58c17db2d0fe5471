//! Fixed forward order.

use crate::config::{AgentDescriptor, WorkflowStrategy};
use crate::drivers::WorkflowDriver;
use crate::state::RunState;

/// Every agent once per round, in configured order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialDriver;

impl WorkflowDriver for SequentialDriver {
    fn strategy(&self) -> WorkflowStrategy {
        WorkflowStrategy::Sequential
    }

    fn round_order(&self, _round: u32, team: &[AgentDescriptor], _state: &RunState) -> Vec<String> {
        team.iter().map(|agent| agent.name.clone()).collect()
    }
}
