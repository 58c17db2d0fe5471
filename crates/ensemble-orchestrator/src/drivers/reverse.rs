//! Fixed reverse order.

use crate::config::{AgentDescriptor, WorkflowStrategy};
use crate::drivers::WorkflowDriver;
use crate::state::RunState;

/// Every agent once per round, last configured agent first.
///
/// The first turn of the run still receives the initial message: the task
/// always comes from the run's next input, never from list position.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReverseDriver;

impl WorkflowDriver for ReverseDriver {
    fn strategy(&self) -> WorkflowStrategy {
        WorkflowStrategy::Reverse
    }

    fn round_order(&self, _round: u32, team: &[AgentDescriptor], _state: &RunState) -> Vec<String> {
        team.iter().rev().map(|agent| agent.name.clone()).collect()
    }
}
