//! Turn input assembly.

use crate::config::AgentDescriptor;
use crate::state::RunState;
use crate::turn::TurnInput;

/// Assemble what `agent` sees when it acts on `message`.
///
/// Pure: the same state, agent and message always give the same input. The
/// agent sees the whole history, every context set that is enabled and not
/// hidden from it, and the agents taking part in the run.
pub fn build_turn_input(state: &RunState, agent: &AgentDescriptor, message: &str) -> TurnInput {
    TurnInput {
        agent: agent.clone(),
        message: message.to_string(),
        history: state.history.clone(),
        context_sets: state
            .context_sets
            .iter()
            .filter(|set| set.is_visible_to(&agent.name))
            .cloned()
            .collect(),
        team: state.config.effective_agents(),
        snapshot: state.snapshot(),
        owner_id: state.config.owner_id.clone(),
        acceptance_criteria: state.config.acceptance_criteria.clone(),
        stream: state.config.stream,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentRole, RunConfig, WorkflowStrategy};
    use crate::context::ContextSet;
    use crate::state::Message;

    fn state() -> RunState {
        let config = RunConfig::new(
            "sequential",
            "Plan the launch",
            vec![
                AgentDescriptor::new("writer", AgentRole::Generalist),
                AgentDescriptor::new("critic", AgentRole::Researcher),
                AgentDescriptor::new("idle", AgentRole::Generalist),
            ],
        )
        .with_team("launch", "Ship on time")
        .with_owner("owner-1")
        .with_custom_agents(["writer", "critic"])
        .with_context_set(ContextSet::new("brief", "public"))
        .with_context_set(ContextSet::new("secret", "hidden").hidden_from(["critic"]))
        .with_context_set(ContextSet::new("old", "stale").disabled());
        RunState::new(config, WorkflowStrategy::Sequential)
    }

    #[test]
    fn test_visibility_filtering() {
        let state = state();
        let writer = state.config.agents[0].clone();
        let critic = state.config.agents[1].clone();

        let names = |input: TurnInput| input.context_sets.into_iter().map(|s| s.name).collect::<Vec<_>>();
        assert_eq!(names(build_turn_input(&state, &writer, "go")), vec!["brief", "secret"]);
        assert_eq!(names(build_turn_input(&state, &critic, "go")), vec!["brief"]);
    }

    #[test]
    fn test_input_carries_run_view() {
        let mut state = state();
        state.record(Message::agent("writer", "draft"));
        let critic = state.config.agents[1].clone();

        let input = build_turn_input(&state, &critic, "draft");
        assert_eq!(input.message, "draft");
        assert_eq!(input.history.len(), 2);
        assert_eq!(input.team.len(), 2);
        assert_eq!(input.owner_id, "owner-1");
        assert_eq!(input.snapshot.objective, "Ship on time");
        assert_eq!(input.peers(), vec!["writer".to_string()]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let state = state();
        let writer = state.config.agents[0].clone();
        assert_eq!(build_turn_input(&state, &writer, "x"), build_turn_input(&state, &writer, "x"));
    }
}
