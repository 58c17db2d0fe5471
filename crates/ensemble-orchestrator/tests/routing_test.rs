//! Integration tests for the dynamic strategies.

use ensemble_orchestrator::testing::ScriptedReasoner;
use ensemble_orchestrator::{
    AgentDescriptor, AgentRole, Orchestrator, RoutingMode, RunConfig, RunControl, RunStatus, TurnDecision,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn writers() -> Vec<AgentDescriptor> {
    vec![
        AgentDescriptor::new("a", AgentRole::Generalist),
        AgentDescriptor::new("b", AgentRole::Researcher),
        AgentDescriptor::new("c", AgentRole::Generalist),
    ]
}

fn managed() -> Vec<AgentDescriptor> {
    vec![
        AgentDescriptor::new("writer", AgentRole::Generalist),
        AgentDescriptor::new("lead", AgentRole::Manager),
    ]
}

#[tokio::test]
async fn test_llm_routed_follows_recipients_until_complete() {
    let reasoner = Arc::new(ScriptedReasoner::with_decisions([
        TurnDecision::text("Over to c").routed_to("c"),
        TurnDecision::text("Over to b").routed_to("b"),
        TurnDecision::text("All done").complete(),
    ]));
    let orchestrator = Orchestrator::new(reasoner.clone());

    let config = RunConfig::new("dynamic", "X", writers()).with_max_rounds(10);
    let state = orchestrator.run(config, RunControl::new()).await.unwrap();

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(reasoner.agents(), vec!["a", "c", "b"]);
    assert_eq!(reasoner.tasks(), vec!["X", "Over to c", "Over to b"]);

    let last = state.history.last().unwrap();
    assert!(last.directives.as_ref().unwrap().workflow_complete);
    assert_eq!(state.history[1].directives.as_ref().unwrap().recipient.as_deref(), Some("c"));
}

#[tokio::test]
async fn test_llm_routed_recipient_is_optional() {
    let reasoner = Arc::new(ScriptedReasoner::new().otherwise(TurnDecision::text("thinking")));
    let orchestrator = Orchestrator::new(reasoner.clone());

    let config = RunConfig::new("llm_routed", "X", writers()).with_max_rounds(3);
    let state = orchestrator.run(config, RunControl::new()).await.unwrap();

    // Without a recipient every round falls back to the first agent.
    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(reasoner.agents(), vec!["a", "a", "a"]);

    let contract = &reasoner.requests()[0].contract;
    assert_eq!(contract.routing, RoutingMode::Optional);
    assert_eq!(contract.recipients, vec!["b", "c"]);
}

#[tokio::test]
async fn test_unknown_recipient_falls_back() {
    let reasoner = Arc::new(ScriptedReasoner::with_decisions([
        TurnDecision::text("Over to zed").routed_to("zed"),
        TurnDecision::text("Done").routed_to("writer").complete(),
    ]));
    let orchestrator = Orchestrator::new(reasoner.clone());

    let config = RunConfig::new("manager_directed", "X", managed()).with_max_rounds(5);
    let state = orchestrator.run(config, RunControl::new()).await.unwrap();

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(reasoner.agents(), vec!["lead", "lead"]);
}

#[tokio::test]
async fn test_disallowed_peer_falls_back_to_manager() {
    let team = vec![
        AgentDescriptor::new("lead", AgentRole::Manager),
        AgentDescriptor::new("writer", AgentRole::Generalist).with_allowed_peers(["lead"]),
        AgentDescriptor::new("critic", AgentRole::Researcher),
    ];
    let reasoner = Arc::new(ScriptedReasoner::with_decisions([
        TurnDecision::text("writer, draft it").routed_to("writer"),
        TurnDecision::text("critic, check this").routed_to("critic"),
        TurnDecision::text("Done").routed_to("user").complete(),
    ]));
    let orchestrator = Orchestrator::new(reasoner.clone());

    let config = RunConfig::new("manager_directed", "X", team).with_max_rounds(5);
    let state = orchestrator.run(config, RunControl::new()).await.unwrap();

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(reasoner.agents(), vec!["lead", "writer", "lead"]);
    assert_eq!(reasoner.requests()[1].contract.recipients, vec!["lead"]);
}

#[tokio::test]
async fn test_manager_directed_exhausts_rounds() {
    let reasoner = Arc::new(ScriptedReasoner::with_decisions([
        TurnDecision::text("Draft it").routed_to("writer"),
        TurnDecision::text("Draft ready").routed_to("lead"),
        TurnDecision::text("Polish it").routed_to("writer"),
    ]));
    let orchestrator = Orchestrator::new(reasoner.clone());

    let config = RunConfig::new("manager_directed", "X", managed()).with_max_rounds(3);
    let state = orchestrator.run(config, RunControl::new()).await.unwrap();

    // Budget exhausted without a completion directive still ends completed.
    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(reasoner.agents(), vec!["lead", "writer", "lead"]);
    assert_eq!(state.next_agent.as_deref(), Some("writer"));
    assert_eq!(state.turns, 3);

    let contract = &reasoner.requests()[0].contract;
    assert_eq!(contract.routing, RoutingMode::Required);
    assert_eq!(contract.recipients, vec!["writer"]);
}

#[tokio::test]
async fn test_manager_directed_requires_recipient() {
    let reasoner = Arc::new(ScriptedReasoner::with_decisions([TurnDecision::text("No routing here")]));
    let orchestrator = Orchestrator::new(reasoner.clone());

    let config = RunConfig::new("manager_directed", "X", managed()).with_max_rounds(3);
    let state = orchestrator.run(config, RunControl::new()).await.unwrap();

    assert_eq!(state.status, RunStatus::Error);
    let error = state.error.unwrap();
    assert!(error.contains("Agent 'lead' returned an invalid decision"), "{error}");
    assert_eq!(state.history.len(), 1);
}

#[tokio::test]
async fn test_routing_to_user_suspends_for_input() {
    let reasoner = Arc::new(ScriptedReasoner::with_decisions([
        TurnDecision::text("Which market should we target?").routed_to("user"),
        TurnDecision::text("Europe it is").routed_to("user").complete(),
    ]));
    let orchestrator = Orchestrator::new(reasoner.clone());

    let config = RunConfig::new("manager_directed", "X", managed()).with_max_rounds(5);
    let state = orchestrator.run(config, RunControl::new()).await.unwrap();
    assert_eq!(state.status, RunStatus::AwaitingUser);
    assert_eq!(state.pending.as_ref().unwrap().agent, "lead");

    let state = orchestrator
        .resume(state, ensemble_orchestrator::ResumeInput::Answer("Europe".to_string()), RunControl::new())
        .await
        .unwrap();

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(reasoner.agents(), vec!["lead", "lead"]);
    assert_eq!(reasoner.tasks(), vec!["X", "Europe"]);
}
